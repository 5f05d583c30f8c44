//! Records kept in the [`Store`](crate::Store).
//!
//! Every record has a stable string identifier so writes can be keyed
//! upserts and a partially completed run can simply be repeated.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// A category, from `<category>/metadata.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Category {
    /// Category name, the primary key.
    pub name: String,
    /// English long description.
    pub description: String,
}

/// A package maintainer from `metadata.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    pub email: String,
    pub name: String,
    /// `person` or `project`.
    pub kind: String,
    /// Optional restriction atom.
    pub restrict: String,
}

/// An upstream remote identifier such as `github` / `owner/repo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteId {
    pub kind: String,
    pub id: String,
}

/// Upstream information from `metadata.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    pub remote_ids: Vec<RemoteId>,
    pub bugs_to: Vec<String>,
    pub doc: Vec<String>,
    pub changelog: Vec<String>,
}

/// A package, identified by its `category/name` atom.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub atom: String,
    pub category: String,
    pub name: String,
    pub longdescription: String,
    pub maintainers: Vec<Maintainer>,
    pub upstream: Upstream,
    /// Ordinal of the commit that first added the package's
    /// `metadata.xml`. Zero until the history has been replayed.
    pub preceding_commits: u64,
}

/// A single ebuild version with the metadata taken from its md5-cache entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Version {
    /// `category/name-version`, the primary key.
    pub id: String,
    pub category: String,
    pub package: String,
    /// `category/name`.
    pub atom: String,
    pub version: String,
    pub slot: String,
    /// Defaults to `"0"` when SLOT has no subslot part.
    pub subslot: String,
    pub eapi: String,
    /// Raw space-separated KEYWORDS value.
    pub keywords: String,
    pub useflags: Vec<String>,
    pub restricts: Vec<String>,
    pub properties: Vec<String>,
    pub homepage: Vec<String>,
    pub license: String,
    pub description: String,
}

/// A file touched by a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    pub path: String,
    /// `A`, `M` or `D`.
    pub change_type: String,
}

/// Files touched by a commit, grouped by change type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFiles {
    pub added: Vec<ChangedFile>,
    pub modified: Vec<ChangedFile>,
    pub deleted: Vec<ChangedFile>,
}

/// A commit of the repository history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full commit hash.
    pub id: String,
    /// Position of the commit in the full history, starting at 1.
    pub preceding_commits: u64,
    pub author_name: String,
    pub author_email: String,
    pub author_date: OffsetDateTime,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: OffsetDateTime,
    /// Subject line.
    pub message: String,
    pub changed_files: ChangedFiles,
}

/// KEYWORDS movement of one ebuild in one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordChange {
    /// `<commit id>-<path>`.
    pub id: String,
    pub commit_id: String,
    /// `category/name-version`.
    pub version_id: String,
    /// `category/name`.
    pub package_id: String,
    pub added: Vec<String>,
    pub stabilized: Vec<String>,
    pub all: Vec<String>,
}

/// Link between a commit and a package it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitToPackage {
    /// `<commit id>-<atom>`.
    pub id: String,
    pub commit_id: String,
    pub package_atom: String,
}

/// Link between a commit and a version it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitToVersion {
    /// `<commit id>-<version id>`.
    pub id: String,
    pub commit_id: String,
    pub version_id: String,
}

/// An entry of `profiles/package.mask` or `profiles/package.deprecated`,
/// keyed by its literal version specifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEntry {
    pub versions: String,
    pub author: String,
    pub author_email: String,
    pub date: Option<Date>,
    pub reason: String,
}

/// Which profile list a [`ProfileEntry`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileList {
    /// `profiles/package.mask`
    Mask,
    /// `profiles/package.deprecated`
    Deprecated,
}

impl ProfileList {
    /// Tree-relative path of the list.
    pub fn path(self) -> &'static str {
        match self {
            ProfileList::Mask => "profiles/package.mask",
            ProfileList::Deprecated => "profiles/package.deprecated",
        }
    }
}

/// A `package.mask` entry.
pub type Mask = ProfileEntry;

/// A `package.deprecated` entry.
pub type DeprecatedPackage = ProfileEntry;

/// A version matched by a mask or deprecation specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierToVersion {
    /// `<specifier>-<version id>`.
    pub id: String,
    /// The specifier of the owning entry.
    pub versions: String,
    pub version_id: String,
}

/// Row of the `MaskToVersion` join table.
pub type MaskToVersion = SpecifierToVersion;

/// Row of the `DeprecatedToVersion` join table.
pub type DeprecatedToVersion = SpecifierToVersion;

/// Scope of a USE flag description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseScope {
    Global,
    Local,
    UseExpand,
}

impl UseScope {
    pub fn as_str(self) -> &'static str {
        match self {
            UseScope::Global => "global",
            UseScope::Local => "local",
            UseScope::UseExpand => "use_expand",
        }
    }

    pub fn parse(scope: &str) -> Option<UseScope> {
        match scope {
            "global" => Some(UseScope::Global),
            "local" => Some(UseScope::Local),
            "use_expand" => Some(UseScope::UseExpand),
            _ => None,
        }
    }
}

/// A USE flag description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Useflag {
    pub id: String,
    pub name: String,
    pub scope: UseScope,
    pub description: String,
    /// USE_EXPAND group for expanded flags.
    pub use_expand: String,
    /// Package atom for local flags.
    pub package: String,
}

/// An architecture from `profiles/arch.list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arch {
    pub name: String,
}

/// A `move <source> <destination>` entry from `profiles/updates/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgMove {
    pub source: String,
    pub destination: String,
}

/// State recorded at the end of an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    /// Last processed commit.
    pub last_commit: String,
    /// Ordinal high-water mark.
    pub preceding_commits: u64,
    pub last_update: OffsetDateTime,
}
