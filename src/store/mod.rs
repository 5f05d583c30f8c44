//! Record store interface and implementations.
//!
//! The store is a passive collaborator: keyed upserts, keyed deletes and
//! filtered scans. No transaction spans more than one call, so callers
//! must be able to repeat any write.

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{
    Application, Arch, Category, Commit, CommitToPackage, CommitToVersion, KeywordChange, Package,
    PkgMove, ProfileEntry, ProfileList, SpecifierToVersion, Useflag, Version,
};

/// Persistence operations used by the importers, the ingestor and the
/// resolver.
pub trait Store {
    /// Insert or update a category by name.
    fn upsert_category(&mut self, category: &Category) -> Result<()>;
    fn delete_category(&mut self, name: &str) -> Result<()>;
    fn categories(&self) -> Result<Vec<Category>>;

    /// Insert or update a package by atom.
    ///
    /// An existing row keeps its `preceding_commits` value; only
    /// [`Store::set_preceding_commits`] changes it.
    fn upsert_package(&mut self, package: &Package) -> Result<()>;
    fn delete_package(&mut self, atom: &str) -> Result<()>;
    fn package(&self, atom: &str) -> Result<Option<Package>>;
    fn packages(&self) -> Result<Vec<Package>>;
    /// Overwrite the first-seen ordinal of an existing package. Returns
    /// `false` when the package is unknown.
    fn set_preceding_commits(&mut self, atom: &str, preceding_commits: u64) -> Result<bool>;

    /// Insert or replace a version by id.
    fn upsert_version(&mut self, version: &Version) -> Result<()>;
    fn delete_version(&mut self, id: &str) -> Result<()>;
    fn version(&self, id: &str) -> Result<Option<Version>>;
    /// All versions of a package.
    fn versions_of(&self, atom: &str) -> Result<Vec<Version>>;
    fn versions(&self) -> Result<Vec<Version>>;

    /// Insert or update a commit by id.
    fn upsert_commit(&mut self, commit: &Commit) -> Result<()>;
    fn commit(&self, id: &str) -> Result<Option<Commit>>;
    /// The commit with the highest `preceding_commits`.
    fn latest_commit(&self) -> Result<Option<Commit>>;
    fn commit_count(&self) -> Result<usize>;

    /// Insert or update a keyword change by id.
    fn upsert_keyword_change(&mut self, change: &KeywordChange) -> Result<()>;
    fn keyword_changes(&self, commit_id: &str) -> Result<Vec<KeywordChange>>;

    /// Insert a commit/package link, ignoring duplicates.
    fn link_package(&mut self, link: &CommitToPackage) -> Result<()>;
    /// Insert a commit/version link, ignoring duplicates.
    fn link_version(&mut self, link: &CommitToVersion) -> Result<()>;
    /// Ids of the commits that touched a package.
    fn package_commits(&self, atom: &str) -> Result<Vec<String>>;
    /// Ids of the commits that touched a version.
    fn version_commits(&self, version_id: &str) -> Result<Vec<String>>;

    /// Truncate a profile list and store `entries` in its place.
    fn replace_entries(&mut self, list: ProfileList, entries: &[ProfileEntry]) -> Result<()>;
    fn entries(&self, list: ProfileList) -> Result<Vec<ProfileEntry>>;
    /// Truncate the join table of a profile list and store `rows`.
    fn replace_matches(&mut self, list: ProfileList, rows: &[SpecifierToVersion]) -> Result<()>;
    fn matches(&self, list: ProfileList) -> Result<Vec<SpecifierToVersion>>;

    fn upsert_useflag(&mut self, flag: &Useflag) -> Result<()>;
    fn useflags(&self) -> Result<Vec<Useflag>>;

    fn replace_arches(&mut self, arches: &[Arch]) -> Result<()>;
    fn arches(&self) -> Result<Vec<Arch>>;

    /// Insert or update a package move by source atom.
    fn upsert_pkg_move(&mut self, pkg_move: &PkgMove) -> Result<()>;
    fn pkg_moves(&self) -> Result<Vec<PkgMove>>;

    fn put_application(&mut self, application: &Application) -> Result<()>;
    fn application(&self) -> Result<Option<Application>>;
}
