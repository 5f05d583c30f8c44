use crate::cache::CacheEntry;
use crate::error::{Error, Result};
use crate::git::{FileChange, FileStatus};
use crate::import::{is_category, Mutation};
use crate::tree::Tree;

/// The parts of a `category/package/package-version.ebuild` path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EbuildPath<'a> {
    pub category: &'a str,
    pub package: &'a str,
    /// File name without `.ebuild`.
    pub stem: &'a str,
}

impl<'a> EbuildPath<'a> {
    pub fn parse(path: &'a str) -> Option<EbuildPath<'a>> {
        let mut parts = path.split('/');
        let (category, package, file) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || !is_category(category) || package.is_empty() {
            return None;
        }
        let stem = file.strip_suffix(".ebuild").filter(|s| !s.is_empty())?;
        Some(EbuildPath {
            category,
            package,
            stem,
        })
    }

    /// `category/package-version`.
    pub fn version_id(&self) -> String {
        format!("{}/{}", self.category, self.stem)
    }

    pub fn atom(&self) -> String {
        format!("{}/{}", self.category, self.package)
    }

    /// The version part of the file name.
    pub fn version(&self) -> Option<&'a str> {
        self.stem
            .strip_prefix(self.package)?
            .strip_prefix('-')
            .filter(|v| !v.is_empty())
    }
}

pub(super) fn accepts(path: &str) -> bool {
    EbuildPath::parse(path).is_some()
}

/// Upsert the version from its md5-cache entry, or delete it.
pub(super) fn import(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    let ebuild =
        EbuildPath::parse(&change.path).ok_or_else(|| Error::InvalidAtom(change.path.clone()))?;
    let version = ebuild
        .version()
        .ok_or_else(|| Error::InvalidAtom(change.path.clone()))?;
    let id = ebuild.version_id();

    if change.status == FileStatus::Deleted {
        return Ok(vec![Mutation::DeleteVersion(id)]);
    }

    let entry = CacheEntry::parse(&tree.read(&Tree::cache_path(&id))?)?;
    Ok(vec![Mutation::UpsertVersion(entry.into_version(
        ebuild.category,
        ebuild.package,
        version,
    ))])
}
