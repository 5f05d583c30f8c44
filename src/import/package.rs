use tracing::warn;

use crate::error::{Error, Result};
use crate::git::{FileChange, FileStatus};
use crate::import::{is_category, Mutation};
use crate::metadata::PackageMetadata;
use crate::model::Package;
use crate::tree::Tree;

/// `(category, name)` of a `category/name/metadata.xml` path.
pub(crate) fn package_of(path: &str) -> Option<(&str, &str)> {
    let dir = path.strip_suffix("/metadata.xml")?;
    let (category, name) = dir.split_once('/')?;
    (is_category(category) && !name.is_empty() && !name.contains('/')).then_some((category, name))
}

pub(super) fn accepts(path: &str) -> bool {
    package_of(path).is_some()
}

/// Upsert a package from its `metadata.xml`, or delete it.
///
/// The upsert carries no first-seen ordinal; the store keeps the one
/// already recorded.
pub(super) fn import(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    let (category, name) =
        package_of(&change.path).ok_or_else(|| Error::InvalidAtom(change.path.clone()))?;
    let atom = format!("{category}/{name}");
    if change.status == FileStatus::Deleted {
        return Ok(vec![Mutation::DeletePackage(atom)]);
    }

    let metadata = PackageMetadata::parse(&tree.read(&change.path)?).unwrap_or_else(|err| {
        warn!(path = %change.path, error = %err, "unreadable package metadata");
        PackageMetadata::default()
    });
    Ok(vec![Mutation::UpsertPackage(Package {
        atom,
        category: category.to_string(),
        name: name.to_string(),
        longdescription: metadata.longdescription,
        maintainers: metadata.maintainers,
        upstream: metadata.upstream,
        preceding_commits: 0,
    })])
}
