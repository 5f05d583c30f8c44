use tracing::warn;

use crate::error::{Error, Result};
use crate::git::{FileChange, FileStatus};
use crate::import::{is_category, Mutation};
use crate::metadata::category_description;
use crate::model::Category;
use crate::tree::Tree;

fn category_of(path: &str) -> Option<&str> {
    path.strip_suffix("/metadata.xml")
        .filter(|name| !name.contains('/') && is_category(name))
}

pub(super) fn accepts(path: &str) -> bool {
    category_of(path).is_some()
}

/// Upsert a category from `<category>/metadata.xml`, or delete it.
pub(super) fn import(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    let name = category_of(&change.path).ok_or_else(|| Error::InvalidAtom(change.path.clone()))?;
    if change.status == FileStatus::Deleted {
        return Ok(vec![Mutation::DeleteCategory(name.to_string())]);
    }

    let description = match category_description(&tree.read(&change.path)?) {
        Ok(description) => description,
        Err(err) => {
            warn!(path = %change.path, error = %err, "unreadable category metadata");
            String::new()
        }
    };
    Ok(vec![Mutation::UpsertCategory(Category {
        name: name.to_string(),
        description,
    })])
}
