use crate::error::Result;
use crate::git::{FileChange, FileStatus};
use crate::import::Mutation;
use crate::model::PkgMove;
use crate::tree::Tree;

const UPDATES_DIR: &str = "profiles/updates/";

pub(super) fn accepts(path: &str) -> bool {
    path.strip_prefix(UPDATES_DIR)
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}

/// Upsert the `move <source> <destination>` entries of an updates file.
/// Other update commands such as `slotmove` are skipped.
pub(super) fn import(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    if change.status == FileStatus::Deleted {
        return Ok(Vec::new());
    }
    Ok(tree
        .read(&change.path)?
        .lines()
        .filter_map(|line| match line.split_whitespace().collect::<Vec<_>>()[..] {
            ["move", source, destination] => Some(Mutation::UpsertPkgMove(PkgMove {
                source: source.to_string(),
                destination: destination.to_string(),
            })),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn moves() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("profiles/updates")).unwrap();
        fs::write(
            dir.path().join("profiles/updates/2Q-2024"),
            "move dev-util/foo dev-build/foo\nslotmove dev-lang/bar 1 2\nmove broken\n",
        )
        .unwrap();

        let change = FileChange::new(FileStatus::Added, "profiles/updates/2Q-2024");
        assert!(accepts(&change.path));
        let mutations = import(&change, &Tree::new(dir.path())).unwrap();
        assert_eq!(
            mutations,
            [Mutation::UpsertPkgMove(PkgMove {
                source: "dev-util/foo".to_string(),
                destination: "dev-build/foo".to_string(),
            })]
        );
    }
}
