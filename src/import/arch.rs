use crate::error::Result;
use crate::git::{FileChange, FileStatus};
use crate::import::Mutation;
use crate::model::Arch;
use crate::tree::Tree;

const ARCH_LIST: &str = "profiles/arch.list";

pub(super) fn accepts(path: &str) -> bool {
    path == ARCH_LIST
}

/// Replace the arch table with the entries of `profiles/arch.list`.
pub(super) fn import(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    let arches = match change.status {
        FileStatus::Deleted => Vec::new(),
        _ => parse_arches(&tree.read(&change.path)?),
    };
    Ok(vec![Mutation::ReplaceArches(arches)])
}

fn parse_arches(text: &str) -> Vec<Arch> {
    let mut arches: Vec<Arch> = Vec::new();
    for name in text
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|name| !name.is_empty())
    {
        if !arches.iter().any(|a| a.name == name) {
            arches.push(Arch {
                name: name.to_string(),
            });
        }
    }
    arches
}
