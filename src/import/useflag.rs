use crate::error::Result;
use crate::git::{FileChange, FileStatus};
use crate::import::Mutation;
use crate::model::{UseScope, Useflag};
use crate::tree::Tree;

const GLOBAL: &str = "profiles/use.desc";
const LOCAL: &str = "profiles/use.local.desc";
const EXPAND_DIR: &str = "profiles/desc/";

/// Scope of a USE description file, plus the USE_EXPAND group for
/// `profiles/desc/<group>.desc`.
fn scope_of(path: &str) -> Option<(UseScope, &str)> {
    match path {
        GLOBAL => Some((UseScope::Global, "")),
        LOCAL => Some((UseScope::Local, "")),
        _ => path
            .strip_prefix(EXPAND_DIR)?
            .strip_suffix(".desc")
            .filter(|group| !group.is_empty() && !group.contains('/'))
            .map(|group| (UseScope::UseExpand, group)),
    }
}

pub(super) fn accepts(path: &str) -> bool {
    scope_of(path).is_some()
}

/// Upsert every flag described in the file. Deleted files are ignored;
/// flags are never removed.
pub(super) fn import(change: &FileChange, tree: &Tree) -> Result<Vec<Mutation>> {
    let Some((scope, group)) = scope_of(&change.path) else {
        return Ok(Vec::new());
    };
    if change.status == FileStatus::Deleted {
        return Ok(Vec::new());
    }
    Ok(parse_flags(&tree.read(&change.path)?, scope, group)
        .into_iter()
        .map(Mutation::UpsertUseflag)
        .collect())
}

/// Parse `flag - description` lines.
///
/// Local files prefix the flag with `category/name:`; USE_EXPAND flags are
/// named `<group>_<flag>`.
fn parse_flags(text: &str, scope: UseScope, group: &str) -> Vec<Useflag> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (flag, description) = line.split_once(" - ")?;
            let flag = flag.trim();
            let description = description.trim().to_string();
            match scope {
                UseScope::Global if !flag.contains(':') => Some(Useflag {
                    id: format!("{flag}-{}", scope.as_str()),
                    name: flag.to_string(),
                    scope,
                    description,
                    use_expand: String::new(),
                    package: String::new(),
                }),
                UseScope::Local => {
                    let (package, name) = flag.split_once(':')?;
                    Some(Useflag {
                        id: format!("{flag}-{}", scope.as_str()),
                        name: name.to_string(),
                        scope,
                        description,
                        use_expand: String::new(),
                        package: package.to_string(),
                    })
                }
                UseScope::UseExpand => {
                    let name = format!("{group}_{flag}");
                    Some(Useflag {
                        id: name.clone(),
                        name,
                        scope,
                        description,
                        use_expand: group.to_string(),
                        package: String::new(),
                    })
                }
                UseScope::Global => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes() {
        assert_eq!(scope_of("profiles/use.desc"), Some((UseScope::Global, "")));
        assert_eq!(scope_of("profiles/use.local.desc"), Some((UseScope::Local, "")));
        assert_eq!(
            scope_of("profiles/desc/python_targets.desc"),
            Some((UseScope::UseExpand, "python_targets"))
        );
        assert_eq!(scope_of("profiles/desc/README"), None);
    }

    #[test]
    fn global_flags() {
        let text =
            "# Copyright\n\nssl - Add support for SSL/TLS\nbroken line\nX - Add X11 support\n";
        let flags = parse_flags(text, UseScope::Global, "");
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].id, "ssl-global");
        assert_eq!(flags[0].description, "Add support for SSL/TLS");
        assert_eq!(flags[1].name, "X");
    }

    #[test]
    fn local_flags() {
        let text = "dev-lang/rust:clippy - Install clippy\nnot-local - Missing package\n";
        let flags = parse_flags(text, UseScope::Local, "");
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].id, "dev-lang/rust:clippy-local");
        assert_eq!(flags[0].name, "clippy");
        assert_eq!(flags[0].package, "dev-lang/rust");
    }

    #[test]
    fn use_expand_flags() {
        let flags = parse_flags(
            "python3_12 - Build with Python 3.12\n",
            UseScope::UseExpand,
            "python_targets",
        );
        assert_eq!(flags[0].id, "python_targets_python3_12");
        assert_eq!(flags[0].use_expand, "python_targets");
    }
}
