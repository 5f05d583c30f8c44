//! Importers that turn changed tree files into store mutations.
//!
//! Each importer is a pure function of a [`FileChange`] and the current
//! [`Tree`]. The registry in [`IMPORTERS`] pairs every importer with the
//! predicate selecting its paths; [`import_changes`] runs the first
//! matching importer for each change and applies its mutations.

mod arch;
mod category;
mod package;
mod pkgmove;
mod profile;
mod useflag;
mod version;

pub(crate) use package::package_of;
pub use profile::{parse_entries, rebuild_matches, END_OF_EXAMPLES};
pub(crate) use version::EbuildPath;

use tracing::{debug, error, info};

use crate::error::Result;
use crate::git::FileChange;
use crate::model::{
    Arch, Category, Package, PkgMove, ProfileEntry, ProfileList, Useflag, Version,
};
use crate::store::Store;
use crate::tree::Tree;

/// A single write produced by an importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    UpsertCategory(Category),
    DeleteCategory(String),
    UpsertPackage(Package),
    DeletePackage(String),
    UpsertVersion(Version),
    DeleteVersion(String),
    UpsertUseflag(Useflag),
    ReplaceArches(Vec<Arch>),
    UpsertPkgMove(PkgMove),
    ReplaceEntries(ProfileList, Vec<ProfileEntry>),
}

impl Mutation {
    /// Write the mutation to `store`.
    pub fn apply(&self, store: &mut dyn Store) -> Result<()> {
        match self {
            Mutation::UpsertCategory(category) => store.upsert_category(category),
            Mutation::DeleteCategory(name) => store.delete_category(name),
            Mutation::UpsertPackage(package) => store.upsert_package(package),
            Mutation::DeletePackage(atom) => store.delete_package(atom),
            Mutation::UpsertVersion(version) => store.upsert_version(version),
            Mutation::DeleteVersion(id) => store.delete_version(id),
            Mutation::UpsertUseflag(flag) => store.upsert_useflag(flag),
            Mutation::ReplaceArches(arches) => store.replace_arches(arches),
            Mutation::UpsertPkgMove(pkg_move) => store.upsert_pkg_move(pkg_move),
            Mutation::ReplaceEntries(list, entries) => store.replace_entries(*list, entries),
        }
    }
}

/// An importer function.
pub type ImportFn = fn(&FileChange, &Tree) -> Result<Vec<Mutation>>;

/// A registry entry: the paths an importer handles and the importer.
pub struct Importer {
    pub name: &'static str,
    pub predicate: fn(&str) -> bool,
    pub import: ImportFn,
}

/// Registered importers, in priority order.
pub static IMPORTERS: &[Importer] = &[
    Importer {
        name: "version",
        predicate: version::accepts,
        import: version::import,
    },
    Importer {
        name: "package",
        predicate: package::accepts,
        import: package::import,
    },
    Importer {
        name: "category",
        predicate: category::accepts,
        import: category::import,
    },
    Importer {
        name: "mask",
        predicate: profile::accepts_mask,
        import: profile::import_mask,
    },
    Importer {
        name: "deprecated",
        predicate: profile::accepts_deprecated,
        import: profile::import_deprecated,
    },
    Importer {
        name: "useflag",
        predicate: useflag::accepts,
        import: useflag::import,
    },
    Importer {
        name: "arch",
        predicate: arch::accepts,
        import: arch::import,
    },
    Importer {
        name: "pkgmove",
        predicate: pkgmove::accepts,
        import: pkgmove::import,
    },
];

/// The first registered importer accepting `path`.
pub fn importer_for(path: &str) -> Option<&'static Importer> {
    IMPORTERS.iter().find(|importer| (importer.predicate)(path))
}

/// Top-level directories of a repository that are not categories.
const NON_CATEGORY_DIRS: &[&str] = &["eclass", "licenses", "metadata", "profiles", "scripts"];

/// Whether a top-level directory name can be a category.
pub(crate) fn is_category(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !NON_CATEGORY_DIRS.contains(&name)
}

/// What an import pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Changes handled by an importer.
    pub imported: usize,
    /// Changes whose import or mutations failed.
    pub failed: usize,
    /// Mutations written.
    pub mutations: usize,
    pub mask_changed: bool,
    pub deprecated_changed: bool,
    pub ebuilds_changed: bool,
}

impl ImportSummary {
    /// Whether the join table of `list` must be rebuilt.
    pub fn needs_rebuild(&self, list: ProfileList) -> bool {
        self.ebuilds_changed
            || match list {
                ProfileList::Mask => self.mask_changed,
                ProfileList::Deprecated => self.deprecated_changed,
            }
    }
}

/// Run the registered importers over `changes` and apply the results.
///
/// Failures are logged per file and per mutation; the pass always
/// continues with the next change.
pub fn import_changes(
    changes: &[FileChange],
    tree: &Tree,
    store: &mut dyn Store,
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for change in changes {
        let Some(importer) = importer_for(&change.path) else {
            continue;
        };
        match importer.name {
            "mask" => summary.mask_changed = true,
            "deprecated" => summary.deprecated_changed = true,
            "version" => summary.ebuilds_changed = true,
            _ => {}
        }

        let mutations = match (importer.import)(change, tree) {
            Ok(mutations) => mutations,
            Err(err) => {
                error!(
                    importer = importer.name,
                    path = %change.path,
                    error = %err,
                    "import failed"
                );
                summary.failed += 1;
                continue;
            }
        };
        debug!(
            importer = importer.name,
            path = %change.path,
            status = %change.status,
            rows = mutations.len(),
            "imported"
        );

        let mut ok = true;
        for mutation in &mutations {
            match mutation.apply(store) {
                Ok(()) => summary.mutations += 1,
                Err(err) => {
                    error!(path = %change.path, error = %err, "failed to write record");
                    ok = false;
                }
            }
        }
        if ok {
            summary.imported += 1;
        } else {
            summary.failed += 1;
        }
    }

    info!(
        imported = summary.imported,
        failed = summary.failed,
        rows = summary.mutations,
        "imported changed files"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FileStatus;
    use crate::store::MemoryStore;
    use rstest::rstest;
    use std::fs;

    #[rstest]
    #[case("dev-lang/rust/rust-1.80.0.ebuild", Some("version"))]
    #[case("dev-lang/rust/metadata.xml", Some("package"))]
    #[case("dev-lang/metadata.xml", Some("category"))]
    #[case("profiles/package.mask", Some("mask"))]
    #[case("profiles/package.deprecated", Some("deprecated"))]
    #[case("profiles/use.desc", Some("useflag"))]
    #[case("profiles/use.local.desc", Some("useflag"))]
    #[case("profiles/desc/python_targets.desc", Some("useflag"))]
    #[case("profiles/arch.list", Some("arch"))]
    #[case("profiles/updates/1Q-2024", Some("pkgmove"))]
    #[case("dev-lang/rust/Manifest", None)]
    #[case("dev-lang/rust/files/fix.patch", None)]
    #[case("eclass/cargo.eclass", None)]
    #[case("metadata/md5-cache/dev-lang/rust-1.80.0", None)]
    #[case("profiles/metadata.xml", None)]
    fn dispatch(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(importer_for(path).map(|i| i.name), expected);
    }

    #[test]
    fn import_pass_records_failures_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cat")).unwrap();
        fs::write(
            dir.path().join("cat/metadata.xml"),
            "<catmetadata><longdescription>Things</longdescription></catmetadata>",
        )
        .unwrap();
        let tree = Tree::new(dir.path());
        let mut store = MemoryStore::new();

        let changes = [
            FileChange::new(FileStatus::Added, "cat/pkg/pkg-1.0.ebuild"),
            FileChange::new(FileStatus::Added, "cat/metadata.xml"),
            FileChange::new(FileStatus::Modified, "cat/pkg/Manifest"),
        ];
        let summary = import_changes(&changes, &tree, &mut store);

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.imported, 1);
        assert!(summary.ebuilds_changed);
        assert!(summary.needs_rebuild(ProfileList::Mask));
        assert_eq!(store.categories().unwrap()[0].description, "Things");
    }
}
