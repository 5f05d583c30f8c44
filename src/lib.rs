//! History of a Gentoo ebuild repository, imported from git.
//!
//! The crate replays the commits of an ebuild repository checkout into a
//! record [`Store`]: every commit gets a history-wide ordinal, is linked to
//! the packages and versions it touched and has its keyword movements
//! recorded. Alongside, the tree's metadata (md5-cache entries,
//! `metadata.xml`, `profiles/` lists) is imported, and the entries of
//! `package.mask` and `package.deprecated` are joined with the versions
//! they match.
//!
//! Version ordering follows [PMS].
//!
//! [PMS]: https://projects.gentoo.org/pms/latest/pms.html
//!
//! # Examples
//!
//! Compare versions and resolve a specifier:
//!
//! ```
//! use std::cmp::Ordering;
//! use portage_history::{compare, resolve, MemoryStore, Store, Version};
//!
//! assert_eq!(compare("1.0_rc1", "1.0").unwrap(), Ordering::Less);
//!
//! let mut store = MemoryStore::new();
//! for v in ["1.0_rc1", "1.0", "1.0-r1"] {
//!     store.upsert_version(&Version {
//!         id: format!("dev-lang/foo-{v}"),
//!         atom: "dev-lang/foo".to_string(),
//!         version: v.to_string(),
//!         slot: "0".to_string(),
//!         subslot: "0".to_string(),
//!         ..Version::default()
//!     }).unwrap();
//! }
//! let found = resolve(&store, "~dev-lang/foo-1.0", "dev-lang/foo").unwrap();
//! assert_eq!(found.len(), 2);
//! ```
//!
//! Bring a database up to date with a checkout:
//!
//! ```no_run
//! use portage_history::{Config, Git, SqliteStore, Updater};
//!
//! let config = Config::load(None)?;
//! let mut store = SqliteStore::open(&config.database)?;
//! let git = Git::new(&config.repository);
//! let report = Updater::new(&mut store, &git, config).run_incremental_update()?;
//! println!("{} commits", report.ingest.processed);
//! # Ok::<(), portage_history::Error>(())
//! ```

mod atom;
mod cache;
mod config;
mod error;
mod git;
pub mod import;
mod ingest;
mod keyword;
mod metadata;
mod model;
mod resolve;
mod store;
mod tree;
mod update;
mod version;

pub use atom::{Atom, Operator, VersionSpecifier};
pub use cache::CacheEntry;
pub use config::{Config, ENV_PREFIX};
pub use error::{Error, Result};
pub use git::{
    parse_changes, parse_log, FileChange, FileStatus, Git, RawCommit, TreeDiffReader, Vcs,
    EMPTY_TREE, LOG_FORMAT,
};
pub use ingest::{CommitIngestor, IngestReport, ResumePoint};
pub use keyword::{Keyword, KeywordDiff, Stability};
pub use metadata::{category_description, PackageMetadata};
pub use model::{
    Application, Arch, Category, ChangedFile, ChangedFiles, Commit, CommitToPackage,
    CommitToVersion, DeprecatedPackage, DeprecatedToVersion, KeywordChange, Maintainer, Mask,
    MaskToVersion, Package, PkgMove, ProfileEntry, ProfileList, RemoteId, SpecifierToVersion,
    Upstream, UseScope, Useflag, Version,
};
pub use resolve::{resolve, RangeResolver};
pub use store::MemoryStore;
#[cfg(feature = "sqlite")]
pub use store::SqliteStore;
pub use store::Store;
pub use tree::Tree;
pub use update::{UpdateReport, Updater};
pub use version::{compare, Suffix, SuffixKind, VersionKey};
