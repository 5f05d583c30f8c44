//! Update runs: bring the store in line with the repository.

use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::Result;
use crate::git::{FileChange, FileStatus, TreeDiffReader, Vcs};
use crate::import::{import_changes, rebuild_matches, ImportSummary};
use crate::ingest::{CommitIngestor, IngestReport, ResumePoint};
use crate::model::{Application, ProfileList};
use crate::store::Store;
use crate::tree::Tree;

/// What an update run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub import: ImportSummary,
    pub ingest: IngestReport,
    /// Join rows written for `package.mask`, when rebuilt.
    pub mask_rows: Option<usize>,
    /// Join rows written for `package.deprecated`, when rebuilt.
    pub deprecated_rows: Option<usize>,
    /// Rows deleted because their files are gone.
    pub removed: usize,
    /// Deletes and first-seen writes of a full update that failed.
    pub failed: usize,
}

/// A stored row whose file is gone.
#[derive(Debug)]
enum Row {
    Version(String),
    Package(String),
    Category(String),
}

/// Drives importers, commit replay and join rebuilds against one store.
///
/// Runs must not overlap: ordinals are assigned without coordination.
pub struct Updater<'a> {
    store: &'a mut dyn Store,
    vcs: &'a dyn Vcs,
    tree: Tree,
    config: Config,
}

impl<'a> Updater<'a> {
    /// The tree is read from `config.repository`.
    pub fn new(store: &'a mut dyn Store, vcs: &'a dyn Vcs, config: Config) -> Self {
        Updater {
            store,
            vcs,
            tree: Tree::new(&config.repository),
            config,
        }
    }

    /// Import everything that changed since the last recorded commit.
    ///
    /// 1. files changed between the resume point and `until` go through the
    ///    importers,
    /// 2. the commits in that range are replayed,
    /// 3. the mask and deprecation joins are rebuilt when their list or any
    ///    ebuild changed,
    /// 4. the application row records the new resume point.
    ///
    /// A run that finds no new commits leaves every table untouched.
    #[instrument(skip_all, fields(until = %self.config.until))]
    pub fn run_incremental_update(&mut self) -> Result<UpdateReport> {
        let resume = ResumePoint::load(&*self.store)?;
        info!(since = %resume.commit, offset = resume.offset, "starting incremental update");

        let changes = TreeDiffReader::new(self.vcs).changes(&resume.commit, &self.config.until)?;
        let import = import_changes(&changes, &self.tree, self.store);

        let ingest = CommitIngestor::new(&mut *self.store, self.vcs, self.config.batch_size)
            .run(&resume, &self.config.until)?;

        let mut report = UpdateReport {
            import,
            ingest,
            ..UpdateReport::default()
        };
        self.rebuild(&mut report);

        if let Some(last_commit) = &report.ingest.last_commit {
            self.record(last_commit.clone(), report.ingest.high_water);
        }
        Ok(report)
    }

    /// Re-import every tracked file and drop rows whose files are gone.
    ///
    /// Packages that never got a first-seen ordinal are given 1 so they sort
    /// as the oldest. Commits are not replayed.
    #[instrument(skip_all)]
    pub fn full_update(&mut self) -> Result<UpdateReport> {
        let changes: Vec<FileChange> = self
            .vcs
            .ls_files()?
            .into_iter()
            .map(|path| FileChange::new(FileStatus::Added, path))
            .collect();
        info!(files = changes.len(), "starting full update");

        let mut report = UpdateReport {
            import: import_changes(&changes, &self.tree, self.store),
            ..UpdateReport::default()
        };
        self.remove_vanished(&mut report)?;

        for package in self.store.packages()? {
            if package.preceding_commits != 0 {
                continue;
            }
            if let Err(err) = self.store.set_preceding_commits(&package.atom, 1) {
                error!(atom = %package.atom, error = %err, "failed to set first-seen ordinal");
                report.failed += 1;
            }
        }

        report.import.mask_changed = true;
        report.import.deprecated_changed = true;
        self.rebuild(&mut report);
        Ok(report)
    }

    /// Delete versions, packages and categories without their file.
    ///
    /// A failed delete is logged and counted; the scan goes on.
    fn remove_vanished(&mut self, report: &mut UpdateReport) -> Result<()> {
        let mut gone = Vec::new();
        for version in self.store.versions()? {
            let ebuild = version
                .id
                .split_once('/')
                .map(|(category, stem)| format!("{category}/{}/{stem}.ebuild", version.package));
            if !ebuild.is_some_and(|path| self.tree.exists(&path)) {
                gone.push(Row::Version(version.id));
            }
        }
        for package in self.store.packages()? {
            if !self.tree.exists(&format!("{}/metadata.xml", package.atom)) {
                gone.push(Row::Package(package.atom));
            }
        }
        for category in self.store.categories()? {
            if !self.tree.exists(&format!("{}/metadata.xml", category.name)) {
                gone.push(Row::Category(category.name));
            }
        }

        for row in gone {
            let deleted = match &row {
                Row::Version(id) => self.store.delete_version(id),
                Row::Package(atom) => self.store.delete_package(atom),
                Row::Category(name) => self.store.delete_category(name),
            };
            match deleted {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    error!(row = ?row, error = %err, "failed to delete row");
                    report.failed += 1;
                }
            }
        }

        if report.removed > 0 {
            info!(removed = report.removed, "removed rows without files");
        }
        Ok(())
    }

    fn rebuild(&mut self, report: &mut UpdateReport) {
        for list in [ProfileList::Mask, ProfileList::Deprecated] {
            if !report.import.needs_rebuild(list) {
                continue;
            }
            let rows = match rebuild_matches(self.store, list) {
                Ok(rows) => Some(rows),
                Err(err) => {
                    error!(list = list.path(), error = %err, "failed to rebuild version matches");
                    None
                }
            };
            match list {
                ProfileList::Mask => report.mask_rows = rows,
                ProfileList::Deprecated => report.deprecated_rows = rows,
            }
        }
    }

    fn record(&mut self, last_commit: String, preceding_commits: u64) {
        let application = Application {
            last_commit,
            preceding_commits,
            last_update: OffsetDateTime::now_utc(),
        };
        if let Err(err) = self.store.put_application(&application) {
            warn!(error = %err, "failed to record the application state");
        }
    }
}
