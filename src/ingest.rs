//! Replaying commits into the store.
//!
//! Every commit gets an ordinal one past its predecessor's, counted over
//! the whole history. A run resumes after the latest stored commit, so
//! ordinals stay gap-free however many runs it takes to reach `until`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::git::{parse_log, FileChange, FileStatus, RawCommit, TreeDiffReader, Vcs, EMPTY_TREE};
use crate::import::{is_category, package_of, EbuildPath};
use crate::keyword::KeywordDiff;
use crate::model::{
    ChangedFile, ChangedFiles, Commit, CommitToPackage, CommitToVersion, KeywordChange,
};
use crate::store::Store;

/// Commits between two progress log lines.
const PROGRESS_INTERVAL: usize = 1000;

/// Where a run starts: the last stored commit and its ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub commit: String,
    pub offset: u64,
}

impl ResumePoint {
    /// The latest stored commit, or the empty tree with offset 0.
    pub fn load(store: &dyn Store) -> Result<ResumePoint> {
        Ok(match store.latest_commit()? {
            Some(commit) => ResumePoint {
                commit: commit.id,
                offset: commit.preceding_commits,
            },
            None => ResumePoint::start(),
        })
    }

    /// The beginning of history.
    pub fn start() -> ResumePoint {
        ResumePoint {
            commit: EMPTY_TREE.to_string(),
            offset: 0,
        }
    }

    pub fn is_start(&self) -> bool {
        self.commit == EMPTY_TREE
    }
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Id of the last replayed commit.
    pub last_commit: Option<String>,
    /// Ordinal of the last replayed commit, or the resume offset when
    /// nothing was replayed.
    pub high_water: u64,
    pub processed: usize,
    /// Log blocks that could not be parsed.
    pub skipped: usize,
    pub keyword_changes: usize,
    /// Packages whose first-seen ordinal was recorded.
    pub first_seen: usize,
    /// Rows the store rejected.
    pub failed_rows: usize,
}

/// Rows collected from replayed commits, written every `batch_size`
/// commits.
#[derive(Debug, Default)]
struct Batch {
    commits: Vec<Commit>,
    packages: Vec<CommitToPackage>,
    versions: Vec<CommitToVersion>,
    keywords: Vec<KeywordChange>,
}

impl Batch {
    fn len(&self) -> usize {
        self.commits.len()
    }
}

/// Replays the commits of a revision range into a [`Store`].
pub struct CommitIngestor<'a> {
    store: &'a mut dyn Store,
    reader: TreeDiffReader<'a>,
    vcs: &'a dyn Vcs,
    batch_size: usize,
}

impl<'a> CommitIngestor<'a> {
    pub fn new(store: &'a mut dyn Store, vcs: &'a dyn Vcs, batch_size: usize) -> Self {
        CommitIngestor {
            store,
            reader: TreeDiffReader::new(vcs),
            vcs,
            batch_size: batch_size.max(1),
        }
    }

    /// Replay the commits after `resume` up to `until`.
    ///
    /// Malformed commits and unreadable patches are logged and skipped, as
    /// are rows the store rejects. Only a failing `log` call aborts the
    /// run.
    #[instrument(skip_all, fields(since = %resume.commit, until = %until))]
    pub fn run(&mut self, resume: &ResumePoint, until: &str) -> Result<IngestReport> {
        let output = self.vcs.log(&resume.commit, until)?;
        let blocks = output.lines().filter(|l| l.starts_with("commit ")).count();
        let commits = parse_log(&output);

        let mut report = IngestReport {
            high_water: resume.offset,
            skipped: blocks.saturating_sub(commits.len()),
            ..IngestReport::default()
        };
        let total = commits.len();
        let mut batch = Batch::default();
        let mut first_seen: BTreeMap<String, u64> = BTreeMap::new();

        for (idx, raw) in commits.into_iter().enumerate() {
            let ordinal = resume.offset + idx as u64 + 1;
            if idx % PROGRESS_INTERVAL == 0 {
                info!(commit = %raw.id, ordinal, done = idx, total, "replaying commits");
            }

            for change in &raw.files {
                if change.status != FileStatus::Added {
                    continue;
                }
                if let Some((category, name)) = package_of(&change.path) {
                    first_seen
                        .entry(format!("{category}/{name}"))
                        .or_insert(ordinal);
                }
            }

            self.collect(&raw, ordinal, &mut batch);
            report.processed += 1;
            report.high_water = ordinal;
            report.last_commit = Some(raw.id);

            if batch.len() >= self.batch_size {
                report.keyword_changes += batch.keywords.len();
                report.failed_rows += self.flush(&mut batch);
            }
        }
        report.keyword_changes += batch.keywords.len();
        report.failed_rows += self.flush(&mut batch);

        for (atom, ordinal) in &first_seen {
            match self.store.set_preceding_commits(atom, *ordinal) {
                Ok(true) => report.first_seen += 1,
                Ok(false) => debug!(package = %atom, "first-seen package is not stored"),
                Err(err) => {
                    error!(package = %atom, error = %err, "failed to record first-seen ordinal");
                    report.failed_rows += 1;
                }
            }
        }

        info!(
            processed = report.processed,
            skipped = report.skipped,
            high_water = report.high_water,
            keyword_changes = report.keyword_changes,
            "replayed commits"
        );
        Ok(report)
    }

    /// Turn one commit into rows.
    fn collect(&self, raw: &RawCommit, ordinal: u64, batch: &mut Batch) {
        let mut packages = BTreeSet::new();
        let mut versions = BTreeSet::new();

        for change in &raw.files {
            let mut segments = change.path.split('/');
            if let (Some(category), Some(package), Some(_)) =
                (segments.next(), segments.next(), segments.next())
            {
                if is_category(category) && !package.is_empty() {
                    packages.insert(format!("{category}/{package}"));
                }
            }

            let Some(ebuild) = EbuildPath::parse(&change.path) else {
                continue;
            };
            versions.insert(ebuild.version_id());
            if change.status != FileStatus::Deleted {
                if let Some(keywords) = self.keyword_change(&raw.id, change, &ebuild) {
                    batch.keywords.push(keywords);
                }
            }
        }

        batch
            .packages
            .extend(packages.into_iter().map(|atom| CommitToPackage {
                id: format!("{}-{atom}", raw.id),
                commit_id: raw.id.clone(),
                package_atom: atom,
            }));
        batch
            .versions
            .extend(versions.into_iter().map(|version_id| CommitToVersion {
                id: format!("{}-{version_id}", raw.id),
                commit_id: raw.id.clone(),
                version_id,
            }));
        batch.commits.push(to_commit(raw, ordinal));
    }

    fn keyword_change(
        &self,
        commit: &str,
        change: &FileChange,
        ebuild: &EbuildPath,
    ) -> Option<KeywordChange> {
        let patch = match self.reader.patch(commit, &change.path) {
            Ok(patch) => patch,
            Err(err) => {
                warn!(commit, path = %change.path, error = %err, "cannot read patch");
                return None;
            }
        };
        let diff = KeywordDiff::from_patch(&patch, change.status == FileStatus::Added)?;
        Some(KeywordChange {
            id: format!("{commit}-{}", change.path),
            commit_id: commit.to_string(),
            version_id: ebuild.version_id(),
            package_id: ebuild.atom(),
            added: diff.added,
            stabilized: diff.stabilized,
            all: diff.all,
        })
    }

    /// Write and clear the batch, returning the number of rejected rows.
    ///
    /// Commits go last so the resume point never passes a commit whose
    /// rows were not attempted.
    fn flush(&mut self, batch: &mut Batch) -> usize {
        if batch.commits.is_empty() {
            return 0;
        }
        let mut failed = 0;
        let mut check = |result: Result<()>, kind: &str, id: &str| {
            if let Err(err) = result {
                error!(kind, id, error = %err, "failed to write row");
                failed += 1;
            }
        };

        for link in batch.packages.drain(..) {
            check(self.store.link_package(&link), "commit_to_package", &link.id);
        }
        for link in batch.versions.drain(..) {
            check(self.store.link_version(&link), "commit_to_version", &link.id);
        }
        for change in batch.keywords.drain(..) {
            check(self.store.upsert_keyword_change(&change), "keyword_change", &change.id);
        }
        let written = batch.commits.len();
        for commit in batch.commits.drain(..) {
            check(self.store.upsert_commit(&commit), "commit", &commit.id);
        }
        debug!(commits = written, failed, "flushed batch");
        failed
    }
}

fn to_commit(raw: &RawCommit, ordinal: u64) -> Commit {
    let mut changed_files = ChangedFiles::default();
    for change in &raw.files {
        let file = ChangedFile {
            path: change.path.clone(),
            change_type: change.status.code().to_string(),
        };
        match change.status {
            FileStatus::Added => changed_files.added.push(file),
            FileStatus::Modified => changed_files.modified.push(file),
            FileStatus::Deleted => changed_files.deleted.push(file),
        }
    }
    Commit {
        id: raw.id.clone(),
        preceding_commits: ordinal,
        author_name: raw.author_name.clone(),
        author_email: raw.author_email.clone(),
        author_date: raw.author_date,
        committer_name: raw.committer_name.clone(),
        committer_email: raw.committer_email.clone(),
        committer_date: raw.committer_date,
        message: raw.message.clone(),
        changed_files,
    }
}
