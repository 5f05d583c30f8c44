//! Reading the repository history from git.
//!
//! [`Vcs`] is the seam between the ingestion engine and the version
//! control system. [`Git`] implements it by running the `git` binary;
//! [`TreeDiffReader`] turns its raw output into [`RawCommit`]s and
//! [`FileChange`]s.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Hash of git's empty tree, the resume point of a first run.
pub const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// Log format understood by [`parse_log`]: a fixed seven line header
/// followed by the `--name-status` file list.
pub const LOG_FORMAT: &str = "commit %H%nAuthor: %an <%ae>%nAuthorDate: %aI%n\
                              Commit: %cn <%ce>%nCommitDate: %cI%n%n    %s";

const HEADER_LINES: usize = 7;

/// Version-control operations used during ingestion.
///
/// `log` and `diff` must exclude merge commits and report renames as a
/// delete plus an add.
pub trait Vcs {
    /// Commits after `since` up to `until`, oldest first, in
    /// [`LOG_FORMAT`] with `--name-status` file lists.
    fn log(&self, since: &str, until: &str) -> Result<String>;
    /// `STATUS<TAB>path` lines for every file changed between two revisions.
    fn diff(&self, since: &str, until: &str) -> Result<String>;
    /// Unified diff of `path` in commit `rev`.
    fn show(&self, rev: &str, path: &str) -> Result<String>;
    /// Every tracked file.
    fn ls_files(&self) -> Result<Vec<String>>;
}

/// [`Vcs`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct Git {
    repo: PathBuf,
}

impl Git {
    pub fn new(repo: impl Into<PathBuf>) -> Self {
        Git { repo: repo.into() }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(args = ?args, "running git");
        let failed = |message: String| Error::Vcs {
            command: args.join(" "),
            message,
        };
        let output = Command::new("git")
            .arg("--no-pager")
            .args(args)
            .current_dir(&self.repo)
            .output()
            .map_err(|e| failed(e.to_string()))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ))
        }
    }
}

impl Vcs for Git {
    fn log(&self, since: &str, until: &str) -> Result<String> {
        let format = format!("--format={LOG_FORMAT}");
        let range = format!("{since}..{until}");
        // The empty tree is not a commit, so a first run logs everything.
        let range: &str = if since == EMPTY_TREE { until } else { &range };
        self.run(&[
            "log",
            "--name-status",
            "--no-renames",
            "--no-merges",
            "--reverse",
            &format,
            range,
        ])
    }

    fn diff(&self, since: &str, until: &str) -> Result<String> {
        self.run(&["diff", "--name-status", "--no-renames", since, until])
    }

    fn show(&self, rev: &str, path: &str) -> Result<String> {
        self.run(&["show", "--format=", rev, "--", path])
    }

    fn ls_files(&self) -> Result<Vec<String>> {
        Ok(self
            .run(&["ls-files"])?
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

/// How a file changed in a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
}

impl FileStatus {
    /// The single-letter git status code.
    pub fn code(self) -> &'static str {
        match self {
            FileStatus::Added => "A",
            FileStatus::Modified => "M",
            FileStatus::Deleted => "D",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One `STATUS<TAB>path` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub status: FileStatus,
    /// Tree-relative path.
    pub path: String,
}

impl FileChange {
    pub fn new(status: FileStatus, path: impl Into<String>) -> Self {
        FileChange {
            status,
            path: path.into(),
        }
    }

    /// Parse a `--name-status` line.
    ///
    /// Returns `None` for blank lines, malformed lines and statuses other
    /// than add, modify and delete.
    ///
    /// ```
    /// use portage_history::{FileChange, FileStatus};
    ///
    /// let change = FileChange::parse("M\tdev-lang/rust/rust-1.80.0.ebuild").unwrap();
    /// assert_eq!(change.status, FileStatus::Modified);
    /// assert!(FileChange::parse("X\tfoo").is_none());
    /// ```
    pub fn parse(line: &str) -> Option<FileChange> {
        let (status, path) = line.split_once('\t')?;
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        let status = match status.trim().chars().next()? {
            'A' => FileStatus::Added,
            'M' => FileStatus::Modified,
            'D' => FileStatus::Deleted,
            _ => return None,
        };
        Some(FileChange::new(status, path))
    }
}

/// A commit as read from the log, before an ordinal is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub author_date: OffsetDateTime,
    pub committer_name: String,
    pub committer_email: String,
    pub committer_date: OffsetDateTime,
    /// Subject line.
    pub message: String,
    pub files: Vec<FileChange>,
}

impl RawCommit {
    /// Parse one commit block of [`LOG_FORMAT`] output.
    pub fn parse(block: &str) -> Result<RawCommit> {
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() < HEADER_LINES {
            return Err(Error::InvalidCommit(format!(
                "expected {HEADER_LINES} header lines, found {}",
                lines.len()
            )));
        }
        let mut cursor = Cursor { lines: &lines, pos: 0 };

        let id = cursor.field("commit ")?.to_string();
        let (author_name, author_email) = parse_identity(cursor.field("Author:")?)?;
        let author_date = parse_date(cursor.field("AuthorDate:")?)?;
        let (committer_name, committer_email) = parse_identity(cursor.field("Commit:")?)?;
        let committer_date = parse_date(cursor.field("CommitDate:")?)?;
        cursor.next();
        let message = cursor.next().unwrap_or_default().trim().to_string();

        let files = cursor.rest().iter().filter_map(|l| FileChange::parse(l)).collect();

        if id.is_empty() {
            return Err(Error::InvalidCommit("missing commit id".to_string()));
        }
        Ok(RawCommit {
            id,
            author_name,
            author_email,
            author_date,
            committer_name,
            committer_email,
            committer_date,
            message,
            files,
        })
    }
}

/// Line cursor over a commit block.
struct Cursor<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn next(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied();
        self.pos += 1;
        line
    }

    /// The current line with `prefix` removed and whitespace trimmed.
    fn field(&mut self, prefix: &str) -> Result<&'a str> {
        let line = self.next().unwrap_or_default();
        line.strip_prefix(prefix)
            .map(str::trim)
            .ok_or_else(|| Error::InvalidCommit(format!("expected `{prefix}`, found `{line}`")))
    }

    fn rest(&self) -> &'a [&'a str] {
        self.lines.get(self.pos..).unwrap_or_default()
    }
}

/// Split `Name <email>`.
fn parse_identity(value: &str) -> Result<(String, String)> {
    let invalid = || Error::InvalidAuthor(value.to_string());
    let (name, email) = value.rsplit_once('<').ok_or_else(invalid)?;
    let email = email.strip_suffix('>').ok_or_else(invalid)?;
    Ok((name.trim().to_string(), email.trim().to_string()))
}

fn parse_date(value: &str) -> Result<OffsetDateTime> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|e| Error::InvalidCommit(format!("invalid date `{value}`: {e}")))
}

/// Split log output into commit blocks and parse each one. Malformed
/// blocks are logged and dropped.
pub fn parse_log(output: &str) -> Vec<RawCommit> {
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in output.lines() {
        if line.starts_with("commit ") || blocks.is_empty() {
            blocks.push(Vec::new());
        }
        if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }

    blocks
        .into_iter()
        .filter(|block| block.iter().any(|l| !l.trim().is_empty()))
        .filter_map(|block| {
            let block = block.join("\n");
            match RawCommit::parse(&block) {
                Ok(commit) => Some(commit),
                Err(err) => {
                    let head = block.lines().next().unwrap_or_default();
                    warn!(block = head, error = %err, "skipping malformed commit");
                    None
                }
            }
        })
        .collect()
}

/// Parse `--name-status` diff output.
pub fn parse_changes(output: &str) -> Vec<FileChange> {
    output.lines().filter_map(FileChange::parse).collect()
}

/// Ordered commit and changed-file listings between two revisions.
pub struct TreeDiffReader<'a> {
    vcs: &'a dyn Vcs,
}

impl<'a> TreeDiffReader<'a> {
    pub fn new(vcs: &'a dyn Vcs) -> Self {
        TreeDiffReader { vcs }
    }

    /// Commits after `since` up to `until`, oldest first.
    pub fn commits(&self, since: &str, until: &str) -> Result<Vec<RawCommit>> {
        Ok(parse_log(&self.vcs.log(since, until)?))
    }

    /// Files changed between `since` and `until`.
    pub fn changes(&self, since: &str, until: &str) -> Result<Vec<FileChange>> {
        Ok(parse_changes(&self.vcs.diff(since, until)?))
    }

    /// The patch of one file in one commit.
    pub fn patch(&self, rev: &str, path: &str) -> Result<String> {
        self.vcs.show(rev, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const LOG: &str = "\
commit 1111111111111111111111111111111111111111
Author: Larry the Cow <larry@gentoo.org>
AuthorDate: 2024-01-02T03:04:05+01:00
Commit: Larry the Cow <larry@gentoo.org>
CommitDate: 2024-01-02T03:04:06+01:00

    cat/pkg: new package, add 1.0

A\tcat/pkg/metadata.xml
A\tcat/pkg/pkg-1.0.ebuild
commit 2222222222222222222222222222222222222222
Author: Jane Dev <jane@example.org>
AuthorDate: 2024-02-01T00:00:00Z
Commit: Larry the Cow <larry@gentoo.org>
CommitDate: 2024-02-01T10:00:00Z

    profiles: mask cat/pkg

M\tprofiles/package.mask
";

    #[test]
    fn parse_two_commits() {
        let commits = parse_log(LOG);
        assert_eq!(commits.len(), 2);

        let first = &commits[0];
        assert_eq!(first.id, "1111111111111111111111111111111111111111");
        assert_eq!(first.author_name, "Larry the Cow");
        assert_eq!(first.author_email, "larry@gentoo.org");
        assert_eq!(first.author_date, datetime!(2024-01-02 03:04:05 +01:00));
        assert_eq!(first.message, "cat/pkg: new package, add 1.0");
        assert_eq!(
            first.files,
            [
                FileChange::new(FileStatus::Added, "cat/pkg/metadata.xml"),
                FileChange::new(FileStatus::Added, "cat/pkg/pkg-1.0.ebuild"),
            ]
        );

        let second = &commits[1];
        assert_eq!(second.author_name, "Jane Dev");
        assert_eq!(second.committer_name, "Larry the Cow");
        assert_eq!(second.files[0].status, FileStatus::Modified);
    }

    #[test]
    fn malformed_commit_is_skipped() {
        let log = format!(
            "commit 0000000000000000000000000000000000000000\nAuthor: broken\n\n{LOG}"
        );
        let commits = parse_log(&log);
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].id, "1111111111111111111111111111111111111111");
    }

    #[test]
    fn short_block_is_invalid() {
        let err = RawCommit::parse("commit abc\nAuthor: A <a@b>\n").unwrap_err();
        assert!(matches!(err, Error::InvalidCommit(_)));
    }

    #[test]
    fn bad_author_line() {
        let block = LOG.replace("Jane Dev <jane@example.org>", "Jane Dev jane@example.org");
        let commits = parse_log(&block);
        assert_eq!(commits.len(), 1);
        assert!(matches!(
            parse_identity("Jane Dev jane@example.org"),
            Err(Error::InvalidAuthor(_))
        ));
    }

    #[test]
    fn commit_without_files() {
        let block = "\
commit abc
Author: A <a@example.org>
AuthorDate: 2024-01-01T00:00:00Z
Commit: A <a@example.org>
CommitDate: 2024-01-01T00:00:00Z

    empty
";
        let commit = RawCommit::parse(block).unwrap();
        assert!(commit.files.is_empty());
        assert_eq!(commit.message, "empty");
    }

    #[test]
    fn parse_diff_output() {
        let changes =
            parse_changes("A\tcat/pkg/pkg-1.0.ebuild\nD\tcat/old/metadata.xml\nR100\ta\tb\n\n");
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].status, FileStatus::Deleted);
    }
}
