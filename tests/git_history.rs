//! Update runs against a real git repository.
//!
//! Skipped when no `git` binary is available.

use std::fs;
use std::path::Path;
use std::process::Command;

use portage_history::{resolve, Config, Git, MemoryStore, ProfileList, Store, Updater};

fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Larry the Cow",
            "-c",
            "user.email=larry@gentoo.org",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(repo)
        .output()
        .unwrap();
    assert!(output.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap().trim().to_string()
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok_and(|o| o.status.success())
}

fn write(root: &Path, path: &str, content: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn ebuild(keywords: &str) -> String {
    format!("EAPI=8\n\nDESCRIPTION=\"A test package\"\nSLOT=\"0\"\nKEYWORDS=\"{keywords}\"\n")
}

fn cache(keywords: &str) -> String {
    format!("DESCRIPTION=A test package\nEAPI=8\nKEYWORDS={keywords}\nSLOT=0\n")
}

fn commit(repo: &Path, message: &str) -> String {
    git(repo, &["add", "-A"]);
    git(repo, &["commit", "-q", "-m", message]);
    git(repo, &["rev-parse", "HEAD"])
}

fn config(repo: &Path) -> Config {
    Config {
        repository: repo.to_path_buf(),
        ..Config::default()
    }
}

#[test]
fn incremental_updates_follow_the_history() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    git(repo, &["init", "-q"]);

    write(
        repo,
        "dev-lang/metadata.xml",
        "<catmetadata><longdescription>Languages</longdescription></catmetadata>",
    );
    write(repo, "dev-lang/foo/metadata.xml", "<pkgmetadata></pkgmetadata>");
    write(repo, "dev-lang/foo/foo-1.0.ebuild", &ebuild("~amd64 ~x86"));
    write(repo, "metadata/md5-cache/dev-lang/foo-1.0", &cache("~amd64 ~x86"));
    let first = commit(repo, "dev-lang/foo: new package, add 1.0");

    write(
        repo,
        "profiles/package.mask",
        "#--- END OF EXAMPLES ---\n\n\
         # Larry the Cow <larry@gentoo.org> (2024-05-01)\n# Testing.\n<dev-lang/foo-2\n",
    );
    commit(repo, "profiles: mask dev-lang/foo");

    let git_vcs = Git::new(repo);
    let mut store = MemoryStore::new();
    let report = Updater::new(&mut store, &git_vcs, config(repo))
        .run_incremental_update()
        .unwrap();
    assert_eq!(report.ingest.processed, 2);
    assert_eq!(report.import.failed, 0);
    assert_eq!(store.commit(&first).unwrap().unwrap().preceding_commits, 1);
    assert_eq!(store.package("dev-lang/foo").unwrap().unwrap().preceding_commits, 1);
    assert_eq!(store.keyword_changes(&first).unwrap()[0].added, ["~amd64", "~x86"]);
    assert_eq!(store.matches(ProfileList::Mask).unwrap().len(), 1);

    write(repo, "dev-lang/foo/foo-1.0.ebuild", &ebuild("amd64 ~x86"));
    write(repo, "metadata/md5-cache/dev-lang/foo-1.0", &cache("amd64 ~x86"));
    write(repo, "dev-lang/foo/foo-2.0.ebuild", &ebuild("~amd64"));
    write(repo, "metadata/md5-cache/dev-lang/foo-2.0", &cache("~amd64"));
    let third = commit(repo, "dev-lang/foo: stabilize 1.0 on amd64, add 2.0");

    let report = Updater::new(&mut store, &git_vcs, config(repo))
        .run_incremental_update()
        .unwrap();
    assert_eq!(report.ingest.processed, 1);

    let commit = store.commit(&third).unwrap().unwrap();
    assert_eq!(commit.preceding_commits, 3);
    assert_eq!(commit.author_name, "Larry the Cow");
    assert_eq!(commit.message, "dev-lang/foo: stabilize 1.0 on amd64, add 2.0");
    assert_eq!(commit.changed_files.modified.len(), 2);
    assert_eq!(commit.changed_files.added.len(), 2);

    let changes = store.keyword_changes(&third).unwrap();
    let stabilized = changes.iter().find(|c| c.version_id == "dev-lang/foo-1.0").unwrap();
    assert_eq!(stabilized.stabilized, ["amd64"]);
    let added = changes.iter().find(|c| c.version_id == "dev-lang/foo-2.0").unwrap();
    assert_eq!(added.added, ["~amd64"]);

    let versions = resolve(&store, ">=dev-lang/foo-1.0", "dev-lang/foo").unwrap();
    assert_eq!(versions.len(), 2);
    let masked = store.matches(ProfileList::Mask).unwrap();
    assert_eq!(masked.len(), 1);
    assert_eq!(masked[0].version_id, "dev-lang/foo-1.0");

    let application = store.application().unwrap().unwrap();
    assert_eq!(application.last_commit, third);
    assert_eq!(application.preceding_commits, 3);

    let report = Updater::new(&mut store, &git_vcs, config(repo))
        .run_incremental_update()
        .unwrap();
    assert_eq!(report.ingest.processed, 0);
    assert_eq!(store.commit_count().unwrap(), 3);
}

#[test]
fn renames_are_a_delete_and_an_add() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let repo = dir.path();
    git(repo, &["init", "-q"]);

    write(repo, "dev-lang/metadata.xml", "<catmetadata></catmetadata>");
    write(repo, "dev-lang/foo/metadata.xml", "<pkgmetadata></pkgmetadata>");
    write(repo, "dev-lang/foo/foo-1.0.ebuild", &ebuild("~amd64"));
    write(repo, "metadata/md5-cache/dev-lang/foo-1.0", &cache("~amd64"));
    commit(repo, "add foo");

    git(repo, &["mv", "dev-lang/foo/foo-1.0.ebuild", "dev-lang/foo/foo-1.0-r1.ebuild"]);
    git(
        repo,
        &[
            "mv",
            "metadata/md5-cache/dev-lang/foo-1.0",
            "metadata/md5-cache/dev-lang/foo-1.0-r1",
        ],
    );
    let rename = commit(repo, "revbump foo");

    let git_vcs = Git::new(repo);
    let mut store = MemoryStore::new();
    Updater::new(&mut store, &git_vcs, config(repo))
        .run_incremental_update()
        .unwrap();

    let commit = store.commit(&rename).unwrap().unwrap();
    assert!(commit
        .changed_files
        .deleted
        .iter()
        .any(|f| f.path == "dev-lang/foo/foo-1.0.ebuild"));
    assert!(commit
        .changed_files
        .added
        .iter()
        .any(|f| f.path == "dev-lang/foo/foo-1.0-r1.ebuild"));
    assert_eq!(store.version_commits("dev-lang/foo-1.0-r1").unwrap(), [rename.clone()]);
    assert!(store.version("dev-lang/foo-1.0-r1").unwrap().is_some());
    assert!(store.version("dev-lang/foo-1.0").unwrap().is_none());
}
