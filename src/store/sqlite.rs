use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::{Error, Result};
use crate::model::{
    Application, Arch, Category, Commit, CommitToPackage, CommitToVersion, KeywordChange, Package,
    PkgMove, ProfileEntry, ProfileList, SpecifierToVersion, UseScope, Useflag, Version,
};
use crate::store::Store;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    name TEXT PRIMARY KEY,
    description TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS packages (
    atom TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    longdescription TEXT NOT NULL,
    maintainers TEXT NOT NULL,
    upstream TEXT NOT NULL,
    preceding_commits INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS versions (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    package TEXT NOT NULL,
    atom TEXT NOT NULL,
    version TEXT NOT NULL,
    slot TEXT NOT NULL,
    subslot TEXT NOT NULL,
    eapi TEXT NOT NULL,
    keywords TEXT NOT NULL,
    useflags TEXT NOT NULL,
    restricts TEXT NOT NULL,
    properties TEXT NOT NULL,
    homepage TEXT NOT NULL,
    license TEXT NOT NULL,
    description TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_versions_atom ON versions(atom);
CREATE TABLE IF NOT EXISTS commits (
    id TEXT PRIMARY KEY,
    preceding_commits INTEGER NOT NULL,
    author_name TEXT NOT NULL,
    author_email TEXT NOT NULL,
    author_date TEXT NOT NULL,
    committer_name TEXT NOT NULL,
    committer_email TEXT NOT NULL,
    committer_date TEXT NOT NULL,
    message TEXT NOT NULL,
    changed_files TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_commits_preceding ON commits(preceding_commits);
CREATE TABLE IF NOT EXISTS keyword_changes (
    id TEXT PRIMARY KEY,
    commit_id TEXT NOT NULL,
    version_id TEXT NOT NULL,
    package_id TEXT NOT NULL,
    added TEXT NOT NULL,
    stabilized TEXT NOT NULL,
    all_keywords TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_keyword_changes_commit ON keyword_changes(commit_id);
CREATE TABLE IF NOT EXISTS commit_to_packages (
    id TEXT PRIMARY KEY,
    commit_id TEXT NOT NULL,
    package_atom TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_commit_to_packages_atom ON commit_to_packages(package_atom);
CREATE TABLE IF NOT EXISTS commit_to_versions (
    id TEXT PRIMARY KEY,
    commit_id TEXT NOT NULL,
    version_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_commit_to_versions_version ON commit_to_versions(version_id);
CREATE TABLE IF NOT EXISTS masks (
    versions TEXT PRIMARY KEY,
    author TEXT NOT NULL,
    author_email TEXT NOT NULL,
    date TEXT,
    reason TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS deprecated_packages (
    versions TEXT PRIMARY KEY,
    author TEXT NOT NULL,
    author_email TEXT NOT NULL,
    date TEXT,
    reason TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS mask_to_versions (
    id TEXT PRIMARY KEY,
    versions TEXT NOT NULL,
    version_id TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS deprecated_to_versions (
    id TEXT PRIMARY KEY,
    versions TEXT NOT NULL,
    version_id TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS useflags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    scope TEXT NOT NULL,
    description TEXT NOT NULL,
    use_expand TEXT NOT NULL,
    package TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS arches (
    name TEXT PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS pkg_moves (
    source TEXT PRIMARY KEY,
    destination TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS application (
    id INTEGER PRIMARY KEY CHECK (id = 0),
    last_commit TEXT NOT NULL,
    preceding_commits INTEGER NOT NULL,
    last_update TEXT NOT NULL
);
";

const PACKAGE_COLUMNS: &str =
    "atom, category, name, longdescription, maintainers, upstream, preceding_commits";
const VERSION_COLUMNS: &str = "id, category, package, atom, version, slot, subslot, eapi, \
     keywords, useflags, restricts, properties, homepage, license, description";
const COMMIT_COLUMNS: &str = "id, preceding_commits, author_name, author_email, author_date, \
     committer_name, committer_email, committer_date, message, changed_files";

/// A [`Store`] backed by an SQLite database.
///
/// List-valued columns hold JSON arrays, timestamps RFC 3339 text.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the database at `path`, creating missing tables.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// An in-memory database, for tests.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteStore { conn })
    }

    fn query<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, map)?;
        Ok(rows.collect::<rusqlite::Result<Vec<T>>>()?)
    }

    fn query_one<T, P: Params>(
        &self,
        sql: &str,
        params: P,
        map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        Ok(self.conn.query_row(sql, params, map).optional()?)
    }
}

fn entry_table(list: ProfileList) -> &'static str {
    match list {
        ProfileList::Mask => "masks",
        ProfileList::Deprecated => "deprecated_packages",
    }
}

fn match_table(list: ProfileList) -> &'static str {
    match list {
        ProfileList::Mask => "mask_to_versions",
        ProfileList::Deprecated => "deprecated_to_versions",
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

fn to_timestamp(value: OffsetDateTime) -> Result<String> {
    value
        .format(&Rfc3339)
        .map_err(|e| Error::Store(e.to_string()))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let text: String = row.get(idx)?;
    OffsetDateTime::parse(&text, &Rfc3339).map_err(|e| conversion_error(idx, e))
}

fn to_date(value: Option<Date>) -> Result<Option<String>> {
    value
        .map(|d| d.format(format_description!("[year]-[month]-[day]")))
        .transpose()
        .map_err(|e| Error::Store(e.to_string()))
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Date>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| Date::parse(&t, format_description!("[year]-[month]-[day]")))
        .transpose()
        .map_err(|e| conversion_error(idx, e))
}

fn package_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        atom: row.get(0)?,
        category: row.get(1)?,
        name: row.get(2)?,
        longdescription: row.get(3)?,
        maintainers: json_column(row, 4)?,
        upstream: json_column(row, 5)?,
        preceding_commits: row.get(6)?,
    })
}

fn version_row(row: &Row<'_>) -> rusqlite::Result<Version> {
    Ok(Version {
        id: row.get(0)?,
        category: row.get(1)?,
        package: row.get(2)?,
        atom: row.get(3)?,
        version: row.get(4)?,
        slot: row.get(5)?,
        subslot: row.get(6)?,
        eapi: row.get(7)?,
        keywords: row.get(8)?,
        useflags: json_column(row, 9)?,
        restricts: json_column(row, 10)?,
        properties: json_column(row, 11)?,
        homepage: json_column(row, 12)?,
        license: row.get(13)?,
        description: row.get(14)?,
    })
}

fn commit_row(row: &Row<'_>) -> rusqlite::Result<Commit> {
    Ok(Commit {
        id: row.get(0)?,
        preceding_commits: row.get(1)?,
        author_name: row.get(2)?,
        author_email: row.get(3)?,
        author_date: timestamp_column(row, 4)?,
        committer_name: row.get(5)?,
        committer_email: row.get(6)?,
        committer_date: timestamp_column(row, 7)?,
        message: row.get(8)?,
        changed_files: json_column(row, 9)?,
    })
}

fn entry_row(row: &Row<'_>) -> rusqlite::Result<ProfileEntry> {
    Ok(ProfileEntry {
        versions: row.get(0)?,
        author: row.get(1)?,
        author_email: row.get(2)?,
        date: date_column(row, 3)?,
        reason: row.get(4)?,
    })
}

fn useflag_row(row: &Row<'_>) -> rusqlite::Result<Useflag> {
    let scope: String = row.get(2)?;
    let scope = UseScope::parse(&scope)
        .ok_or_else(|| conversion_error(2, Error::Store(format!("unknown scope {scope}"))))?;
    Ok(Useflag {
        id: row.get(0)?,
        name: row.get(1)?,
        scope,
        description: row.get(3)?,
        use_expand: row.get(4)?,
        package: row.get(5)?,
    })
}

impl Store for SqliteStore {
    fn upsert_category(&mut self, category: &Category) -> Result<()> {
        self.conn.execute(
            "INSERT INTO categories (name, description) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET description = excluded.description",
            params![category.name, category.description],
        )?;
        Ok(())
    }

    fn delete_category(&mut self, name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM categories WHERE name = ?1", params![name])?;
        Ok(())
    }

    fn categories(&self) -> Result<Vec<Category>> {
        self.query(
            "SELECT name, description FROM categories ORDER BY name",
            [],
            |row| {
                Ok(Category {
                    name: row.get(0)?,
                    description: row.get(1)?,
                })
            },
        )
    }

    fn upsert_package(&mut self, package: &Package) -> Result<()> {
        self.conn.execute(
            "INSERT INTO packages
                (atom, category, name, longdescription, maintainers, upstream, preceding_commits)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(atom) DO UPDATE SET
                category = excluded.category,
                name = excluded.name,
                longdescription = excluded.longdescription,
                maintainers = excluded.maintainers,
                upstream = excluded.upstream",
            params![
                package.atom,
                package.category,
                package.name,
                package.longdescription,
                to_json(&package.maintainers)?,
                to_json(&package.upstream)?,
                package.preceding_commits,
            ],
        )?;
        Ok(())
    }

    fn delete_package(&mut self, atom: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM packages WHERE atom = ?1", params![atom])?;
        Ok(())
    }

    fn package(&self, atom: &str) -> Result<Option<Package>> {
        self.query_one(
            &format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE atom = ?1"),
            params![atom],
            package_row,
        )
    }

    fn packages(&self) -> Result<Vec<Package>> {
        self.query(
            &format!("SELECT {PACKAGE_COLUMNS} FROM packages ORDER BY atom"),
            [],
            package_row,
        )
    }

    fn set_preceding_commits(&mut self, atom: &str, preceding_commits: u64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE packages SET preceding_commits = ?2 WHERE atom = ?1",
            params![atom, preceding_commits],
        )?;
        Ok(rows > 0)
    }

    fn upsert_version(&mut self, version: &Version) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO versions ({VERSION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            ),
            params![
                version.id,
                version.category,
                version.package,
                version.atom,
                version.version,
                version.slot,
                version.subslot,
                version.eapi,
                version.keywords,
                to_json(&version.useflags)?,
                to_json(&version.restricts)?,
                to_json(&version.properties)?,
                to_json(&version.homepage)?,
                version.license,
                version.description,
            ],
        )?;
        Ok(())
    }

    fn delete_version(&mut self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM versions WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn version(&self, id: &str) -> Result<Option<Version>> {
        self.query_one(
            &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE id = ?1"),
            params![id],
            version_row,
        )
    }

    fn versions_of(&self, atom: &str) -> Result<Vec<Version>> {
        self.query(
            &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE atom = ?1 ORDER BY id"),
            params![atom],
            version_row,
        )
    }

    fn versions(&self) -> Result<Vec<Version>> {
        self.query(
            &format!("SELECT {VERSION_COLUMNS} FROM versions ORDER BY id"),
            [],
            version_row,
        )
    }

    fn upsert_commit(&mut self, commit: &Commit) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO commits ({COMMIT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    preceding_commits = excluded.preceding_commits,
                    author_name = excluded.author_name,
                    author_email = excluded.author_email,
                    author_date = excluded.author_date,
                    committer_name = excluded.committer_name,
                    committer_email = excluded.committer_email,
                    committer_date = excluded.committer_date,
                    message = excluded.message,
                    changed_files = excluded.changed_files"
            ),
            params![
                commit.id,
                commit.preceding_commits,
                commit.author_name,
                commit.author_email,
                to_timestamp(commit.author_date)?,
                commit.committer_name,
                commit.committer_email,
                to_timestamp(commit.committer_date)?,
                commit.message,
                to_json(&commit.changed_files)?,
            ],
        )?;
        Ok(())
    }

    fn commit(&self, id: &str) -> Result<Option<Commit>> {
        self.query_one(
            &format!("SELECT {COMMIT_COLUMNS} FROM commits WHERE id = ?1"),
            params![id],
            commit_row,
        )
    }

    fn latest_commit(&self) -> Result<Option<Commit>> {
        self.query_one(
            &format!(
                "SELECT {COMMIT_COLUMNS} FROM commits ORDER BY preceding_commits DESC LIMIT 1"
            ),
            [],
            commit_row,
        )
    }

    fn commit_count(&self) -> Result<usize> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM commits", [], |row| row.get(0))?)
    }

    fn upsert_keyword_change(&mut self, change: &KeywordChange) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO keyword_changes
                (id, commit_id, version_id, package_id, added, stabilized, all_keywords)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                change.id,
                change.commit_id,
                change.version_id,
                change.package_id,
                to_json(&change.added)?,
                to_json(&change.stabilized)?,
                to_json(&change.all)?,
            ],
        )?;
        Ok(())
    }

    fn keyword_changes(&self, commit_id: &str) -> Result<Vec<KeywordChange>> {
        self.query(
            "SELECT id, commit_id, version_id, package_id, added, stabilized, all_keywords
             FROM keyword_changes WHERE commit_id = ?1 ORDER BY id",
            params![commit_id],
            |row| {
                Ok(KeywordChange {
                    id: row.get(0)?,
                    commit_id: row.get(1)?,
                    version_id: row.get(2)?,
                    package_id: row.get(3)?,
                    added: json_column(row, 4)?,
                    stabilized: json_column(row, 5)?,
                    all: json_column(row, 6)?,
                })
            },
        )
    }

    fn link_package(&mut self, link: &CommitToPackage) -> Result<()> {
        self.conn.execute(
            "INSERT INTO commit_to_packages (id, commit_id, package_atom) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO NOTHING",
            params![link.id, link.commit_id, link.package_atom],
        )?;
        Ok(())
    }

    fn link_version(&mut self, link: &CommitToVersion) -> Result<()> {
        self.conn.execute(
            "INSERT INTO commit_to_versions (id, commit_id, version_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO NOTHING",
            params![link.id, link.commit_id, link.version_id],
        )?;
        Ok(())
    }

    fn package_commits(&self, atom: &str) -> Result<Vec<String>> {
        self.query(
            "SELECT commit_id FROM commit_to_packages WHERE package_atom = ?1 ORDER BY id",
            params![atom],
            |row| row.get(0),
        )
    }

    fn version_commits(&self, version_id: &str) -> Result<Vec<String>> {
        self.query(
            "SELECT commit_id FROM commit_to_versions WHERE version_id = ?1 ORDER BY id",
            params![version_id],
            |row| row.get(0),
        )
    }

    fn replace_entries(&mut self, list: ProfileList, entries: &[ProfileEntry]) -> Result<()> {
        let table = entry_table(list);
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        for entry in entries {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {table} (versions, author, author_email, date, reason)
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                params![
                    entry.versions,
                    entry.author,
                    entry.author_email,
                    to_date(entry.date)?,
                    entry.reason,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn entries(&self, list: ProfileList) -> Result<Vec<ProfileEntry>> {
        self.query(
            &format!(
                "SELECT versions, author, author_email, date, reason FROM {} ORDER BY versions",
                entry_table(list)
            ),
            [],
            entry_row,
        )
    }

    fn replace_matches(&mut self, list: ProfileList, rows: &[SpecifierToVersion]) -> Result<()> {
        let table = match_table(list);
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        for row in rows {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {table} (id, versions, version_id) VALUES (?1, ?2, ?3)"
                ),
                params![row.id, row.versions, row.version_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn matches(&self, list: ProfileList) -> Result<Vec<SpecifierToVersion>> {
        self.query(
            &format!(
                "SELECT id, versions, version_id FROM {} ORDER BY id",
                match_table(list)
            ),
            [],
            |row| {
                Ok(SpecifierToVersion {
                    id: row.get(0)?,
                    versions: row.get(1)?,
                    version_id: row.get(2)?,
                })
            },
        )
    }

    fn upsert_useflag(&mut self, flag: &Useflag) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO useflags (id, name, scope, description, use_expand, package)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                flag.id,
                flag.name,
                flag.scope.as_str(),
                flag.description,
                flag.use_expand,
                flag.package,
            ],
        )?;
        Ok(())
    }

    fn useflags(&self) -> Result<Vec<Useflag>> {
        self.query(
            "SELECT id, name, scope, description, use_expand, package FROM useflags ORDER BY id",
            [],
            useflag_row,
        )
    }

    fn replace_arches(&mut self, arches: &[Arch]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM arches", [])?;
        for arch in arches {
            tx.execute(
                "INSERT OR IGNORE INTO arches (name) VALUES (?1)",
                params![arch.name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn arches(&self) -> Result<Vec<Arch>> {
        self.query("SELECT name FROM arches ORDER BY rowid", [], |row| {
            Ok(Arch { name: row.get(0)? })
        })
    }

    fn upsert_pkg_move(&mut self, pkg_move: &PkgMove) -> Result<()> {
        self.conn.execute(
            "INSERT INTO pkg_moves (source, destination) VALUES (?1, ?2)
             ON CONFLICT(source) DO UPDATE SET destination = excluded.destination",
            params![pkg_move.source, pkg_move.destination],
        )?;
        Ok(())
    }

    fn pkg_moves(&self) -> Result<Vec<PkgMove>> {
        self.query(
            "SELECT source, destination FROM pkg_moves ORDER BY source",
            [],
            |row| {
                Ok(PkgMove {
                    source: row.get(0)?,
                    destination: row.get(1)?,
                })
            },
        )
    }

    fn put_application(&mut self, application: &Application) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO application (id, last_commit, preceding_commits, last_update)
             VALUES (0, ?1, ?2, ?3)",
            params![
                application.last_commit,
                application.preceding_commits,
                to_timestamp(application.last_update)?,
            ],
        )?;
        Ok(())
    }

    fn application(&self) -> Result<Option<Application>> {
        self.query_one(
            "SELECT last_commit, preceding_commits, last_update FROM application WHERE id = 0",
            [],
            |row| {
                Ok(Application {
                    last_commit: row.get(0)?,
                    preceding_commits: row.get(1)?,
                    last_update: timestamp_column(row, 2)?,
                })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangedFile, ChangedFiles, Maintainer};
    use time::macros::{date, datetime};

    fn commit(id: &str, preceding_commits: u64) -> Commit {
        Commit {
            id: id.to_string(),
            preceding_commits,
            author_name: "Larry".to_string(),
            author_email: "larry@gentoo.org".to_string(),
            author_date: datetime!(2024-01-02 03:04:05 +01:00),
            committer_name: "Larry".to_string(),
            committer_email: "larry@gentoo.org".to_string(),
            committer_date: datetime!(2024-01-02 03:04:05 UTC),
            message: "cat/pkg: add 1.0".to_string(),
            changed_files: ChangedFiles {
                added: vec![ChangedFile {
                    path: "cat/pkg/pkg-1.0.ebuild".to_string(),
                    change_type: "A".to_string(),
                }],
                ..ChangedFiles::default()
            },
        }
    }

    #[test]
    fn commits_round_trip_and_latest() {
        let mut store = SqliteStore::in_memory().unwrap();
        store.upsert_commit(&commit("aaa", 1)).unwrap();
        store.upsert_commit(&commit("bbb", 2)).unwrap();
        store.upsert_commit(&commit("aaa", 1)).unwrap();

        assert_eq!(store.commit_count().unwrap(), 2);
        assert_eq!(store.latest_commit().unwrap().unwrap().id, "bbb");
        assert_eq!(store.commit("aaa").unwrap().unwrap(), commit("aaa", 1));
        assert!(store.commit("ccc").unwrap().is_none());
    }

    #[test]
    fn package_upsert_keeps_preceding_commits() {
        let mut store = SqliteStore::in_memory().unwrap();
        let mut package = Package {
            atom: "cat/pkg".to_string(),
            category: "cat".to_string(),
            name: "pkg".to_string(),
            maintainers: vec![Maintainer {
                email: "dev@gentoo.org".to_string(),
                kind: "person".to_string(),
                ..Maintainer::default()
            }],
            ..Package::default()
        };
        store.upsert_package(&package).unwrap();
        assert!(store.set_preceding_commits("cat/pkg", 4).unwrap());

        package.longdescription = "updated".to_string();
        store.upsert_package(&package).unwrap();

        let stored = store.package("cat/pkg").unwrap().unwrap();
        assert_eq!(stored.preceding_commits, 4);
        assert_eq!(stored.longdescription, "updated");
        assert_eq!(stored.maintainers, package.maintainers);
    }

    #[test]
    fn versions_by_atom() {
        let mut store = SqliteStore::in_memory().unwrap();
        for (atom, v) in [("cat/pkg", "1.0"), ("cat/pkg", "2.0"), ("cat/other", "1.0")] {
            store
                .upsert_version(&Version {
                    id: format!("{atom}-{v}"),
                    atom: atom.to_string(),
                    version: v.to_string(),
                    slot: "0".to_string(),
                    subslot: "0".to_string(),
                    useflags: vec!["ssl".to_string()],
                    ..Version::default()
                })
                .unwrap();
        }
        let versions = store.versions_of("cat/pkg").unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].useflags, ["ssl"]);

        store.delete_version("cat/pkg-1.0").unwrap();
        assert_eq!(store.versions_of("cat/pkg").unwrap().len(), 1);
    }

    #[test]
    fn profile_entries_replace() {
        let mut store = SqliteStore::in_memory().unwrap();
        let entry = ProfileEntry {
            versions: "=cat/pkg-1.0".to_string(),
            author: "Larry".to_string(),
            author_email: "larry@gentoo.org".to_string(),
            date: Some(date!(2024 - 03 - 01)),
            reason: "Broken.".to_string(),
        };
        store
            .replace_entries(ProfileList::Mask, &[entry.clone()])
            .unwrap();
        assert_eq!(store.entries(ProfileList::Mask).unwrap(), [entry]);
        assert!(store.entries(ProfileList::Deprecated).unwrap().is_empty());

        store.replace_entries(ProfileList::Mask, &[]).unwrap();
        assert!(store.entries(ProfileList::Mask).unwrap().is_empty());
    }

    #[test]
    fn application_row() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(store.application().unwrap().is_none());
        let app = Application {
            last_commit: "abc".to_string(),
            preceding_commits: 12,
            last_update: datetime!(2024-05-06 07:08:09 UTC),
        };
        store.put_application(&app).unwrap();
        store.put_application(&app).unwrap();
        assert_eq!(store.application().unwrap(), Some(app));
    }

    #[test]
    fn useflags_and_links() {
        let mut store = SqliteStore::in_memory().unwrap();
        store
            .upsert_useflag(&Useflag {
                id: "cat/pkg-local-ssl".to_string(),
                name: "ssl".to_string(),
                scope: UseScope::Local,
                description: "Enable TLS".to_string(),
                use_expand: String::new(),
                package: "cat/pkg".to_string(),
            })
            .unwrap();
        assert_eq!(store.useflags().unwrap()[0].scope, UseScope::Local);

        let link = CommitToVersion {
            id: "abc-cat/pkg-1.0".to_string(),
            commit_id: "abc".to_string(),
            version_id: "cat/pkg-1.0".to_string(),
        };
        store.link_version(&link).unwrap();
        store.link_version(&link).unwrap();
        assert_eq!(store.version_commits("cat/pkg-1.0").unwrap(), ["abc"]);
    }

    #[test]
    fn open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.sqlite");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store
                .replace_arches(&[
                    Arch {
                        name: "amd64".to_string(),
                    },
                    Arch {
                        name: "arm64".to_string(),
                    },
                ])
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let names: Vec<String> = store.arches().unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, ["amd64", "arm64"]);
    }
}
