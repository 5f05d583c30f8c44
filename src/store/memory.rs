use std::collections::BTreeMap;

use crate::error::Result;
use crate::model::{
    Application, Arch, Category, Commit, CommitToPackage, CommitToVersion, KeywordChange, Package,
    PkgMove, ProfileEntry, ProfileList, SpecifierToVersion, Useflag, Version,
};
use crate::store::Store;

/// A [`Store`] kept entirely in memory.
///
/// Tables are ordered maps keyed by primary identifier, so scans are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    categories: BTreeMap<String, Category>,
    packages: BTreeMap<String, Package>,
    versions: BTreeMap<String, Version>,
    commits: BTreeMap<String, Commit>,
    keyword_changes: BTreeMap<String, KeywordChange>,
    package_links: BTreeMap<String, CommitToPackage>,
    version_links: BTreeMap<String, CommitToVersion>,
    masks: BTreeMap<String, ProfileEntry>,
    deprecated: BTreeMap<String, ProfileEntry>,
    mask_matches: BTreeMap<String, SpecifierToVersion>,
    deprecated_matches: BTreeMap<String, SpecifierToVersion>,
    useflags: BTreeMap<String, Useflag>,
    arches: Vec<Arch>,
    pkg_moves: BTreeMap<String, PkgMove>,
    application: Option<Application>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_table(&mut self, list: ProfileList) -> &mut BTreeMap<String, ProfileEntry> {
        match list {
            ProfileList::Mask => &mut self.masks,
            ProfileList::Deprecated => &mut self.deprecated,
        }
    }

    fn match_table(&mut self, list: ProfileList) -> &mut BTreeMap<String, SpecifierToVersion> {
        match list {
            ProfileList::Mask => &mut self.mask_matches,
            ProfileList::Deprecated => &mut self.deprecated_matches,
        }
    }
}

impl Store for MemoryStore {
    fn upsert_category(&mut self, category: &Category) -> Result<()> {
        self.categories
            .insert(category.name.clone(), category.clone());
        Ok(())
    }

    fn delete_category(&mut self, name: &str) -> Result<()> {
        self.categories.remove(name);
        Ok(())
    }

    fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.values().cloned().collect())
    }

    fn upsert_package(&mut self, package: &Package) -> Result<()> {
        let preceding_commits = self
            .packages
            .get(&package.atom)
            .map_or(package.preceding_commits, |p| p.preceding_commits);
        self.packages.insert(
            package.atom.clone(),
            Package {
                preceding_commits,
                ..package.clone()
            },
        );
        Ok(())
    }

    fn delete_package(&mut self, atom: &str) -> Result<()> {
        self.packages.remove(atom);
        Ok(())
    }

    fn package(&self, atom: &str) -> Result<Option<Package>> {
        Ok(self.packages.get(atom).cloned())
    }

    fn packages(&self) -> Result<Vec<Package>> {
        Ok(self.packages.values().cloned().collect())
    }

    fn set_preceding_commits(&mut self, atom: &str, preceding_commits: u64) -> Result<bool> {
        Ok(match self.packages.get_mut(atom) {
            Some(package) => {
                package.preceding_commits = preceding_commits;
                true
            }
            None => false,
        })
    }

    fn upsert_version(&mut self, version: &Version) -> Result<()> {
        self.versions.insert(version.id.clone(), version.clone());
        Ok(())
    }

    fn delete_version(&mut self, id: &str) -> Result<()> {
        self.versions.remove(id);
        Ok(())
    }

    fn version(&self, id: &str) -> Result<Option<Version>> {
        Ok(self.versions.get(id).cloned())
    }

    fn versions_of(&self, atom: &str) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .values()
            .filter(|v| v.atom == atom)
            .cloned()
            .collect())
    }

    fn versions(&self) -> Result<Vec<Version>> {
        Ok(self.versions.values().cloned().collect())
    }

    fn upsert_commit(&mut self, commit: &Commit) -> Result<()> {
        self.commits.insert(commit.id.clone(), commit.clone());
        Ok(())
    }

    fn commit(&self, id: &str) -> Result<Option<Commit>> {
        Ok(self.commits.get(id).cloned())
    }

    fn latest_commit(&self) -> Result<Option<Commit>> {
        Ok(self
            .commits
            .values()
            .max_by_key(|c| c.preceding_commits)
            .cloned())
    }

    fn commit_count(&self) -> Result<usize> {
        Ok(self.commits.len())
    }

    fn upsert_keyword_change(&mut self, change: &KeywordChange) -> Result<()> {
        self.keyword_changes
            .insert(change.id.clone(), change.clone());
        Ok(())
    }

    fn keyword_changes(&self, commit_id: &str) -> Result<Vec<KeywordChange>> {
        Ok(self
            .keyword_changes
            .values()
            .filter(|k| k.commit_id == commit_id)
            .cloned()
            .collect())
    }

    fn link_package(&mut self, link: &CommitToPackage) -> Result<()> {
        self.package_links
            .entry(link.id.clone())
            .or_insert_with(|| link.clone());
        Ok(())
    }

    fn link_version(&mut self, link: &CommitToVersion) -> Result<()> {
        self.version_links
            .entry(link.id.clone())
            .or_insert_with(|| link.clone());
        Ok(())
    }

    fn package_commits(&self, atom: &str) -> Result<Vec<String>> {
        Ok(self
            .package_links
            .values()
            .filter(|l| l.package_atom == atom)
            .map(|l| l.commit_id.clone())
            .collect())
    }

    fn version_commits(&self, version_id: &str) -> Result<Vec<String>> {
        Ok(self
            .version_links
            .values()
            .filter(|l| l.version_id == version_id)
            .map(|l| l.commit_id.clone())
            .collect())
    }

    fn replace_entries(&mut self, list: ProfileList, entries: &[ProfileEntry]) -> Result<()> {
        let table = self.entry_table(list);
        table.clear();
        for entry in entries {
            table.insert(entry.versions.clone(), entry.clone());
        }
        Ok(())
    }

    fn entries(&self, list: ProfileList) -> Result<Vec<ProfileEntry>> {
        let table = match list {
            ProfileList::Mask => &self.masks,
            ProfileList::Deprecated => &self.deprecated,
        };
        Ok(table.values().cloned().collect())
    }

    fn replace_matches(&mut self, list: ProfileList, rows: &[SpecifierToVersion]) -> Result<()> {
        let table = self.match_table(list);
        table.clear();
        for row in rows {
            table.insert(row.id.clone(), row.clone());
        }
        Ok(())
    }

    fn matches(&self, list: ProfileList) -> Result<Vec<SpecifierToVersion>> {
        let table = match list {
            ProfileList::Mask => &self.mask_matches,
            ProfileList::Deprecated => &self.deprecated_matches,
        };
        Ok(table.values().cloned().collect())
    }

    fn upsert_useflag(&mut self, flag: &Useflag) -> Result<()> {
        self.useflags.insert(flag.id.clone(), flag.clone());
        Ok(())
    }

    fn useflags(&self) -> Result<Vec<Useflag>> {
        Ok(self.useflags.values().cloned().collect())
    }

    fn replace_arches(&mut self, arches: &[Arch]) -> Result<()> {
        self.arches = arches.to_vec();
        Ok(())
    }

    fn arches(&self) -> Result<Vec<Arch>> {
        Ok(self.arches.clone())
    }

    fn upsert_pkg_move(&mut self, pkg_move: &PkgMove) -> Result<()> {
        self.pkg_moves
            .insert(pkg_move.source.clone(), pkg_move.clone());
        Ok(())
    }

    fn pkg_moves(&self) -> Result<Vec<PkgMove>> {
        Ok(self.pkg_moves.values().cloned().collect())
    }

    fn put_application(&mut self, application: &Application) -> Result<()> {
        self.application = Some(application.clone());
        Ok(())
    }

    fn application(&self) -> Result<Option<Application>> {
        Ok(self.application.clone())
    }
}
