use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Read access to a checked-out ebuild repository.
///
/// Paths are tree-relative and `/`-separated, as reported by the VCS.
#[derive(Debug, Clone)]
pub struct Tree {
    root: PathBuf,
}

impl Tree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Tree { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a file as UTF-8 text.
    pub fn read(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.root.join(path)).map_err(|e| Error::Io {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    pub fn exists(&self, path: &str) -> bool {
        self.root.join(path).is_file()
    }

    /// Tree-relative path of the md5-cache entry of a version id
    /// (`category/name-version`).
    pub fn cache_path(version_id: &str) -> String {
        format!("metadata/md5-cache/{version_id}")
    }
}
