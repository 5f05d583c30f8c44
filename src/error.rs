/// Error type for portage-history parsing, ingestion and queries.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Invalid version string.
    #[error("invalid version: {0}")]
    InvalidVersion(String),

    /// Invalid version-range specifier.
    #[error("invalid version specifier: {0}")]
    InvalidSpecifier(String),

    /// Invalid `category/name` atom.
    #[error("invalid atom: {0}")]
    InvalidAtom(String),

    /// Invalid keyword string.
    #[error("invalid keyword: {0}")]
    InvalidKeyword(String),

    /// A commit block from the VCS log could not be parsed.
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// A `Name <email>` identity line could not be parsed.
    #[error("invalid author line: {0}")]
    InvalidAuthor(String),

    /// Error parsing a metadata cache entry.
    #[error("invalid cache entry: {0}")]
    InvalidCacheEntry(String),

    /// A `metadata.xml` document could not be read.
    #[error("invalid metadata.xml: {0}")]
    InvalidMetadata(String),

    /// Missing mandatory field in a cache entry.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A VCS command could not be run or exited unsuccessfully.
    #[error("`git {command}` failed: {message}")]
    Vcs {
        /// The git subcommand and arguments.
        command: String,
        /// Captured stderr or the spawn error.
        message: String,
    },

    /// A file in the repository tree could not be read.
    #[error("cannot read {path}: {message}")]
    Io {
        /// Tree-relative path.
        path: String,
        /// Underlying I/O error.
        message: String,
    },

    /// The record store rejected an operation.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for portage-history operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Store(err.to_string())
    }
}

#[cfg(feature = "sqlite")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Store(err.to_string())
    }
}
