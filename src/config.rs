use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Prefix of the environment variables overriding configuration keys,
/// e.g. `PORTAGE_HISTORY_BATCH_SIZE`.
pub const ENV_PREFIX: &str = "PORTAGE_HISTORY_";

/// Settings of an update run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Checkout of the ebuild repository.
    pub repository: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// Revision to import up to.
    pub until: String,
    /// Commits written per batch.
    pub batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            repository: PathBuf::from("/var/db/repos/gentoo"),
            database: PathBuf::from("portage-history.sqlite"),
            until: "HEAD".to_string(),
            batch_size: 10_000,
        }
    }
}

impl Config {
    /// Defaults, then `file` when given and present, then the environment.
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the layered configuration.
    pub fn load(file: Option<&Path>) -> Result<Config> {
        Config::from_figment(&Config::figment(file))
    }

    pub fn from_figment(figment: &Figment) -> Result<Config> {
        Ok(figment.extract()?)
    }
}
