//! Runtime configuration: where catalogs, results and sessions live.

use std::env;
use std::path::PathBuf;

use crate::store::{DEFAULT_RESULTS_DIR, DEFAULT_SESSIONS_DIR};

pub const CATALOG_DIR_VAR: &str = "CAREER_COMPASS_CATALOG_DIR";
pub const RESULTS_DIR_VAR: &str = "CAREER_COMPASS_RESULTS_DIR";
pub const SESSION_DIR_VAR: &str = "CAREER_COMPASS_SESSION_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Extra catalog files loaded on top of the built-in ones.
    pub catalog_dir: Option<PathBuf>,
    pub results_dir: PathBuf,
    pub session_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_dir: None,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            session_dir: PathBuf::from(DEFAULT_SESSIONS_DIR),
        }
    }
}

impl Config {
    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `CAREER_COMPASS_CATALOG_DIR` - directory of additional catalog JSON files
    /// - `CAREER_COMPASS_RESULTS_DIR` - where saved results go
    /// - `CAREER_COMPASS_SESSION_DIR` - where interrupted sessions go
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            catalog_dir: non_empty(CATALOG_DIR_VAR).map(PathBuf::from),
            results_dir: non_empty(RESULTS_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
            session_dir: non_empty(SESSION_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.session_dir),
        }
    }

    /// Merge with CLI overrides. CLI values take precedence.
    pub fn with_overrides(
        mut self,
        catalog_dir: Option<PathBuf>,
        results_dir: Option<PathBuf>,
        session_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(dir) = catalog_dir {
            self.catalog_dir = Some(dir);
        }
        if let Some(dir) = results_dir {
            self.results_dir = dir;
        }
        if let Some(dir) = session_dir {
            self.session_dir = dir;
        }
        self
    }
}
