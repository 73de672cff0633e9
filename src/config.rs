// ABOUTME: Configuration loading and validation for the moviehub binary.
// ABOUTME: Reads MOVIEHUB_* environment variables and derives the storage paths.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    EmptyPath(&'static str),
}

/// Storage configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieHubConfig {
    pub home: PathBuf,
    pub uploads_dir: PathBuf,
    pub db_path: PathBuf,
}

impl MovieHubConfig {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// Environment variables:
    /// - MOVIEHUB_HOME: data directory (default: ~/.moviehub)
    /// - MOVIEHUB_UPLOADS_DIR: snapshot artifact root (default: <home>/uploads)
    /// - MOVIEHUB_DB: SQLite database file (default: <home>/moviehub.db)
    ///
    /// `home_override` (the `--home` flag) wins over MOVIEHUB_HOME.
    pub fn from_env(home_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let home = match home_override {
            Some(home) => home,
            None => match path_var("MOVIEHUB_HOME")? {
                Some(home) => home,
                None => std::env::var("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("/tmp"))
                    .join(".moviehub"),
            },
        };

        let uploads_dir = path_var("MOVIEHUB_UPLOADS_DIR")?.unwrap_or_else(|| home.join("uploads"));
        let db_path = path_var("MOVIEHUB_DB")?.unwrap_or_else(|| home.join("moviehub.db"));

        Ok(Self {
            home,
            uploads_dir,
            db_path,
        })
    }
}

/// Unset is `None`; set but empty is an error.
fn path_var(name: &'static str) -> Result<Option<PathBuf>, ConfigError> {
    match std::env::var_os(name) {
        None => Ok(None),
        Some(value) if value.is_empty() => Err(ConfigError::EmptyPath(name)),
        Some(value) => Ok(Some(PathBuf::from(value))),
    }
}
