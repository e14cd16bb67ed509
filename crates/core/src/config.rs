//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::DEFAULT_DATABASE_PATH;
use crate::{ClinicaError, ClinicaResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(database_path: PathBuf) -> ClinicaResult<Self> {
        if database_path.as_os_str().is_empty() {
            return Err(ClinicaError::InvalidInput(
                "database path cannot be empty".into(),
            ));
        }
        if database_path.is_dir() {
            return Err(ClinicaError::InvalidInput(format!(
                "database path {} is a directory",
                database_path.display()
            )));
        }

        Ok(Self { database_path })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}

/// Resolve the database path from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATABASE_PATH`].
pub fn database_path_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn env_value_falls_back_to_default() {
        assert_eq!(
            database_path_from_env_value(None),
            PathBuf::from(DEFAULT_DATABASE_PATH)
        );
        assert_eq!(
            database_path_from_env_value(Some("   ".into())),
            PathBuf::from(DEFAULT_DATABASE_PATH)
        );
        assert_eq!(
            database_path_from_env_value(Some(" /var/lib/clinica.db ".into())),
            PathBuf::from("/var/lib/clinica.db")
        );
    }

    #[test]
    fn config_rejects_directory_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = CoreConfig::new(temp_dir.path().to_path_buf())
            .expect_err("a directory is not a database file");
        assert!(matches!(err, ClinicaError::InvalidInput(_)));
    }
}
