use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::AppError;

pub const DATA_DIR_ENV: &str = "LEDGER_DATA_DIR";
const DEFAULT_DB_FILE: &str = "vehicle-ledger.db";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Directory holding the database. Falls back to the host's app data
    /// directory when unset.
    pub data_dir: Option<PathBuf>,
    pub db_file_name: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_file_name: DEFAULT_DB_FILE.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("invalid config {}: {e}", path.display())))?;
        if config.db_file_name.trim().is_empty() {
            return Err(AppError::Config("db_file_name must not be empty".into()));
        }
        Ok(config)
    }

    /// Applies `LEDGER_DATA_DIR` on top of the loaded values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn db_path(&self, fallback_dir: &Path) -> PathBuf {
        self.data_dir
            .as_deref()
            .unwrap_or(fallback_dir)
            .join(&self.db_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LedgerConfig::load(&dir.path().join("ledger.json")).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(
            config.db_path(dir.path()),
            dir.path().join("vehicle-ledger.db")
        );
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, r#"{"data_dir": "/srv/ledger"}"#).unwrap();
        let config = LedgerConfig::load(&path).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/ledger")));
        assert_eq!(config.db_file_name, "vehicle-ledger.db");
        assert_eq!(
            config.db_path(dir.path()),
            PathBuf::from("/srv/ledger/vehicle-ledger.db")
        );
    }

    #[test]
    fn data_dir_env_overrides_file_and_fallback() {
        let fallback = PathBuf::from("/var/lib/app");
        let base = LedgerConfig {
            data_dir: Some(PathBuf::from("/srv/ledger")),
            ..LedgerConfig::default()
        };

        env::set_var(DATA_DIR_ENV, "/mnt/ledger");
        let overridden = base.clone().with_env_overrides();
        env::set_var(DATA_DIR_ENV, "");
        let blank = base.clone().with_env_overrides();
        env::remove_var(DATA_DIR_ENV);
        let unset = LedgerConfig::default().with_env_overrides();

        assert_eq!(
            overridden.db_path(&fallback),
            PathBuf::from("/mnt/ledger/vehicle-ledger.db")
        );
        assert_eq!(
            blank.db_path(&fallback),
            PathBuf::from("/srv/ledger/vehicle-ledger.db")
        );
        assert_eq!(
            unset.db_path(&fallback),
            PathBuf::from("/var/lib/app/vehicle-ledger.db")
        );
    }

    #[test]
    fn rejects_unknown_keys_and_blank_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, r#"{"db": "x.db"}"#).unwrap();
        assert!(matches!(LedgerConfig::load(&path), Err(AppError::Config(_))));
        fs::write(&path, r#"{"db_file_name": "  "}"#).unwrap();
        assert!(matches!(LedgerConfig::load(&path), Err(AppError::Config(_))));
    }
}
