//! Runtime configuration from environment variables (a `.env` file is loaded
//! by the binary before this runs).

use crate::app::{ImportOptions, DEFAULT_PROGRESS_INTERVAL, DEFAULT_VERBOSE_ERROR_LIMIT};
use crate::error::AppError;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_SOURCE_PATH: &str = "BLZ_SOURCE_PATH";
pub const ENV_DB_PATH: &str = "BLZ_DB_PATH";
pub const ENV_VERBOSE_ERROR_LIMIT: &str = "BLZ_VERBOSE_ERROR_LIMIT";
pub const ENV_PROGRESS_INTERVAL: &str = "BLZ_PROGRESS_INTERVAL";
pub const ENV_LOG: &str = "BLZ_LOG";

pub const DEFAULT_SOURCE_PATH: &str = "data/blz-aktuell-csv-data.csv";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source_path: PathBuf,
    pub db_path: PathBuf,
    pub verbose_error_limit: usize,
    pub progress_interval: u64,
    pub log_filter: String,
}

fn app_data_dir() -> PathBuf {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("blz-import")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("banks.db")
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset or blank keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            source_path: get(ENV_SOURCE_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_PATH)),
            db_path: get(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(default_db_path),
            verbose_error_limit: parse_or(
                ENV_VERBOSE_ERROR_LIMIT,
                get(ENV_VERBOSE_ERROR_LIMIT),
                DEFAULT_VERBOSE_ERROR_LIMIT,
            )?,
            progress_interval: parse_or(
                ENV_PROGRESS_INTERVAL,
                get(ENV_PROGRESS_INTERVAL),
                DEFAULT_PROGRESS_INTERVAL,
            )?,
            log_filter: get(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            verbose_error_limit: self.verbose_error_limit,
            progress_interval: self.progress_interval,
        }
    }
}

fn parse_or<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, AppError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a non-negative integer, got '{}'", key, v))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.source_path, PathBuf::from(DEFAULT_SOURCE_PATH));
        assert_eq!(cfg.db_path, default_db_path());
        assert_eq!(cfg.verbose_error_limit, 5);
        assert_eq!(cfg.progress_interval, 100);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn reads_overrides() {
        let cfg = config_from(&[
            (ENV_SOURCE_PATH, "/tmp/blz.csv"),
            (ENV_DB_PATH, "/tmp/banks.db"),
            (ENV_VERBOSE_ERROR_LIMIT, "20"),
            (ENV_PROGRESS_INTERVAL, " 0 "),
            (ENV_LOG, "debug"),
        ])
        .unwrap();
        assert_eq!(cfg.source_path, PathBuf::from("/tmp/blz.csv"));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/banks.db"));
        assert_eq!(cfg.verbose_error_limit, 20);
        assert_eq!(cfg.progress_interval, 0);
        assert_eq!(cfg.log_filter, "debug");
        assert_eq!(cfg.import_options().progress_interval, 0);
    }

    #[test]
    fn blank_value_falls_back_to_default() {
        let cfg = config_from(&[(ENV_VERBOSE_ERROR_LIMIT, "  ")]).unwrap();
        assert_eq!(cfg.verbose_error_limit, DEFAULT_VERBOSE_ERROR_LIMIT);
    }

    #[test]
    fn invalid_number_is_config_error() {
        let err = config_from(&[(ENV_PROGRESS_INTERVAL, "-3")]).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.to_string().contains(ENV_PROGRESS_INTERVAL));
    }
}
