//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 7790;
pub const DEFAULT_INTERVAL_SECS: u64 = 15 * 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10 * 60;
pub const DEFAULT_UTC_OFFSET: &str = "+01:00";

/// Paths to all Cashwatch data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Reconciled record store (`data/cashtag_results.json`).
    pub store_file: PathBuf,
    /// Extraction agent settings (`data/agent-config.json`).
    pub agent_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates the directory if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            store_file: root.join("cashtag_results.json"),
            agent_config_file: root.join("agent-config.json"),
            root,
        })
    }
}

/// Top-level Cashwatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashwatchConfig {
    /// HTTP status API port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Seconds between scheduled reconciliation cycles.
    pub interval_secs: u64,
    /// Upper bound on a single agent call.
    pub fetch_timeout_secs: u64,
    /// Run one cycle immediately at startup.
    pub run_on_start: bool,
    /// Fixed UTC offset used for record timestamps, e.g. `+01:00`.
    pub utc_offset: String,
    /// Abandon the cycle instead of treating an unreadable store as empty.
    pub strict_reads: bool,
    /// Overrides the agent base URL from the agent settings file.
    pub agent_url: Option<String>,
}

impl CashwatchConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    pub fn from_lookup(
        data_dir: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let port = parse_var(&lookup, "PORT", DEFAULT_PORT)?;
        let interval_secs = parse_var(&lookup, "CASHWATCH_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)?;
        let fetch_timeout_secs = parse_var(
            &lookup,
            "CASHWATCH_FETCH_TIMEOUT_SECS",
            DEFAULT_FETCH_TIMEOUT_SECS,
        )?;
        let run_on_start = parse_var(&lookup, "CASHWATCH_RUN_ON_START", true)?;
        let strict_reads = parse_var(&lookup, "CASHWATCH_STRICT_READS", false)?;

        if interval_secs == 0 {
            return Err(Error::Config(
                "CASHWATCH_INTERVAL_SECS must be greater than zero".into(),
            ));
        }

        let utc_offset = lookup("CASHWATCH_UTC_OFFSET")
            .unwrap_or_else(|| DEFAULT_UTC_OFFSET.to_string());
        let agent_url = lookup("CASHWATCH_AGENT_URL").filter(|u| !u.trim().is_empty());

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            port,
            data_paths,
            interval_secs,
            fetch_timeout_secs,
            run_on_start,
            utc_offset,
            strict_reads,
            agent_url,
        })
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {}: {:?}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CashwatchConfig::from_lookup(dir.path(), lookup_from(&[])).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.interval_secs, 900);
        assert_eq!(config.fetch_timeout_secs, 600);
        assert!(config.run_on_start);
        assert!(!config.strict_reads);
        assert_eq!(config.utc_offset, "+01:00");
        assert_eq!(config.agent_url, None);
        assert_eq!(
            config.data_paths.store_file,
            dir.path().join("cashtag_results.json")
        );
    }

    #[test]
    fn test_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let config = CashwatchConfig::from_lookup(
            dir.path(),
            lookup_from(&[
                ("PORT", "8080"),
                ("CASHWATCH_INTERVAL_SECS", "60"),
                ("CASHWATCH_RUN_ON_START", "false"),
                ("CASHWATCH_STRICT_READS", "true"),
                ("CASHWATCH_UTC_OFFSET", "+02:00"),
                ("CASHWATCH_AGENT_URL", "http://agent:7788"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert!(!config.run_on_start);
        assert!(config.strict_reads);
        assert_eq!(config.utc_offset, "+02:00");
        assert_eq!(config.agent_url.as_deref(), Some("http://agent:7788"));
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CashwatchConfig::from_lookup(
            dir.path(),
            lookup_from(&[("CASHWATCH_FETCH_TIMEOUT_SECS", "ten")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = CashwatchConfig::from_lookup(
            dir.path(),
            lookup_from(&[("CASHWATCH_INTERVAL_SECS", "0")]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn test_data_dir_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested").join("data");
        let paths = DataPaths::new(&nested).unwrap();
        assert!(paths.root.is_dir());
    }
}
