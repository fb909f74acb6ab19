use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration (where files live, how long I/O may take)
///
/// This is the TOML file that wires the app together. User-facing
/// preferences live in [`crate::Settings`] instead.
/// Priority: CLI flags > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from the default location, or defaults if there's no file
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    /// Save config to disk
    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        crate::files::ensure_parent(path)?;

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        crate::files::write_atomic(path, contents.as_bytes())
    }

    /// Default config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("subtrack");

        Ok(config_dir.join("config.toml"))
    }

    /// Directory holding the store and settings files
    pub fn data_dir(&self) -> crate::Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?
                .join("subtrack")),
        }
    }

    pub fn store_path(&self) -> crate::Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.storage.store_file))
    }

    pub fn settings_path(&self) -> crate::Result<PathBuf> {
        Ok(self.data_dir()?.join(&self.storage.settings_file))
    }

    pub fn backup_dir(&self) -> crate::Result<PathBuf> {
        match &self.storage.backup_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_dir()?.join("backups")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Where data files live (default: platform data dir + "subtrack")
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_store_file")]
    pub store_file: String,

    #[serde(default = "default_settings_file")]
    pub settings_file: String,

    /// Where automatic backups go (default: data_dir/backups)
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
}

fn default_store_file() -> String {
    "subscriptions.json".to_string()
}

fn default_settings_file() -> String {
    "app_settings.json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            store_file: default_store_file(),
            settings_file: default_settings_file(),
            backup_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IoConfig {
    /// Deadline for any single store operation, in seconds
    #[serde(default = "default_io_timeout")]
    pub timeout_secs: u64,
}

fn default_io_timeout() -> u64 {
    5 // a local JSON file taking longer than this means something is wrong
}

impl IoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_io_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertConfig {
    /// Window used by the "expiring" listing
    #[serde(default = "default_expiring_days")]
    pub expiring_days: i64,
}

fn default_expiring_days() -> i64 {
    7
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            expiring_days: default_expiring_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// tracing EnvFilter directive, overridden by RUST_LOG
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "subtrack=info,subtrack_core=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.io.timeout_secs, 5);
        assert_eq!(config.alerts.expiring_days, 7);
        assert_eq!(config.storage.store_file, "subscriptions.json");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("timeout_secs"));
        assert!(toml.contains("store_file"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[io]\ntimeout_secs = 1\n").unwrap();
        assert_eq!(config.io.timeout(), Duration::from_secs(1));
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let mut config = Config::default();
        config.storage.data_dir = Some(PathBuf::from("/tmp/subtrack-test"));

        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/tmp/subtrack-test/subscriptions.json")
        );
        assert_eq!(
            config.backup_dir().unwrap(),
            PathBuf::from("/tmp/subtrack-test/backups")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.alerts.expiring_days = 14;

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
