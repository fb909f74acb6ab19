use crate::files::{ensure_parent, write_atomic};
use crate::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Everything the user can tweak, with sane defaults
///
/// Keys we don't know about ride along in `extra` so a newer (or older)
/// version of the app doesn't lose them on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    /// "WIDTHxHEIGHT"
    pub window_size: String,
    pub theme: String,
    pub language: String,
    pub auto_backup: bool,
    pub backup_interval_days: u32,
    pub check_updates_on_start: bool,
    pub last_backup_date: Option<NaiveDateTime>,
    pub email_settings: MailSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            window_size: "1000x700".to_string(),
            theme: "default".to_string(),
            language: "en".to_string(),
            auto_backup: true,
            backup_interval_days: 7, // weekly feels about right
            check_updates_on_start: true,
            last_backup_date: None,
            email_settings: MailSettings::default(),
            extra: Map::new(),
        }
    }
}

/// Mail sender config. Stored only, nothing in here sends mail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub smtp_server: String,
    pub port: u16,
    pub email: String,
    pub password: String,
    pub to_email: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            port: 587,
            email: String::new(),
            password: String::new(),
            to_email: String::new(),
        }
    }
}

/// Settings bound to their JSON file
///
/// Pass this around explicitly - there is no global instance.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    data: SettingsData,
}

impl Settings {
    /// Load settings, falling back to defaults for anything missing or broken
    ///
    /// Never fails: a missing file, unreadable file or garbage content all
    /// just mean "defaults". Values with the wrong type are dropped one key
    /// at a time, the rest of the file still applies.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(overrides) => overlay(SettingsData::default(), overrides),
                Err(e) => {
                    warn!("Settings file {} is malformed, using defaults: {}", path.display(), e);
                    SettingsData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
                SettingsData::default()
            }
            Err(e) => {
                warn!("Could not read settings {}: {}", path.display(), e);
                SettingsData::default()
            }
        };

        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &SettingsData {
        &self.data
    }

    /// Persist the full settings map
    pub fn save(&self) -> Result<()> {
        ensure_parent(&self.path)?;
        let contents = serde_json::to_vec_pretty(&self.data)?;
        write_atomic(&self.path, &contents)?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }

    /// Merged value for `key`. A stored `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(&self.data).ok()? {
            Value::Object(mut map) => map.remove(key).filter(|v| !v.is_null()),
            _ => None,
        }
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    /// Change one key and write the whole file straight away
    ///
    /// Known keys must keep their type (`auto_backup` stays a bool, etc).
    /// Unknown keys accept anything.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut map = to_map(&self.data)?;
        map.insert(key.to_string(), value);

        self.data = serde_json::from_value(Value::Object(map)).map_err(|e| {
            Error::ValidationError(format!("Invalid value for setting '{}': {}", key, e))
        })?;
        self.save()
    }

    pub fn auto_backup(&self) -> bool {
        self.data.auto_backup
    }

    pub fn backup_interval_days(&self) -> u32 {
        self.data.backup_interval_days
    }

    pub fn last_backup_date(&self) -> Option<NaiveDateTime> {
        self.data.last_backup_date
    }

    /// Remember when the last backup happened
    pub fn mark_backed_up(&mut self, at: NaiveDateTime) -> Result<()> {
        self.data.last_backup_date = Some(at);
        self.save()
    }
}

fn to_map(data: &SettingsData) -> Result<Map<String, Value>> {
    match serde_json::to_value(data)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::ConfigError("Settings did not serialize to an object".into())),
    }
}

/// Apply file values on top of `base`, one key at a time
fn overlay(base: SettingsData, overrides: Map<String, Value>) -> SettingsData {
    let mut current = base;

    for (key, value) in overrides {
        let Ok(mut candidate) = to_map(&current) else {
            break;
        };
        candidate.insert(key.clone(), value);

        match serde_json::from_value::<SettingsData>(Value::Object(candidate)) {
            Ok(merged) => current = merged,
            Err(e) => warn!("Ignoring setting '{}': {}", key, e),
        }
    }

    current
}
