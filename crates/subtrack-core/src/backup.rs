// Periodic safety copies of the store file
use crate::settings::Settings;
use crate::store::SubscriptionStore;
use crate::Result;
use chrono::{Duration, NaiveDateTime};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_EXTENSION: &str = "json";

/// Should an automatic backup run right now?
///
/// Yes if auto-backup is on and we've either never backed up or the
/// configured interval has fully elapsed since the last one.
pub fn is_due(settings: &Settings, now: NaiveDateTime) -> bool {
    if !settings.auto_backup() {
        return false;
    }

    match settings.last_backup_date() {
        None => true,
        Some(last) => now - last > Duration::days(i64::from(settings.backup_interval_days())),
    }
}

/// File name for a backup taken at `at`
pub fn backup_file_name(at: NaiveDateTime) -> String {
    format!(
        "{}{}.{}",
        BACKUP_PREFIX,
        at.format("%Y%m%d_%H%M%S"),
        BACKUP_EXTENSION
    )
}

/// Back the store up into `dir` without touching settings
///
/// Returns the path written, or `None` if the store file doesn't exist.
pub fn create_backup(
    store: &SubscriptionStore,
    dir: &Path,
    at: NaiveDateTime,
) -> Result<Option<PathBuf>> {
    let target = dir.join(backup_file_name(at));
    Ok(store.backup(&target)?.then_some(target))
}

/// A backup written by [`backup_if_due`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBackup {
    pub path: PathBuf,
    pub taken_at: NaiveDateTime,
}

/// Write a timestamped backup into `dir` if one is due
///
/// Settings are only read here. The caller records the result with
/// [`Settings::mark_backed_up`] once it owns the settings again, which lets
/// this run on a blocking thread next to other commands.
pub fn backup_if_due(
    store: &SubscriptionStore,
    settings: &Settings,
    dir: &Path,
) -> Result<Option<AutoBackup>> {
    let now = store.clock().now();
    if !is_due(settings, now) {
        debug!("Auto-backup not due yet");
        return Ok(None);
    }

    let written = create_backup(store, dir, now)?.map(|path| AutoBackup {
        path,
        taken_at: now,
    });
    if let Some(backup) = &written {
        info!("Auto-backup written to {}", backup.path.display());
    }
    Ok(written)
}

/// Backups found in `dir`, newest first
///
/// A missing directory just means there are no backups yet.
pub fn list_backups(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| {
                n.starts_with(BACKUP_PREFIX) && n.ends_with(BACKUP_EXTENSION)
            });
        if is_backup {
            backups.push(path);
        }
    }

    // Timestamped names sort chronologically
    backups.sort();
    backups.reverse();
    Ok(backups)
}
