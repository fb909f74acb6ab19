// Whole-file writes that never leave a half-written target behind
use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Write `data` next to `path` first, fsync it, then rename over the target
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = temp_path_for(path)?;

    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        });

    if let Err(e) = written.and_then(|_| fs::rename(&temp_path, path)) {
        // Best effort - the temp file is garbage either way
        let _ = fs::remove_file(&temp_path);
        return Err(Error::IoError(e));
    }

    Ok(())
}

/// Copy `from` onto `to` through a temp file, so `to` is either old or new
pub fn copy_atomic(from: &Path, to: &Path) -> Result<()> {
    let data = fs::read(from)?;
    ensure_parent(to)?;
    write_atomic(to, &data)
}

/// Create the parent directory of `path` if there is one
pub fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> Result<PathBuf> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::ConfigError(format!("Invalid file path: {}", path.display())))?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let temp_name = format!(".{}.{}.tmp", filename, nanos);
    Ok(match path.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}
