#![forbid(unsafe_code)]

use crate::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Persist the absolute form of `folder` to `path`, creating the parent
/// directory if needed.
pub fn save_served_folder(path: &Path, folder: &Path) {
    if let Err(err) = try_save(path, folder) {
        warn!(%err, "failed to save served folder setting");
    }
}

/// Read the persisted folder.
///
/// Returns `None` when the file is missing or empty, or when the stored path
/// no longer points at a directory.
pub fn load_served_folder(path: &Path) -> Option<PathBuf> {
    match try_load(path) {
        Ok(folder) => folder,
        Err(err) => {
            warn!(%err, "ignoring served folder setting");
            None
        }
    }
}

fn try_save(path: &Path, folder: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::io(parent))?;
    }
    let absolute = fs::canonicalize(folder)
        .or_else(|_| std::path::absolute(folder))
        .map_err(Error::io(folder))?;
    fs::write(path, absolute.to_string_lossy().as_bytes()).map_err(Error::io(path))
}

fn try_load(path: &Path) -> Result<Option<PathBuf>, Error> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(Error::io(path))?;
    let stored = text.trim();
    if stored.is_empty() {
        return Ok(None);
    }
    let folder = PathBuf::from(stored);
    if !folder.is_dir() {
        return Err(Error::NotADirectory(folder));
    }
    Ok(Some(folder))
}
