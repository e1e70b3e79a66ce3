#![forbid(unsafe_code)]

use crate::Error;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::warn;

/// Create `path` and its parents if missing. Failures are logged only.
pub fn ensure_directory(path: &Path) {
    if let Err(err) = fs::create_dir_all(path).map_err(Error::io(path)) {
        warn!(%err, "could not create directory");
    }
}

/// Create an empty file at `path` if nothing exists there yet. Existing
/// contents are never touched. Failures are logged only.
pub fn ensure_file(path: &Path) {
    if path.exists() {
        return;
    }
    let created = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(Error::io(path));
    if let Err(err) = created {
        warn!(%err, "could not create file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_is_idempotent_and_keeps_contents() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory(&nested);
        ensure_directory(&nested);
        assert!(nested.is_dir());

        let file = nested.join("blocked_ips.txt");
        ensure_file(&file);
        fs::write(&file, "10.0.0.1\n").unwrap();
        ensure_file(&file);
        assert_eq!(fs::read_to_string(&file).unwrap(), "10.0.0.1\n");
    }

    #[test]
    fn failures_are_not_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("plain-file");
        fs::write(&blocker, "").unwrap();

        ensure_directory(&blocker.join("sub"));
        ensure_file(&blocker.join("sub").join("x.txt"));
        assert!(!blocker.join("sub").exists());
    }
}
