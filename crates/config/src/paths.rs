use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// On-disk layout of the flat files shared between the control surface and
/// the file server. Relative entries are resolved against the application
/// base directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Paths {
    /// Directory holding the blocklist, the connected-IP log and the
    /// served-folder setting.
    pub log_dir: PathBuf,

    /// File name of the connected-IP log, inside `log_dir`. Truncated each
    /// time the server starts.
    pub connected_ips: PathBuf,

    /// File name of the IP blocklist, inside `log_dir`. One address per line;
    /// blank lines and lines starting with `#` are ignored.
    pub blocked_ips: PathBuf,

    /// File name of the persisted served-folder setting, inside `log_dir`.
    pub served_folder: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            connected_ips: PathBuf::from("connected_ips.log"),
            blocked_ips: PathBuf::from("blocked_ips.txt"),
            served_folder: PathBuf::from("served_folder.txt"),
        }
    }
}

/// Absolute file locations derived from [`Paths`] and a base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub base_dir: PathBuf,
    pub log_dir: PathBuf,
    pub connected_ips: PathBuf,
    pub blocked_ips: PathBuf,
    pub served_folder_setting: PathBuf,
    /// Folder served when nothing else has been chosen.
    pub default_folder: PathBuf,
}

impl Paths {
    pub fn resolve(&self, base_dir: &Path, default_folder: &Path) -> Layout {
        let log_dir = base_dir.join(&self.log_dir);
        Layout {
            base_dir: base_dir.to_path_buf(),
            connected_ips: log_dir.join(&self.connected_ips),
            blocked_ips: log_dir.join(&self.blocked_ips),
            served_folder_setting: log_dir.join(&self.served_folder),
            default_folder: base_dir.join(default_folder),
            log_dir,
        }
    }
}
