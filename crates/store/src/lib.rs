#![forbid(unsafe_code)]

//! Flat-file persistence for lanshare: the IP blocklist, the connected-IP
//! log and the served-folder setting.
//!
//! Every public operation swallows I/O failures, logs them, and returns a
//! safe default (an empty set, `false` or `None`). Persistence problems never
//! take the control surface or the file server down.

mod bootstrap;
mod error;
mod folder;
mod ip_list;

pub use bootstrap::{ensure_directory, ensure_file};
pub use error::Error;
pub use folder::{load_served_folder, save_served_folder};
pub use ip_list::{
    add_blocked_ip, clear_connected_ips, load_blocked_ips, load_connected_ips,
    record_connected_ip, remove_blocked_ip,
};

use config::Layout;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Persistence seam used by the supervisor and the control surface.
///
/// Implementations must read fresh on every call: the file server process
/// writes the connected-IP log concurrently.
pub trait SettingsStore: Send + Sync {
    fn blocked_ips(&self) -> HashSet<String>;
    /// Returns `false` when `ip` was already blocked.
    fn block_ip(&self, ip: &str) -> bool;
    /// Returns `false` when `ip` was not blocked.
    fn unblock_ip(&self, ip: &str) -> bool;

    fn connected_ips(&self) -> HashSet<String>;
    fn record_connected_ip(&self, ip: &str) -> bool;
    fn clear_connected_ips(&self);

    fn served_folder(&self) -> Option<PathBuf>;
    fn save_served_folder(&self, folder: &Path);
}

/// [`SettingsStore`] backed by the text files of a [`Layout`].
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    layout: Layout,
}

impl FlatFileStore {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Make sure the log directory, the three settings files and the default
    /// served folder exist. Never fails; problems are logged.
    pub fn initialize(&self) {
        debug!(layout = ?self.layout, "initializing settings files");
        ensure_directory(&self.layout.log_dir);
        ensure_file(&self.layout.connected_ips);
        ensure_file(&self.layout.blocked_ips);
        ensure_file(&self.layout.served_folder_setting);
        ensure_directory(&self.layout.default_folder);
    }

    /// The persisted folder, or the default folder when none is stored.
    pub fn served_folder_or_default(&self) -> PathBuf {
        self.served_folder()
            .unwrap_or_else(|| self.layout.default_folder.clone())
    }
}

impl SettingsStore for FlatFileStore {
    fn blocked_ips(&self) -> HashSet<String> {
        load_blocked_ips(&self.layout.blocked_ips)
    }

    fn block_ip(&self, ip: &str) -> bool {
        add_blocked_ip(&self.layout.blocked_ips, ip)
    }

    fn unblock_ip(&self, ip: &str) -> bool {
        remove_blocked_ip(&self.layout.blocked_ips, ip)
    }

    fn connected_ips(&self) -> HashSet<String> {
        load_connected_ips(&self.layout.connected_ips)
    }

    fn record_connected_ip(&self, ip: &str) -> bool {
        record_connected_ip(&self.layout.connected_ips, ip)
    }

    fn clear_connected_ips(&self) {
        clear_connected_ips(&self.layout.connected_ips)
    }

    fn served_folder(&self) -> Option<PathBuf> {
        load_served_folder(&self.layout.served_folder_setting)
    }

    fn save_served_folder(&self, folder: &Path) {
        save_served_folder(&self.layout.served_folder_setting, folder)
    }
}
