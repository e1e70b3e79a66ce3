#![forbid(unsafe_code)]

use config::Config;
use std::collections::HashSet;
use std::fs;
use store::{FlatFileStore, SettingsStore};
use tempfile::tempdir;

#[test]
fn initialize_creates_layout_and_defaults_folder() {
    let dir = tempdir().unwrap();
    let layout = Config::default().layout(dir.path());
    let store = FlatFileStore::new(layout.clone());

    store.initialize();

    assert!(layout.log_dir.is_dir());
    assert!(layout.connected_ips.is_file());
    assert!(layout.blocked_ips.is_file());
    assert!(layout.served_folder_setting.is_file());
    assert!(layout.default_folder.is_dir());

    // the setting file exists but is empty, so the default wins
    assert_eq!(store.served_folder(), None);
    assert_eq!(store.served_folder_or_default(), layout.default_folder);
}

#[test]
fn initialize_does_not_clobber_existing_state() {
    let dir = tempdir().unwrap();
    let layout = Config::default().layout(dir.path());
    let store = FlatFileStore::new(layout.clone());
    store.initialize();

    assert!(store.block_ip("10.1.1.1"));
    store.record_connected_ip("10.1.1.2");
    store.initialize();

    assert_eq!(store.blocked_ips(), HashSet::from(["10.1.1.1".to_string()]));
    assert_eq!(
        store.connected_ips(),
        HashSet::from(["10.1.1.2".to_string()])
    );
}

#[test]
fn served_folder_goes_through_setting_file() {
    let dir = tempdir().unwrap();
    let layout = Config::default().layout(dir.path());
    let store = FlatFileStore::new(layout.clone());
    store.initialize();

    let music = dir.path().join("music");
    fs::create_dir(&music).unwrap();
    store.save_served_folder(&music);

    let expected = fs::canonicalize(&music).unwrap();
    assert_eq!(store.served_folder(), Some(expected.clone()));
    assert_eq!(store.served_folder_or_default(), expected);
    assert_eq!(
        fs::read_to_string(&layout.served_folder_setting).unwrap(),
        expected.to_string_lossy()
    );
}

#[test]
fn block_and_unblock_are_idempotent() {
    let dir = tempdir().unwrap();
    let store = FlatFileStore::new(Config::default().layout(dir.path()));
    store.initialize();

    assert!(store.block_ip("192.168.0.7"));
    assert!(!store.block_ip("192.168.0.7"));
    assert!(store.unblock_ip("192.168.0.7"));
    assert!(!store.unblock_ip("192.168.0.7"));
    assert!(store.blocked_ips().is_empty());
}
