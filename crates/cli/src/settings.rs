#![forbid(unsafe_code)]

//! One-shot subcommands that edit the settings files without starting the
//! console or the server.

use crate::cli::Command;
use crate::console::{block, print_blocklist, say, unblock};
use crate::error::Error;
use store::{FlatFileStore, SettingsStore};

pub fn run(command: &Command, store: &FlatFileStore) -> Result<(), Error> {
    match command {
        Command::Block { ips } => block(store, ips),
        Command::Unblock { ips } => unblock(store, ips),
        Command::Blocked => print_blocklist(store),
        Command::Folder { dir: None } => say(format_args!(
            "Served folder: {}",
            store.served_folder_or_default().display()
        )),
        Command::Folder { dir: Some(dir) } => {
            let folder = std::fs::canonicalize(dir)
                .ok()
                .filter(|folder| folder.is_dir())
                .ok_or_else(|| Error::NotADirectory(dir.clone()))?;
            store.save_served_folder(&folder);
            say(format_args!("Served folder set to: {}", folder.display()));
        }
    }
    Ok(())
}
