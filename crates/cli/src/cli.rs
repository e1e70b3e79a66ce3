use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// lanshare: share a folder with devices on the local network
///
/// Runs an HTTP file server as a supervised child process and controls it
/// from an interactive console: start and stop the server, pick the served
/// folder, watch connecting devices and block them.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// If not provided, `lanshare.toml` in the base directory is used when it
    /// exists, otherwise the default configuration.
    #[arg(short, long, value_parser = validate_file)]
    pub config: Option<PathBuf>,

    /// Application base directory holding `logs/`, `assets/` and the default
    /// `files/` folder.
    ///
    /// Defaults to the working directory.
    #[arg(short, long, value_parser = validate_dir)]
    pub base_dir: Option<PathBuf>,

    /// Start the file server as soon as the console is up.
    #[arg(short, long)]
    pub start: bool,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Edit the settings and exit instead of opening the console.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add addresses to the blocklist.
    Block {
        #[arg(required = true)]
        ips: Vec<String>,
    },
    /// Remove addresses from the blocklist.
    Unblock {
        #[arg(required = true)]
        ips: Vec<String>,
    },
    /// Print the blocklist.
    Blocked,
    /// Print the served folder, or persist a new one.
    Folder { dir: Option<PathBuf> },
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Check if the directory exists.
#[inline(always)]
fn validate_dir(dir: &str) -> Result<PathBuf, String> {
    let path = Path::new(dir);
    if path.is_dir() {
        Ok(path.to_owned())
    } else {
        Err(format!("Directory not found: {:?}", path))
    }
}
