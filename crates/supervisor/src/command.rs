#![forbid(unsafe_code)]

use config::Config;
use std::fmt;
use std::path::{Path, PathBuf};

/// Binary name of the file server, looked up next to the running executable.
pub const SERVER_BINARY: &str = "lanshare-server";

/// How to launch the file server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Environment variable that carries the served folder to the child.
    pub folder_env_var: String,
    /// Working directory of the child: the application base directory.
    pub working_dir: PathBuf,
}

impl ServerCommand {
    pub fn from_config(config: &Config, base_dir: &Path) -> Self {
        Self {
            program: config
                .supervisor
                .program
                .clone()
                .unwrap_or_else(default_program),
            args: config.supervisor.args.clone(),
            folder_env_var: config.server.folder_env_var.clone(),
            working_dir: base_dir.to_path_buf(),
        }
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

fn default_program() -> PathBuf {
    let name = format!("{SERVER_BINARY}{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&name)))
        .unwrap_or_else(|| PathBuf::from(name))
}
