#![forbid(unsafe_code)]

mod control;
mod error;
mod paths;
mod server;
mod supervisor;

pub use control::Control;
pub use error::Error;
pub use paths::{Layout, Paths};
pub use server::Server;
pub use supervisor::Supervisor;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the base directory.
pub const CONFIG_FILE_NAME: &str = "lanshare.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub paths: Paths,
    pub server: Server,
    pub supervisor: Supervisor,
    pub control: Control,
}

impl Config {
    /// Load configuration from a TOML file. Missing fields are filled with defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Config = toml_edit::de::from_str(&text)?;
        config.apply_defaults();
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if path.is_file() {
            Self::load(path)
        } else {
            let mut config = Self::default();
            config.apply_defaults();
            Ok(config)
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let toml = toml_edit::ser::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Resolve the file layout against the application base directory.
    pub fn layout(&self, base_dir: &Path) -> Layout {
        self.paths.resolve(base_dir, &self.server.default_folder)
    }

    fn apply_defaults(&mut self) {
        self.control = self.control.clamp();
    }
}
