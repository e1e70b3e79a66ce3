use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Server {
    /// Address the file server binds to. The default listens on every
    /// interface so other devices on the network can connect.
    pub host: String,

    /// TCP port of the file server.
    pub port: u16,

    /// Name of the environment variable carrying the served folder from the
    /// supervisor to the server process.
    pub folder_env_var: String,

    /// Folder served when the environment variable is absent. Relative to the
    /// base directory; created on demand.
    pub default_folder: PathBuf,

    /// HTML template of the directory listing. The server refuses to start
    /// without it.
    ///
    /// The literal `{{files}}` is replaced by the rendered file entries.
    pub template: PathBuf,

    /// Style sheet served at `/style.css`.
    pub stylesheet: PathBuf,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            folder_env_var: "LANSHARE_SERVE_FOLDER".into(),
            default_folder: PathBuf::from("files"),
            template: PathBuf::from("assets/index.html"),
            stylesheet: PathBuf::from("assets/style.css"),
        }
    }
}
