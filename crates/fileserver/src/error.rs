#![forbid(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Served folder does not exist or is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to create default folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Required HTML template not found at {0}")]
    MissingTemplate(PathBuf),

    #[error("Failed to read HTML template {path}: {source}")]
    ReadTemplate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to list served folder: {0}")]
    ListFolder(#[source] std::io::Error),
}
