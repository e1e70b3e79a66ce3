use crate::log::Stream;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to spawn server process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to wait on server process: {0}")]
    Wait(#[source] std::io::Error),

    #[cfg(unix)]
    #[error("Failed to signal server process: {0}")]
    Signal(#[from] nix::Error),

    #[error("Server process was spawned without a {0} pipe")]
    MissingPipe(Stream),
}
