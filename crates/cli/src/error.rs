#![forbid(unsafe_code)]

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(#[source] std::io::Error),

    #[error("Signal channel closed")]
    ChannelClosed,

    #[error("Failed to spawn console input thread: {0}")]
    InputThread(#[source] std::io::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read network counters: {0}")]
    NetCounters(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Network counters are not available on this platform")]
    NetCountersUnsupported,
}
