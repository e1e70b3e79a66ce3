use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::path::PathBuf;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Supervisor {
    /// Executable of the file server. When unset, `lanshare-server` next to
    /// the running executable is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,

    /// Extra arguments passed to the server executable.
    pub args: Vec<String>,

    /// How long to wait after spawning before checking that the server is
    /// still alive. A server that exits within this window counts as a failed
    /// start. **Measured in milliseconds**.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub grace_period: Duration,

    /// How long a stopping server may take to exit after SIGTERM before it is
    /// killed. **Measured in milliseconds**.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub stop_timeout: Duration,

    /// How long to wait for the pipe readers to reach end-of-stream once the
    /// server is gone. Readers still blocked afterwards (a descendant holding
    /// the pipe open) are aborted. **Measured in milliseconds**.
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub reader_join_timeout: Duration,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            grace_period: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(5),
            reader_join_timeout: Duration::from_millis(500),
        }
    }
}
