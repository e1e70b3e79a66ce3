#![forbid(unsafe_code)]

use crate::error::Error;
use flume::Sender;
use tracing::debug;

/// What an OS signal asks the console to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGINT or SIGTERM: stop the server and exit.
    Shutdown,
    /// SIGUSR1: print the server status.
    DumpStatus,
}

/// Forward OS signals to the console loop until the receiver goes away.
#[cfg(unix)]
pub async fn wait_for_signal(tx: Sender<SignalEvent>) -> Result<(), Error> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).map_err(Error::SignalHandler)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(Error::SignalHandler)?;
    let mut sigusr1 = signal(SignalKind::user_defined1()).map_err(Error::SignalHandler)?;

    loop {
        let event = tokio::select! {
            _ = sigint.recv() => SignalEvent::Shutdown,
            _ = sigterm.recv() => SignalEvent::Shutdown,
            _ = sigusr1.recv() => SignalEvent::DumpStatus,
        };
        debug!(?event, "signal received");
        tx.send_async(event)
            .await
            .map_err(|_| Error::ChannelClosed)?;
    }
}

#[cfg(not(unix))]
pub async fn wait_for_signal(tx: Sender<SignalEvent>) -> Result<(), Error> {
    loop {
        tokio::signal::ctrl_c()
            .await
            .map_err(Error::SignalHandler)?;
        debug!("ctrl-c received");
        tx.send_async(SignalEvent::Shutdown)
            .await
            .map_err(|_| Error::ChannelClosed)?;
    }
}
