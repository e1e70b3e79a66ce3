#![forbid(unsafe_code)]

use crate::log::{LogMessage, Stream};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Spawn a task that forwards every non-empty line of `pipe` to `queue`.
///
/// The task ends at end-of-stream, on a read error, or when `cancel` is
/// observed between two reads. A read already in flight only returns once
/// the pipe yields data or closes.
pub(crate) fn spawn_reader<R>(
    pipe: R,
    stream: Stream,
    queue: UnboundedSender<LogMessage>,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::with_capacity(256);
        loop {
            if cancel.is_cancelled() {
                trace!(%stream, "reader cancelled");
                break;
            }

            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    trace!(%stream, "end of stream");
                    break;
                }
                Ok(_) => {
                    // invalid bytes become U+FFFD rather than ending the reader
                    let line = String::from_utf8_lossy(&buf);
                    let text = line.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if queue.send(LogMessage::new(stream, text)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = queue.send(LogMessage::new(
                        stream,
                        format!("error reading pipe: {err}"),
                    ));
                    break;
                }
            }
        }
    })
}
