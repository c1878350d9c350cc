//! Session read loop

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, error, warn};

use ridlink_core::RidError;
use ridlink_transport::BoxedStream;

use crate::manager::SessionManager;
use crate::pipeline::Pipeline;

/// Why a read loop ended
#[derive(Debug)]
pub(crate) enum LoopExit {
    /// Cancellation was raised; the canceller owns teardown
    Cancelled,
    /// Remote closed the stream
    Eof,
    /// Transport or framing failure
    Failed(RidError),
}

/// Read chunks until cancelled, closed or failed, then hand teardown back
/// to the manager.
pub(crate) async fn read_loop(
    manager: SessionManager,
    generation: u64,
    mut stream: BoxedStream,
    mut shutdown: watch::Receiver<bool>,
) {
    // Cancelled between connect and loop start
    if *shutdown.borrow() {
        debug!("Stream closed before read loop started");
        close_stream(stream).await;
        return;
    }

    let config = manager.config();
    let mut pipeline = Pipeline::new(config.max_message_len);
    let mut buf = vec![0u8; config.read_buffer_size];
    debug!("Started reading data ({} byte reads)", buf.len());

    let exit = loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("Read loop cancelled");
                    break LoopExit::Cancelled;
                }
            }

            read = stream.read(&mut buf) => match read {
                Ok(0) => {
                    warn!("End of stream reached");
                    break LoopExit::Eof;
                }
                Ok(n) => {
                    debug!("Read {} bytes from stream", n);
                    let result = pipeline.process_chunk(&buf[..n], |event| manager.notify(event));
                    if let Err(e) = result {
                        error!("Dropping stream: {}", e);
                        break LoopExit::Failed(e);
                    }
                }
                Err(e) => {
                    error!("Error while reading data: {}", e);
                    break LoopExit::Failed(RidError::Io(e));
                }
            },
        }
    };

    close_stream(stream).await;
    debug!(stats = ?pipeline.stats(), "Read loop exited");

    manager.read_loop_exited(generation, exit);
}

/// Close a stream; failures are logged and otherwise ignored
pub(crate) async fn close_stream(mut stream: BoxedStream) {
    match stream.shutdown().await {
        Ok(()) => debug!("Stream closed"),
        Err(e) => warn!("Error closing stream: {}", e),
    }
}
