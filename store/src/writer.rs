use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::Storage;

enum Command {
    Write(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background task that performs write-through persistence.
///
/// Snapshots are written one at a time in the order they were submitted.
#[derive(Debug)]
pub(crate) struct Writer {
    tx: mpsc::UnboundedSender<Command>,
}

impl Writer {
    /// Spawns the worker onto the current Tokio runtime.
    pub fn spawn(storage: Arc<dyn Storage>, key: String) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(storage, key, rx));

        Self { tx }
    }

    pub fn write(&self, bytes: Vec<u8>) {
        if self.tx.send(Command::Write(bytes)).is_err() {
            error!("persistence worker is gone, write skipped");
        }
    }

    /// Resolves once every write submitted before this call has finished.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();

        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

async fn run(storage: Arc<dyn Storage>, key: String, mut rx: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Write(bytes) => {
                let len = bytes.len();

                match storage.set(&key, bytes).await {
                    Ok(()) => debug!(key = %key, bytes = len, "stored todos"),
                    Err(err) => error!(key = %key, "Failed to store todos: {:?}", err),
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!(key = %key, "persistence worker stopped");
}
