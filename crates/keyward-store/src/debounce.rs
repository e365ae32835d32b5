//! Coalescing writer for the settings singleton.
//!
//! Interactive editors submit a new `AppSettings` on every change; only the
//! latest value is written once submissions go quiet. The store itself never
//! sees the intermediate states.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use keyward_core::AppSettings;

use crate::{KeyStore, StoreError, StoreResult};

enum Command {
    Submit(AppSettings),
    Flush(oneshot::Sender<StoreResult<()>>),
}

pub struct SettingsDebouncer {
    tx: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl SettingsDebouncer {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyStore>, quiet: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(store, quiet, rx));
        Self { tx, task }
    }

    /// Queue `settings` as the value to write; replaces anything pending.
    pub fn submit(&self, settings: AppSettings) {
        if self.tx.send(Command::Submit(settings)).is_err() {
            tracing::warn!("settings writer stopped; dropping update");
        }
    }

    /// Write any pending value now and wait for the result.
    pub async fn flush(&self) -> StoreResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(reply))
            .map_err(|_| StoreError::Backend("settings writer stopped".into()))?;
        rx.await
            .map_err(|_| StoreError::Backend("settings writer stopped".into()))?
    }

    /// Flush and stop the writer task.
    pub async fn shutdown(self) -> StoreResult<()> {
        let result = self.flush().await;
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::warn!("settings writer task failed: {e}");
        }
        result
    }
}

async fn run(
    store: Arc<dyn KeyStore>,
    quiet: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    let mut pending: Option<AppSettings> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(Command::Submit(settings)) => {
                    pending = Some(settings);
                    deadline = Some(Instant::now() + quiet);
                }
                Some(Command::Flush(reply)) => {
                    deadline = None;
                    let result = write_pending(&store, &mut pending).await;
                    let _ = reply.send(result);
                }
                None => {
                    if let Err(e) = write_pending(&store, &mut pending).await {
                        tracing::warn!("final settings write failed: {e}");
                    }
                    break;
                }
            },
            _ = timer => {
                deadline = None;
                if let Err(e) = write_pending(&store, &mut pending).await {
                    // Kept pending; the next flush retries
                    tracing::warn!("debounced settings write failed: {e}");
                }
            }
        }
    }
}

/// Write and clear `pending`. On failure the value stays pending.
async fn write_pending(
    store: &Arc<dyn KeyStore>,
    pending: &mut Option<AppSettings>,
) -> StoreResult<()> {
    let Some(settings) = pending.take() else {
        return Ok(());
    };

    let store = Arc::clone(store);
    let (settings, result) = tokio::task::spawn_blocking(move || {
        let result = store.save_settings(&settings);
        (settings, result)
    })
    .await
    .map_err(|e| StoreError::Backend(format!("settings write task: {e}")))?;

    match result {
        Ok(()) => {
            tracing::debug!("settings written");
            Ok(())
        }
        Err(e) => {
            *pending = Some(settings);
            Err(e)
        }
    }
}
