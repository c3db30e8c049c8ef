// Debounced persistence - coalesces dashboard changes into serialized snapshot writes
use crate::application::snapshot_store::{clear_snapshot, save_snapshot, KeyValueStore};
use crate::domain::dashboard::DashboardSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Latest thing the store should reflect.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistIntent {
    Idle,
    Save(DashboardSnapshot),
    Clear,
}

/// Background writer that persists the most recent intent once changes settle.
///
/// Every scheduled intent restarts the timer. A single task performs all
/// writes, so two writes never overlap. Dropping the persister cancels any
/// pending write.
pub struct DebouncedPersister {
    tx: watch::Sender<PersistIntent>,
    task: JoinHandle<()>,
}

impl DebouncedPersister {
    /// Spawn the writer task. Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>, delay: Duration) -> Self {
        let (tx, rx) = watch::channel(PersistIntent::Idle);
        let task = tokio::spawn(run(store, rx, delay));
        Self { tx, task }
    }

    pub fn schedule(&self, intent: PersistIntent) {
        self.tx.send_replace(intent);
    }

    /// Cancel the writer and any write it has pending.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for DebouncedPersister {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(store: Arc<dyn KeyValueStore>, mut rx: watch::Receiver<PersistIntent>, delay: Duration) {
    loop {
        if rx.changed().await.is_err() {
            return;
        }

        // Wait until no new intent arrived for `delay`.
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }

        let intent = rx.borrow_and_update().clone();
        write(store.as_ref(), intent);
    }
}

fn write(store: &dyn KeyValueStore, intent: PersistIntent) {
    match intent {
        PersistIntent::Idle => {}
        PersistIntent::Save(snapshot) => match save_snapshot(store, &snapshot) {
            Ok(()) => tracing::debug!("Persisted dashboard: {} widgets", snapshot.widgets.len()),
            Err(e) => tracing::error!("Failed to persist dashboard: {}", e),
        },
        PersistIntent::Clear => match clear_snapshot(store) {
            Ok(()) => tracing::debug!("Cleared persisted dashboard"),
            Err(e) => tracing::error!("Failed to clear persisted dashboard: {}", e),
        },
    }
}
