// Key-value port for dashboard persistence and the snapshot format stored through it
use crate::domain::dashboard::DashboardSnapshot;
use crate::domain::layout::ResponsiveLayouts;
use crate::domain::widget::Widget;
use serde::de::DeserializeOwned;
use thiserror::Error;

pub const LAYOUTS_KEY: &str = "dashboard_layouts_v1";
pub const WIDGETS_KEY: &str = "dashboard_widgets_v1";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Local, synchronous string storage owned by one dashboard.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Load the persisted dashboard, falling back to defaults per key.
///
/// A missing, unreadable or corrupted key only resets its own half of the
/// snapshot.
pub fn load_snapshot(store: &dyn KeyValueStore) -> DashboardSnapshot {
    let defaults = DashboardSnapshot::default();

    let widgets = read_json::<Vec<Widget>>(store, WIDGETS_KEY).unwrap_or(defaults.widgets);
    let layouts = read_json::<ResponsiveLayouts>(store, LAYOUTS_KEY).unwrap_or(defaults.layouts);

    tracing::debug!(
        "Loaded dashboard snapshot: {} widgets, {} tiers",
        widgets.len(),
        layouts.tiers().count()
    );

    DashboardSnapshot { widgets, layouts }
}

fn read_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!("Could not read {}: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring corrupted {}: {}", key, e);
            None
        }
    }
}

pub fn save_snapshot(store: &dyn KeyValueStore, snapshot: &DashboardSnapshot) -> Result<(), StorageError> {
    let layouts = serde_json::to_string(&snapshot.layouts)?;
    let widgets = serde_json::to_string(&snapshot.widgets)?;
    store.set(LAYOUTS_KEY, &layouts)?;
    store.set(WIDGETS_KEY, &widgets)?;
    Ok(())
}

pub fn clear_snapshot(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    store.remove(LAYOUTS_KEY)?;
    store.remove(WIDGETS_KEY)?;
    Ok(())
}
