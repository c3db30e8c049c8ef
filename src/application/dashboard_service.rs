// Dashboard service - single dispatcher for every dashboard event
use crate::application::persistence::{DebouncedPersister, PersistIntent};
use crate::application::snapshot_store::{load_snapshot, KeyValueStore};
use crate::domain::dashboard::{DashboardError, DashboardEvent, DashboardState, TierView, Transition};
use crate::domain::widget::{WidgetKind, WidgetSize};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Result of one dispatched event, as handed to the renderer.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub transition: Transition,
    pub view: Option<TierView>,
}

/// An entry of the "add widget" toolbar.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub label: &'static str,
    pub default_size: WidgetSize,
}

#[derive(Clone)]
pub struct DashboardService {
    state: Arc<Mutex<DashboardState>>,
    persister: Arc<DebouncedPersister>,
}

impl DashboardService {
    /// Restore the dashboard from `store` and start its persister.
    pub fn load(store: Arc<dyn KeyValueStore>, initial_width: Option<u32>, debounce: Duration) -> Self {
        let snapshot = load_snapshot(store.as_ref());
        let (state, restored) = DashboardState::restore(snapshot, initial_width);

        tracing::info!(
            "Dashboard restored with {} widgets across {} tiers (breakpoint: {})",
            state.widgets().len(),
            state.layouts().tiers().count(),
            state
                .breakpoint()
                .map(|bp| bp.label())
                .unwrap_or("unmeasured")
        );

        let persister = DebouncedPersister::spawn(store, debounce);
        if restored.changed {
            if let Some(bp) = restored.projected {
                tracing::debug!("Projected reference layout onto {} while restoring", bp);
            }
            persister.schedule(PersistIntent::Save(state.snapshot()));
        }

        Self {
            state: Arc::new(Mutex::new(state)),
            persister: Arc::new(persister),
        }
    }

    /// Apply an event atomically and schedule persistence if it changed anything.
    pub async fn dispatch(&self, event: DashboardEvent) -> Result<Dispatched, DashboardError> {
        let mut state = self.state.lock().await;
        let label = event_label(&event);
        if let DashboardEvent::Measured { width, reason } = &event {
            tracing::debug!("Container measured on {:?}: {:?}px", reason, width);
        }
        let transition = state.apply(event)?;

        if let Some(bp) = transition.projected {
            tracing::debug!("Projected reference layout onto {} ({} cols)", bp, bp.columns());
        }
        if transition.restacked {
            tracing::debug!("Restacked small breakpoints from reference layout");
        }
        if let Some(widget) = transition
            .added
            .as_ref()
            .and_then(|id| state.widgets().iter().find(|w| &w.id == id))
        {
            tracing::info!("Added widget {} ({})", widget.id, widget.display_title());
        }

        if transition.cleared {
            tracing::info!("Dashboard cleared");
            self.persister.schedule(PersistIntent::Clear);
        } else if transition.changed {
            self.persister.schedule(PersistIntent::Save(state.snapshot()));
        } else {
            tracing::debug!("{} left the dashboard unchanged", label);
        }

        Ok(Dispatched {
            transition,
            view: state.view(),
        })
    }

    pub async fn view(&self) -> Option<TierView> {
        self.state.lock().await.view()
    }

    pub fn catalog(&self) -> Vec<CatalogEntry> {
        WidgetKind::ALL
            .into_iter()
            .map(|kind| CatalogEntry {
                kind,
                label: kind.label(),
                default_size: kind.default_size(),
            })
            .collect()
    }

    /// Stop persisting; a write still waiting on the debounce is dropped.
    pub fn shutdown(&self) {
        self.persister.shutdown();
    }
}

fn event_label(event: &DashboardEvent) -> &'static str {
    match event {
        DashboardEvent::Measured { .. } => "measure",
        DashboardEvent::AddWidget { .. } => "add-widget",
        DashboardEvent::RemoveWidget { .. } => "remove-widget",
        DashboardEvent::LayoutChanged { .. } => "layout-change",
        DashboardEvent::Clear => "clear",
    }
}
