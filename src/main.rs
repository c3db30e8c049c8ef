// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_service::DashboardService;
use crate::application::session_provider::{SessionChange, SessionProvider};
use crate::application::snapshot_store::KeyValueStore;
use crate::application::table_service::TableService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::gotrue_provider::GoTrueProvider;
use crate::infrastructure::kv_store::{FileStore, MemoryStore};
use crate::infrastructure::postgrest_repository::PostgrestRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::auth_guard::require_session;
use crate::presentation::handlers::{
    add_widget, clear_dashboard, get_dashboard, health_check, home, remove_widget, sign_in,
    sign_in_page, sign_out, sign_up, update_layout, update_viewport, widget_catalog,
};
use crate::presentation::table_handlers::{
    aggregate_by_date, create_row, delete_rows, distinct_options, list_tables, table_rows,
    table_schema, update_row,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = load_app_config()?;

    // Initialize tracing, RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Adapters (infrastructure layer)
    let sessions = Arc::new(GoTrueProvider::new(
        config.backend.url.clone(),
        config.backend.anon_key.clone(),
    ));
    let repository = Arc::new(PostgrestRepository::new(
        config.backend.url.clone(),
        config.backend.anon_key.clone(),
    ));
    tokio::spawn(audit_sessions(sessions.subscribe()));
    let store: Arc<dyn KeyValueStore> = if config.dashboard.ephemeral {
        tracing::warn!("Dashboard persistence is in-memory; layouts are lost on restart");
        Arc::new(MemoryStore::default())
    } else {
        let store = FileStore::open(&config.dashboard.storage_dir)?;
        tracing::info!("Persisting dashboard under {}", store.dir().display());
        Arc::new(store)
    };

    // Services (application layer)
    let dashboard_service = DashboardService::load(
        store,
        config.dashboard.initial_width,
        config.dashboard.debounce(),
    );
    let table_service = TableService::new(repository);

    let state = Arc::new(AppState {
        dashboard_service,
        table_service,
        sessions,
    });

    // Router (presentation layer)
    let router = build_router(state.clone());

    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting admin-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.dashboard_service.shutdown();
    tracing::info!("Stopped");

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let dashboard = Router::new()
        .route("/", get(get_dashboard).delete(clear_dashboard))
        .route("/catalog", get(widget_catalog))
        .route("/viewport", post(update_viewport))
        .route("/widgets", post(add_widget))
        .route("/widgets/:id", delete(remove_widget))
        .route("/layout", put(update_layout));

    let tables = Router::new()
        .route("/", get(list_tables))
        .route("/:table/schema", get(table_schema))
        .route("/:table/rows", get(table_rows).post(create_row).delete(delete_rows))
        .route("/:table/rows/:id", patch(update_row))
        .route("/:table/distinct", get(distinct_options))
        .route("/:table/aggregate", get(aggregate_by_date));

    Router::new()
        .route("/", get(home))
        .route("/healthz", get(health_check))
        .route("/signin", get(sign_in_page))
        .route("/auth/signin", post(sign_in))
        .route("/auth/signup", post(sign_up))
        .route("/auth/signout", post(sign_out))
        .route("/admin", get(get_dashboard))
        .nest("/admin/dashboard", dashboard)
        .nest("/admin/tables", tables)
        .layer(middleware::from_fn_with_state(state.clone(), require_session))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn audit_sessions(mut changes: broadcast::Receiver<SessionChange>) {
    loop {
        match changes.recv().await {
            Ok(SessionChange::SignedIn { user_email }) => {
                tracing::info!("Signed in: {}", user_email.as_deref().unwrap_or("unknown"));
            }
            Ok(SessionChange::SignedOut { user_email }) => {
                tracing::info!("Signed out: {}", user_email.as_deref().unwrap_or("unknown"));
            }
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!("Session audit skipped {} changes", missed);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
