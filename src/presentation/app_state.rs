// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::session_provider::SessionProvider;
use crate::application::table_service::TableService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: DashboardService,
    pub table_service: TableService,
    pub sessions: Arc<dyn SessionProvider>,
}
