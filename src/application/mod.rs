// Application layer - use cases and the ports they depend on
pub mod dashboard_service;
pub mod persistence;
pub mod record_store;
pub mod session_provider;
pub mod snapshot_store;
pub mod table_service;
