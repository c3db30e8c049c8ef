// Presentation layer - HTTP surface
pub mod app_state;
pub mod auth_guard;
pub mod handlers;
pub mod table_handlers;
