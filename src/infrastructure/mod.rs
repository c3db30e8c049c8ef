// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod gotrue_provider;
pub mod http_response;
pub mod kv_store;
pub mod postgrest_repository;
