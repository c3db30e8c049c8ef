// Repository trait for row storage and schema introspection on the hosted database
use crate::domain::record::{ColumnInfo, Granularity, PeriodSum, RowPage, SortDirection};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend responded with {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
}

/// Parameters of a paged, sorted row query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    pub page_size: u32,
    pub sort_key: String,
    pub sort_dir: SortDirection,
}

impl PageRequest {
    /// Zero-based, inclusive row range covered by this page.
    pub fn range(&self) -> (u64, u64) {
        let from = u64::from(self.page.max(1) - 1) * u64::from(self.page_size);
        (from, from + u64::from(self.page_size.max(1)) - 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest {
    pub table: String,
    pub date_column: String,
    pub sum_column: String,
    pub granularity: Granularity,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Same store, acting with one caller's credentials so row-level security applies.
    fn with_access_token(&self, access_token: &str) -> Arc<dyn RecordStore>;

    /// Raw rows of the public-tables RPC; shape varies between deployments.
    async fn list_tables(&self) -> Result<Vec<Value>, StoreError>;

    async fn get_schema(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError>;

    async fn query_page(&self, table: &str, request: &PageRequest) -> Result<RowPage, StoreError>;

    /// Insert a record and return its id.
    async fn insert(&self, table: &str, record: &Map<String, Value>) -> Result<String, StoreError>;

    /// Update a record, returning how many rows matched `id`.
    async fn update(&self, table: &str, id: &str, patch: &Map<String, Value>) -> Result<u64, StoreError>;

    async fn delete_many(&self, table: &str, ids: &[String]) -> Result<u64, StoreError>;

    /// Most frequent values of a column, computed server-side.
    async fn distinct_values(&self, table: &str, column: &str, limit: u32) -> Result<Vec<Value>, StoreError>;

    /// Plain column scan used when the distinct-values RPC is unavailable.
    async fn scan_column(&self, table: &str, column: &str, limit: u32) -> Result<Vec<Value>, StoreError>;

    async fn aggregate_sum_by_date(&self, request: &AggregateRequest) -> Result<Vec<PeriodSum>, StoreError>;
}
