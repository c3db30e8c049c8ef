// Table service - use cases behind the generic table admin pages
use crate::application::record_store::{AggregateRequest, PageRequest, RecordStore, StoreError};
use crate::domain::record::{
    cast_form_value, is_identifier, ColumnDescriptor, PeriodSum, SortDirection,
};
use crate::domain::session::Session;
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 8;
pub const DEFAULT_SORT_KEY: &str = "created_at";
const DISTINCT_LIMIT: u32 = 20;
const FALLBACK_SCAN_LIMIT: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePage {
    pub rows: Vec<Value>,
    pub total_pages: u64,
    pub current_page: u32,
}

#[derive(Clone)]
pub struct TableService {
    store: Arc<dyn RecordStore>,
}

impl TableService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Service whose backend calls carry `session`'s credentials.
    pub fn for_session(&self, session: &Session) -> Self {
        Self {
            store: self.store.with_access_token(&session.access_token),
        }
    }

    /// Public table names, trimmed and sorted.
    pub async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let rows = self.store.list_tables().await?;
        let mut tables: Vec<String> = rows
            .iter()
            .filter_map(table_name)
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        tables.sort();
        Ok(tables)
    }

    pub async fn schema(&self, table: &str) -> Result<Vec<ColumnDescriptor>, StoreError> {
        validate_identifier("table", table)?;
        let columns = self.store.get_schema(table).await?;
        Ok(columns.iter().filter_map(ColumnDescriptor::from_info).collect())
    }

    pub async fn page(
        &self,
        table: &str,
        page: Option<u32>,
        limit: Option<u32>,
        sort_by: Option<String>,
        sort_dir: Option<SortDirection>,
    ) -> Result<TablePage, StoreError> {
        validate_identifier("table", table)?;
        let request = PageRequest {
            page: page.unwrap_or(1).max(1),
            page_size: limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            sort_key: sort_by.unwrap_or_else(|| DEFAULT_SORT_KEY.to_string()),
            sort_dir: sort_dir.unwrap_or_default(),
        };
        validate_identifier("sort column", &request.sort_key)?;

        let page = self.store.query_page(table, &request).await?;
        tracing::debug!(
            "Fetched {} rows of {} (page {}, total {})",
            page.rows.len(),
            table,
            request.page,
            page.total_count
        );

        Ok(TablePage {
            rows: page.rows,
            total_pages: page.total_count.div_ceil(u64::from(request.page_size)),
            current_page: request.page,
        })
    }

    /// Insert a row built from raw form fields, cast by the table schema.
    pub async fn create(&self, table: &str, form: &HashMap<String, String>) -> Result<String, StoreError> {
        let schema = self.schema(table).await?;
        let record = cast_form(&schema, form, false);
        if record.is_empty() {
            return Err(StoreError::Validation("no valid data to insert".to_string()));
        }

        let id = self.store.insert(table, &record).await?;
        tracing::info!("Created record {} in {}", id, table);
        Ok(id)
    }

    pub async fn update(
        &self,
        table: &str,
        id: &str,
        form: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(StoreError::Validation("invalid record id".to_string()));
        }

        let schema = self.schema(table).await?;
        let patch = cast_form(&schema, form, true);
        if patch.is_empty() {
            return Err(StoreError::Validation("no fields to update".to_string()));
        }

        let matched = self.store.update(table, id, &patch).await?;
        if matched == 0 {
            return Err(StoreError::NotFound(format!("record {}", id)));
        }

        tracing::info!("Updated record {} in {}", id, table);
        Ok(())
    }

    pub async fn delete(&self, table: &str, ids: &[String]) -> Result<u64, StoreError> {
        validate_identifier("table", table)?;
        if ids.is_empty() || ids.iter().any(|id| id.trim().is_empty()) {
            return Err(StoreError::Validation("no valid ids to delete".to_string()));
        }

        let deleted = self.store.delete_many(table, ids).await?;
        tracing::info!("Deleted {} records from {}", deleted, table);
        Ok(deleted)
    }

    /// Filter options for each column; columns that cannot be read are omitted.
    pub async fn distinct_options(
        &self,
        table: &str,
        columns: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, StoreError> {
        validate_identifier("table", table)?;
        if columns.is_empty() {
            return Err(StoreError::Validation("no columns given".to_string()));
        }
        for column in columns {
            validate_identifier("column", column)?;
        }

        let lookups = columns.iter().map(|column| async move {
            let values = self.column_options(table, column).await;
            values.map(|values| (column.clone(), values))
        });

        Ok(join_all(lookups).await.into_iter().flatten().collect())
    }

    async fn column_options(&self, table: &str, column: &str) -> Option<Vec<String>> {
        match self.store.distinct_values(table, column, DISTINCT_LIMIT).await {
            Ok(values) => Some(
                values
                    .iter()
                    .filter_map(option_label)
                    .take(DISTINCT_LIMIT as usize)
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!("Distinct RPC failed for {}.{}, scanning instead: {}", table, column, e);
                match self.store.scan_column(table, column, FALLBACK_SCAN_LIMIT).await {
                    Ok(values) => {
                        let unique: BTreeSet<String> = values.iter().filter_map(option_label).collect();
                        Some(unique.into_iter().take(DISTINCT_LIMIT as usize).collect())
                    }
                    Err(e) => {
                        tracing::warn!("Column scan failed for {}.{}: {}", table, column, e);
                        None
                    }
                }
            }
        }
    }

    pub async fn aggregate_sum_by_date(&self, request: &AggregateRequest) -> Result<Vec<PeriodSum>, StoreError> {
        validate_identifier("table", &request.table)?;
        validate_identifier("date column", &request.date_column)?;
        validate_identifier("sum column", &request.sum_column)?;
        if request.start_date > request.end_date {
            return Err(StoreError::Validation("start date is after end date".to_string()));
        }
        self.store.aggregate_sum_by_date(request).await
    }
}

fn validate_identifier(what: &str, name: &str) -> Result<(), StoreError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(StoreError::Validation(format!("invalid {} name: {:?}", what, name)))
    }
}

/// Name of a table from one row of the public-tables RPC.
fn table_name(row: &Value) -> Option<&str> {
    match row {
        Value::String(name) => Some(name.as_str()),
        Value::Object(fields) => ["table_name", "tablename", "name"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str)),
        _ => None,
    }
}

fn option_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn cast_form(schema: &[ColumnDescriptor], form: &HashMap<String, String>, skip_id: bool) -> Map<String, Value> {
    schema
        .iter()
        .filter(|column| !(skip_id && column.key == "id"))
        .filter_map(|column| {
            form.get(&column.key)
                .map(|raw| (column.key.clone(), cast_form_value(raw, column.format)))
        })
        .collect()
}
