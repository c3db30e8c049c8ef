// PostgREST repository implementation - rows, RPC schema introspection and aggregates
use crate::application::record_store::{AggregateRequest, PageRequest, RecordStore, StoreError};
use crate::domain::record::{ColumnInfo, PeriodSum, RowPage};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PostgrestRepository {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    /// Caller's token; requests fall back to the anon key without one.
    access_token: Option<String>,
}

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    hint: Option<String>,
}

impl PostgrestRepository {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
            access_token: None,
        }
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<PostgrestError>(&body) {
            Ok(PostgrestError { message, hint: Some(hint) }) => format!("{} ({})", message, hint),
            Ok(PostgrestError { message, hint: None }) => message,
            Err(_) => body,
        };
        Err(StoreError::Backend { status, message })
    }

    async fn rpc<T: DeserializeOwned>(&self, function: &str, args: Value) -> Result<T, StoreError> {
        tracing::debug!("Calling RPC {}", function);
        let response = self
            .send(self.request(Method::POST, &self.rpc_url(function)).json(&args))
            .await?;
        Ok(response.json::<T>().await?)
    }

    /// Rows touched by a write made with `Prefer: return=representation`.
    async fn returned_rows(&self, request: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let response = self
            .send(request.header("Prefer", "return=representation"))
            .await?;
        Ok(response.json::<Vec<Value>>().await?)
    }
}

/// Total row count from a `Content-Range` header such as `0-7/17`.
fn parse_total_count(content_range: &str) -> Option<u64> {
    content_range.rsplit('/').next()?.parse().ok()
}

/// `in.("a","b")` filter, with quotes and backslashes escaped.
fn in_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn id_of(row: &Value) -> Option<String> {
    match row.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RecordStore for PostgrestRepository {
    fn with_access_token(&self, access_token: &str) -> Arc<dyn RecordStore> {
        Arc::new(Self {
            access_token: Some(access_token.to_string()),
            ..self.clone()
        })
    }

    async fn list_tables(&self) -> Result<Vec<Value>, StoreError> {
        self.rpc("get_public_tables", json!({})).await
    }

    async fn get_schema(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        self.rpc("get_table_schema", json!({ "table_name": table })).await
    }

    async fn query_page(&self, table: &str, request: &PageRequest) -> Result<RowPage, StoreError> {
        let (from, to) = request.range();
        let url = format!(
            "{}?select=*&order={}.{}",
            self.table_url(table),
            urlencoding::encode(&request.sort_key),
            request.sort_dir.as_str()
        );

        let response = self
            .send(
                self.request(Method::GET, &url)
                    .header("Range-Unit", "items")
                    .header("Range", format!("{}-{}", from, to))
                    .header("Prefer", "count=estimated"),
            )
            .await?;

        let total_count = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total_count)
            .unwrap_or(0);
        let rows = response.json::<Vec<Value>>().await?;

        Ok(RowPage { rows, total_count })
    }

    async fn insert(&self, table: &str, record: &Map<String, Value>) -> Result<String, StoreError> {
        let rows = self
            .returned_rows(self.request(Method::POST, &self.table_url(table)).json(record))
            .await?;
        rows.first()
            .and_then(id_of)
            .ok_or_else(|| StoreError::Validation(format!("insert into {} returned no id", table)))
    }

    async fn update(&self, table: &str, id: &str, patch: &Map<String, Value>) -> Result<u64, StoreError> {
        let url = format!(
            "{}?id=eq.{}&select=id",
            self.table_url(table),
            urlencoding::encode(id)
        );
        let rows = self
            .returned_rows(self.request(Method::PATCH, &url).json(patch))
            .await?;
        Ok(rows.len() as u64)
    }

    async fn delete_many(&self, table: &str, ids: &[String]) -> Result<u64, StoreError> {
        let url = format!(
            "{}?id={}&select=id",
            self.table_url(table),
            urlencoding::encode(&in_filter(ids))
        );
        let rows = self.returned_rows(self.request(Method::DELETE, &url)).await?;
        Ok(rows.len() as u64)
    }

    async fn distinct_values(&self, table: &str, column: &str, limit: u32) -> Result<Vec<Value>, StoreError> {
        let rows: Vec<Value> = self
            .rpc(
                "get_distinct_top_values",
                json!({
                    "p_table_name": table,
                    "p_column_name": column,
                    "p_limit": limit,
                }),
            )
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.get_mut("value").map(Value::take))
            .collect())
    }

    async fn scan_column(&self, table: &str, column: &str, limit: u32) -> Result<Vec<Value>, StoreError> {
        let url = format!(
            "{table_url}?select={col}&{col}=not.is.null&{col}=neq.&order={col}&limit={limit}",
            table_url = self.table_url(table),
            col = column,
            limit = limit
        );
        let response = self.send(self.request(Method::GET, &url)).await?;
        let rows = response.json::<Vec<Value>>().await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.get_mut(column).map(Value::take))
            .collect())
    }

    async fn aggregate_sum_by_date(&self, request: &AggregateRequest) -> Result<Vec<PeriodSum>, StoreError> {
        self.rpc(
            "get_aggregate_sum_by_date",
            json!({
                "granularity": request.granularity,
                "start_date": request.start_date.format("%Y-%m-%d").to_string(),
                "end_date": request.end_date.format("%Y-%m-%d").to_string(),
                "table_name": request.table,
                "date_column": request.date_column,
                "sum_column": request.sum_column,
            }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_total_count() {
        assert_eq!(parse_total_count("0-7/17"), Some(17));
        assert_eq!(parse_total_count("*/0"), Some(0));
        assert_eq!(parse_total_count("0-7/*"), None);
    }

    #[test]
    fn test_in_filter_quotes_ids() {
        let ids = vec!["a1".to_string(), "b\"2".to_string()];
        assert_eq!(in_filter(&ids), r#"in.("a1","b\"2")"#);
    }

    #[test]
    fn test_id_of_accepts_numbers_and_strings() {
        assert_eq!(id_of(&json!({"id": 12})), Some("12".to_string()));
        assert_eq!(id_of(&json!({"id": "abc"})), Some("abc".to_string()));
        assert_eq!(id_of(&json!({"id": null})), None);
        assert_eq!(id_of(&json!({"name": "x"})), None);
    }

    #[test]
    fn test_urls_strip_trailing_slash() {
        let repo = PostgrestRepository::new("https://db.example.com/".to_string(), "anon".to_string());
        assert_eq!(repo.table_url("orders"), "https://db.example.com/rest/v1/orders");
        assert_eq!(
            repo.rpc_url("get_public_tables"),
            "https://db.example.com/rest/v1/rpc/get_public_tables"
        );
    }

    #[test]
    fn test_scoped_repository_uses_caller_token() {
        let repo = PostgrestRepository::new("https://db.example.com".to_string(), "anon".to_string());
        assert_eq!(repo.bearer(), "anon");

        let alice = PostgrestRepository {
            access_token: Some("alice-token".to_string()),
            ..repo.clone()
        };
        assert_eq!(alice.bearer(), "alice-token");
        // Scoping never leaks into the shared repository
        let _scoped = repo.with_access_token("bob-token");
        assert_eq!(repo.bearer(), "anon");
    }
}
