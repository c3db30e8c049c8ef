// HTTP request handlers for the generic table admin pages
use crate::application::record_store::AggregateRequest;
use crate::application::table_service::TablePage;
use crate::domain::record::{ColumnDescriptor, Granularity, PeriodSum, SortDirection};
use crate::domain::session::Session;
use crate::infrastructure::http_response::{ApiError, ApiResponse};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<SortDirection>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedRecord {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedRecords {
    pub deleted_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct DistinctQuery {
    /// Comma-separated column names
    pub columns: String,
}

#[derive(Debug, Deserialize)]
pub struct AggregateQuery {
    pub date_column: String,
    pub sum_column: String,
    pub granularity: Granularity,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub async fn list_tables(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<String>> {
    let tables = state.table_service.for_session(&session).list_tables().await?;
    Ok(Json(ApiResponse::success(tables)))
}

pub async fn table_schema(
    Path(table): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<ColumnDescriptor>> {
    let schema = state.table_service.for_session(&session).schema(&table).await?;
    Ok(Json(ApiResponse::success(schema)))
}

pub async fn table_rows(
    Path(table): Path<String>,
    Query(query): Query<RowsQuery>,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ApiResult<TablePage> {
    let page = state
        .table_service
        .page(&table, query.page, query.limit, query.sort_by, query.sort_dir)
        .await?;
    Ok(Json(ApiResponse::success(page)))
}

pub async fn create_row(
    Path(table): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(form): Json<HashMap<String, String>>,
) -> ApiResult<CreatedRecord> {
    let id = state.table_service.for_session(&session).create(&table, &form).await?;
    Ok(Json(ApiResponse::success(CreatedRecord { id })))
}

pub async fn update_row(
    Path((table, id)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(form): Json<HashMap<String, String>>,
) -> ApiResult<()> {
    state.table_service.for_session(&session).update(&table, &id, &form).await?;
    Ok(Json(ApiResponse::success(())))
}

pub async fn delete_rows(
    Path(table): Path<String>,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<DeleteRequest>,
) -> ApiResult<DeletedRecords> {
    let deleted_count = state.table_service.for_session(&session).delete(&table, &request.ids).await?;
    Ok(Json(ApiResponse::success(DeletedRecords { deleted_count })))
}

pub async fn distinct_options(
    Path(table): Path<String>,
    Query(query): Query<DistinctQuery>,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ApiResult<BTreeMap<String, Vec<String>>> {
    let columns: Vec<String> = query
        .columns
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    let options = state.table_service.for_session(&session).distinct_options(&table, &columns).await?;
    Ok(Json(ApiResponse::success(options)))
}

/// Sums of one column bucketed by date, for chart widgets
pub async fn aggregate_by_date(
    Path(table): Path<String>,
    Query(query): Query<AggregateQuery>,
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<PeriodSum>> {
    let request = AggregateRequest {
        table,
        date_column: query.date_column,
        sum_column: query.sum_column,
        granularity: query.granularity,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let sums = state.table_service.for_session(&session).aggregate_sum_by_date(&request).await?;
    Ok(Json(ApiResponse::success(sums)))
}
