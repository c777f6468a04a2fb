//! Generated CRUD handlers: list, show, create, update, delete.
//!
//! Each request resolves its table and route against the snapshot current at arrival and
//! keeps that snapshot for its whole lifetime.

use crate::config::Operation;
use crate::error::AppError;
use crate::generator::{ApiSnapshot, RouteEntry};
use crate::response::{created, success_many, success_message, success_one, Pagination};
use crate::schema::{ColumnDescriptor, TableDescriptor};
use crate::service::{CrudService, RequestValidator};
use crate::sql::{Binding, TableQuery};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Table and route a request resolved to.
struct Target {
    snapshot: Arc<ApiSnapshot>,
    table_index: usize,
    route_index: usize,
}

impl Target {
    fn table(&self) -> &TableDescriptor {
        &self.snapshot.tables[self.table_index]
    }

    fn route(&self) -> &RouteEntry {
        &self.snapshot.routes.entries()[self.route_index]
    }
}

fn resolve(state: &AppState, table_path: &str, op: Operation) -> Result<Target, AppError> {
    let snapshot = state.snapshot.current();
    let table = snapshot.table_by_path(table_path).ok_or(AppError::RouteNotFound)?;
    let table_index = snapshot
        .tables
        .iter()
        .position(|t| t.name == table.name)
        .ok_or(AppError::RouteNotFound)?;
    let route_index = snapshot
        .routes
        .entries()
        .iter()
        .position(|e| e.table == table.name && e.operation == op)
        .ok_or(AppError::OperationDisabled)?;
    Ok(Target {
        snapshot,
        table_index,
        route_index,
    })
}

/// Bind path segments to the route's key columns. A segment count mismatch is an unknown path.
fn key_bindings<'a>(target: &'a Target, keys: &str) -> Result<Vec<Binding<'a>>, AppError> {
    let segments: Vec<&str> = keys.split('/').filter(|s| !s.is_empty()).collect();
    let route = target.route();
    if segments.len() != route.key_segments {
        return Err(AppError::RouteNotFound);
    }
    route
        .key_columns
        .iter()
        .zip(segments)
        .map(|(column, segment)| {
            let column = target.table().column(column).ok_or(AppError::RouteNotFound)?;
            RequestValidator::check_param(column, segment)?;
            Ok((column, Value::String(segment.to_string())))
        })
        .collect()
}

fn table_query<'a>(state: &'a AppState, table: &'a TableDescriptor) -> TableQuery<'a> {
    TableQuery::new(state.pool.dialect(), state.schema.as_deref(), table)
        .visible(state.config.visible_columns_for(&table.name))
        .tenant(&state.config.tenant_bindings_for(&table.name))
}

fn visible_columns<'a>(state: &AppState, table: &'a TableDescriptor) -> Vec<&'a ColumnDescriptor> {
    match state.config.visible_columns_for(&table.name) {
        Some(names) => table.columns.iter().filter(|c| names.contains(&c.name)).collect(),
        None => table.columns.iter().collect(),
    }
}

fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(_) => Err(AppError::BadRequest("Request body must be a JSON object.".into())),
        Err(e) => Err(AppError::BadRequest(format!("Invalid JSON body: {}", e.body_text()))),
    }
}

/// Body fields as column bindings. Unknown and hidden columns are rejected; tenant columns
/// are dropped (their bound value is applied by the query), and key columns too when `skip_keys`.
fn body_bindings<'a>(
    state: &AppState,
    table: &'a TableDescriptor,
    body: &Map<String, Value>,
    skip_keys: bool,
) -> Result<Vec<Binding<'a>>, AppError> {
    let tenant = state.config.tenant_bindings_for(&table.name);
    let visible = state.config.visible_columns_for(&table.name);
    let mut out = Vec::with_capacity(body.len());
    for (name, value) in body {
        let column = table
            .column(name)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown field: '{}'", name)))?;
        if tenant.iter().any(|(c, _)| c == name) {
            continue;
        }
        if skip_keys && column.is_primary_key {
            continue;
        }
        if visible.is_some_and(|v| !v.contains(name)) {
            return Err(AppError::BadRequest(format!("Unknown field: '{}'", name)));
        }
        out.push((column, value.clone()));
    }
    Ok(out)
}

pub async fn list(
    State(state): State<AppState>,
    Path(table_path): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, AppError> {
    let target = resolve(&state, &table_path, Operation::Index)?;
    let table = target.table();
    let pagination = &state.config.pagination;
    let visible = visible_columns(&state, table);

    let mut page: u32 = 1;
    let mut per_page: u32 = pagination.per_page;
    let mut filters: Vec<Binding<'_>> = Vec::new();
    for (k, v) in params {
        match k.as_str() {
            "page" => page = v.parse().unwrap_or(1).max(1),
            "per_page" => per_page = v.parse().unwrap_or(pagination.per_page),
            _ => {
                let column = visible
                    .iter()
                    .find(|c| c.name.eq_ignore_ascii_case(&k))
                    .ok_or_else(|| AppError::InvalidFilterField(k.clone()))?;
                RequestValidator::check_param(column, &v)?;
                filters.push((*column, Value::String(v)));
            }
        }
    }
    let per_page = per_page.clamp(1, pagination.max_per_page.max(1));

    let query = table_query(&state, table);
    let result = CrudService::list(&state.pool, &query, &filters, page, per_page).await?;
    Ok(success_many(
        result.rows,
        Pagination::new(page, per_page, result.total),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    Path((table_path, keys)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let target = resolve(&state, &table_path, Operation::Show)?;
    let key_values = key_bindings(&target, &keys)?;
    let query = table_query(&state, target.table());
    let row = CrudService::read(&state.pool, &query, &key_values)
        .await?
        .ok_or(AppError::RecordNotFound)?;
    Ok(success_one(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(table_path): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let target = resolve(&state, &table_path, Operation::Create)?;
    let table = target.table();
    let body = body_object(body)?;
    let values = body_bindings(&state, table, &body, false)?;
    if let Some(rules) = target.snapshot.rules_for(&table.name) {
        RequestValidator::validate(&body, &rules.create)?;
    }
    let query = table_query(&state, table);
    let id = CrudService::create(&state.pool, &query, table, &values).await?;
    tracing::info!(table = %table.name, id = %id, "record created");
    Ok(created(id))
}

pub async fn update(
    State(state): State<AppState>,
    Path((table_path, keys)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let target = resolve(&state, &table_path, Operation::Update)?;
    let table = target.table();
    let key_values = key_bindings(&target, &keys)?;
    let body = body_object(body)?;
    let values = body_bindings(&state, table, &body, true)?;
    if let Some(rules) = target.snapshot.rules_for(&table.name) {
        RequestValidator::validate_partial(&body, &rules.update)?;
    }
    if values.is_empty() && !table.has_column("updated_at") {
        return Err(AppError::BadRequest("There is no data to update.".into()));
    }
    let query = table_query(&state, table);
    CrudService::update(&state.pool, &query, &values, &key_values).await?;
    Ok(success_message("Record updated successfully"))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((table_path, keys)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let target = resolve(&state, &table_path, Operation::Delete)?;
    let key_values = key_bindings(&target, &keys)?;
    let query = table_query(&state, target.table());
    CrudService::delete(&state.pool, &query, &key_values).await?;
    Ok(success_message("Record deleted successfully"))
}

/// JSON 404 for anything no route matched.
pub async fn not_found() -> AppError {
    AppError::RouteNotFound
}
