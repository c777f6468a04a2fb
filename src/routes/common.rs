//! Service endpoints next to the generated API: liveness, readiness and generation info.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
}

/// Readiness needs a reachable database and a snapshot with at least one route.
#[derive(Serialize)]
struct Readiness {
    status: &'static str,
    database: &'static str,
    dialect: &'static str,
    routes: usize,
}

#[derive(Serialize)]
struct GenerationInfo {
    name: &'static str,
    version: &'static str,
    dialect: &'static str,
    prefix: String,
    tables: usize,
    routes: usize,
    generated_at: DateTime<Utc>,
    documentation: Option<String>,
}

async fn health() -> Json<Liveness> {
    Json(Liveness { status: "ok" })
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let routes = state.snapshot.current().routes.len();
    let database = match state.pool.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "readiness: database unreachable");
            "unavailable"
        }
    };
    let ready = database == "ok" && routes > 0;
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = Readiness {
        status: if ready { "ok" } else { "degraded" },
        database,
        dialect: state.pool.dialect().name(),
        routes,
    };
    (status, Json(body))
}

async fn info(State(state): State<AppState>) -> Json<GenerationInfo> {
    let snapshot = state.snapshot.current();
    let docs = &state.config.documentation;
    Json(GenerationInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        dialect: state.pool.dialect().name(),
        prefix: snapshot.routes.prefix().to_string(),
        tables: snapshot.tables.len(),
        routes: snapshot.routes.len(),
        generated_at: snapshot.generated_at,
        documentation: docs
            .enabled
            .then(|| format!("/{}", docs.openapi_route.trim_matches('/'))),
    })
}

/// `GET /health`, `/ready` and `/info`. `/version` is an alias of `/info`.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/info", get(info))
        .route("/version", get(info))
        .with_state(state)
}
