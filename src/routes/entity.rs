//! Generated API routes.
//! Uses parameterized paths so handlers resolve the table (and key segments) against the
//! current snapshot; tables added by a refresh are served without rebuilding the router.

use crate::handlers::entity::{create, delete as delete_handler, list, not_found, show, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// `/{prefix}/:table_path` and `/{prefix}/:table_path/*keys`, plus a JSON 404 fallback.
pub fn api_routes(state: AppState) -> Router {
    let prefix = state.config.normalized_prefix();
    let base = if prefix.is_empty() {
        String::new()
    } else {
        format!("/{}", prefix)
    };
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .route(&format!("{}/:table_path", base), get(list).post(create))
        .route(
            &format!("{}/:table_path/*keys", base),
            get(show).put(update).delete(delete_handler),
        )
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
