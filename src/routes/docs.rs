//! Documentation routes. Empty when documentation is disabled.

use crate::handlers::docs::{openapi_json, viewer};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn docs_routes(state: AppState) -> Router {
    let docs = &state.config.documentation;
    if !docs.enabled {
        return Router::new();
    }
    let json_path = format!("/{}", docs.openapi_route.trim_matches('/'));
    let viewer_path = format!("/{}", docs.path.trim_matches('/'));
    Router::new()
        .route(&json_path, get(openapi_json))
        .route(&viewer_path, get(viewer))
        .with_state(state)
}
