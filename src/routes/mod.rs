//! Router builders.

mod common;
mod docs;
mod entity;

pub use common::common_routes_with_ready;
pub use docs::docs_routes;
pub use entity::api_routes;

use crate::state::AppState;
use axum::Router;

/// Everything the generator serves: API, documentation and service endpoints.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(docs_routes(state.clone()))
        .merge(common_routes_with_ready(state.clone()))
        .merge(api_routes(state))
}
