//! APIGen SDK: schema-driven REST API generation over PostgreSQL and MySQL.
//!
//! Reads the database catalog, builds a deterministic route set, synthesizes validation
//! rules and an OpenAPI document from the same snapshot, and serves generic CRUD handlers.

pub mod case;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{validate_config, GeneratorConfig, Operation};
pub use error::{AppError, ConfigError, GeneratorError};
pub use generator::{build_snapshot, spawn_refresh_task, ApiSnapshot, Generator, RouteSet, SnapshotHandle};
pub use routes::{api_routes, app_router, common_routes_with_ready, docs_routes};
pub use schema::{catalog_for, CatalogDriver, DbPool, Dialect, SchemaReader, TableDescriptor};
pub use service::CrudService;
pub use state::AppState;
pub use store::{ArtifactStore, RouteCache};
