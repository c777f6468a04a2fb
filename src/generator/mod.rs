//! Generation pipeline: schema -> routes -> rules -> documentation, as one snapshot.

pub mod openapi;
mod routes;
mod snapshot;
mod validation;

pub use openapi::{DocumentationGenerator, OpenApiDocument};
pub use routes::{HttpMethod, RouteBuilder, RouteEntry, RouteListing, RouteSet};
pub use snapshot::{ApiSnapshot, SnapshotHandle};
pub use validation::{parse_rules, synthesize, synthesize_table, FieldRuleSet, Rule, RuleMode, TableRules};

use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use crate::schema::{timestamp_fields, SchemaReader, TableDescriptor, TablePolicy};
use crate::store::ArtifactStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Build a snapshot from already-described tables. Pure; no I/O.
pub fn build_snapshot(
    config: &GeneratorConfig,
    tables: Vec<TableDescriptor>,
) -> Result<ApiSnapshot, GeneratorError> {
    warn_missing_tenant_columns(config, &tables);

    let routes = RouteBuilder::new(config).build(&tables)?;
    let rules: BTreeMap<String, TableRules> = tables
        .iter()
        .map(|t| {
            let mut rules = synthesize_table(t, config.validation_rules.get(&t.name));
            let filled = insert_filled_columns(config, t);
            if !filled.is_empty() {
                rules.create = rules.create.relaxed_for(&filled);
            }
            (t.name.clone(), rules)
        })
        .collect();
    let openapi = DocumentationGenerator::new(config).generate(&routes, &tables, &rules);
    Ok(ApiSnapshot::new(tables, routes, rules, openapi)?)
}

/// Columns the insert statement writes itself: bound tenant columns, and the
/// `created_at` / `updated_at` pair when the table has both. Never required from clients.
fn insert_filled_columns(config: &GeneratorConfig, table: &TableDescriptor) -> Vec<String> {
    let mut filled: Vec<String> = config
        .tenant_bindings_for(&table.name)
        .into_iter()
        .map(|(column, _)| column)
        .filter(|column| table.has_column(column))
        .collect();
    if table.has_timestamps() {
        filled.extend(
            timestamp_fields(table)
                .into_iter()
                .filter(|c| c == "created_at" || c == "updated_at"),
        );
    }
    filled
}

fn warn_missing_tenant_columns(config: &GeneratorConfig, tables: &[TableDescriptor]) {
    for table in tables {
        for (column, _) in config.tenant_bindings_for(&table.name) {
            if !table.has_column(&column) {
                tracing::warn!(
                    table = %table.name,
                    column = %column,
                    "tenant column missing; rows of this table are not tenant-scoped"
                );
            }
        }
    }
}

pub struct Generator {
    reader: SchemaReader,
    config: Arc<GeneratorConfig>,
}

impl Generator {
    pub fn new(reader: SchemaReader, config: Arc<GeneratorConfig>) -> Self {
        Generator { reader, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn reader(&self) -> &SchemaReader {
        &self.reader
    }

    /// One full pass. Any failure aborts; the caller keeps whatever it had.
    pub async fn generate(&self) -> Result<ApiSnapshot, GeneratorError> {
        let policy = TablePolicy::from_config(&self.config);
        let tables = self.reader.table_info(&policy).await?;
        tracing::info!(tables = tables.len(), dialect = self.reader.dialect().name(), "schema read");
        let snapshot = build_snapshot(&self.config, tables)?;
        tracing::info!(
            routes = snapshot.routes.len(),
            paths = snapshot.openapi.paths.len(),
            "api generated"
        );
        Ok(snapshot)
    }

    /// Regenerate, publish, then swap. On failure the current snapshot stays in place.
    pub async fn refresh(
        &self,
        handle: &SnapshotHandle,
        store: &ArtifactStore,
    ) -> Result<Arc<ApiSnapshot>, GeneratorError> {
        let snapshot = Arc::new(self.generate().await?);
        store.publish(&snapshot).await?;
        handle.replace(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Refresh only when the persisted route cache is missing or older than the max age.
    pub async fn refresh_if_stale(
        &self,
        handle: &SnapshotHandle,
        store: &ArtifactStore,
    ) -> Result<bool, GeneratorError> {
        let stale = match store.load_route_cache().await? {
            Some(cache) => cache.is_stale(chrono::Utc::now(), self.config.cache.max_age_secs),
            None => true,
        };
        if stale {
            self.refresh(handle, store).await?;
        }
        Ok(stale)
    }
}

/// Background task checking cache staleness every `every`.
pub fn spawn_refresh_task(
    generator: Arc<Generator>,
    handle: SnapshotHandle,
    store: ArtifactStore,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately; the caller has just generated.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match generator.refresh_if_stale(&handle, &store).await {
                Ok(true) => tracing::info!("api snapshot refreshed"),
                Ok(false) => tracing::debug!("route cache fresh"),
                Err(e) => tracing::error!(error = %e, "refresh failed; keeping current snapshot"),
            }
        }
    })
}
