//! Immutable result of one generation pass, swapped atomically on refresh.

use crate::case::table_to_path;
use crate::generator::{OpenApiDocument, RouteSet, TableRules};
use crate::schema::TableDescriptor;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Tables, routes, rules and documentation from the same pass. Never mutated after build.
#[derive(Debug)]
pub struct ApiSnapshot {
    pub generated_at: DateTime<Utc>,
    pub tables: Vec<TableDescriptor>,
    pub routes: RouteSet,
    pub rules: BTreeMap<String, TableRules>,
    pub openapi: OpenApiDocument,
    /// Pretty-printed `openapi`; exactly the bytes published and served.
    pub openapi_json: String,
    path_index: HashMap<String, usize>,
}

impl ApiSnapshot {
    pub fn new(
        tables: Vec<TableDescriptor>,
        routes: RouteSet,
        rules: BTreeMap<String, TableRules>,
        openapi: OpenApiDocument,
    ) -> Result<Self, serde_json::Error> {
        let openapi_json = openapi.to_pretty_json()?;
        let path_index = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (table_to_path(&t.name), i))
            .collect();
        Ok(ApiSnapshot {
            generated_at: Utc::now(),
            tables,
            routes,
            rules,
            openapi,
            openapi_json,
            path_index,
        })
    }

    /// Snapshot with no tables, used before the first generation completes.
    pub fn empty(prefix: &str) -> Self {
        ApiSnapshot {
            generated_at: Utc::now(),
            tables: Vec::new(),
            routes: RouteSet::new(prefix),
            rules: BTreeMap::new(),
            openapi: OpenApiDocument {
                openapi: crate::generator::openapi::OPENAPI_VERSION.to_string(),
                info: crate::generator::openapi::Info {
                    title: String::new(),
                    version: String::new(),
                    description: String::new(),
                },
                servers: Vec::new(),
                tags: Vec::new(),
                paths: BTreeMap::new(),
            },
            openapi_json: "{}".to_string(),
            path_index: HashMap::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Table addressed by a URL collection segment (`order-lines`).
    pub fn table_by_path(&self, segment: &str) -> Option<&TableDescriptor> {
        self.path_index.get(segment).and_then(|&i| self.tables.get(i))
    }

    pub fn rules_for(&self, table: &str) -> Option<&TableRules> {
        self.rules.get(table)
    }
}

/// Shared pointer to the current snapshot. Readers clone the inner `Arc` and keep a
/// consistent view for the whole request; refresh replaces it in one step.
#[derive(Clone)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Arc<ApiSnapshot>>>,
}

impl SnapshotHandle {
    pub fn new(snapshot: ApiSnapshot) -> Self {
        SnapshotHandle {
            inner: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    pub fn current(&self) -> Arc<ApiSnapshot> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, snapshot: Arc<ApiSnapshot>) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }
}
