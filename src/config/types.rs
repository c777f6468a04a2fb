//! Generator configuration: every recognized option, each with a default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One generated CRUD operation. Declaration order is the canonical route order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Index,
    Show,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Index,
        Operation::Show,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Index => "index",
            Operation::Show => "show",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Operations addressed by primary key segments in the path.
    pub fn is_keyed(self) -> bool {
        matches!(self, Operation::Show | Operation::Update | Operation::Delete)
    }

    /// Label used in route listings.
    pub fn action_label(self) -> &'static str {
        match self {
            Operation::Index => "List all",
            Operation::Show => "Get one",
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the database dialect is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectSelection {
    #[default]
    Auto,
    Postgres,
    Mysql,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub dialect: DialectSelection,
    /// Named schema to read on PostgreSQL. MySQL always reads `DATABASE()`.
    pub schema: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            url: None,
            dialect: DialectSelection::Auto,
            schema: "public".into(),
            max_connections: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentationConfig {
    pub enabled: bool,
    /// Path of the HTML viewer.
    pub path: String,
    /// Path the OpenAPI JSON is served from.
    pub openapi_route: String,
    pub title: String,
    pub version: String,
    /// Base URL for the `servers` entry. When unset the prefix alone is used.
    pub server_url: Option<String>,
}

impl Default for DocumentationConfig {
    fn default() -> Self {
        DocumentationConfig {
            enabled: true,
            path: "api/v1/docs".into(),
            openapi_route: "api-docs/openapi.json".into(),
            title: "Generated API".into(),
            version: "1.0.0".into(),
            server_url: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_age_secs: u64,
    pub route_cache_path: String,
    pub openapi_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_age_secs: 3600,
            route_cache_path: "writable/cache/api-routes.json".into(),
            openapi_path: "writable/api-docs/openapi.json".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub per_page: u32,
    pub max_per_page: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            per_page: 20,
            max_per_page: 100,
        }
    }
}

/// All generator options. Passed explicitly to each component.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub api_prefix: String,
    pub documentation: DocumentationConfig,
    pub cache: CacheConfig,
    /// Tables to generate APIs for. Empty means every table.
    pub tables: Vec<String>,
    pub exclude_tables: Vec<String>,
    pub default_endpoints: Vec<Operation>,
    pub enabled_endpoints: BTreeMap<String, Vec<Operation>>,
    /// Per-table column allow-list for responses and filters. Absent means all columns.
    pub visible_columns: BTreeMap<String, Vec<String>>,
    /// table -> column -> rule string (e.g. `required|max_length[50]`). Replaces the derived rule.
    pub validation_rules: BTreeMap<String, BTreeMap<String, String>>,
    /// column -> bound value. A null or empty value disables filtering on that column.
    pub multi_tenant_columns: BTreeMap<String, Option<String>>,
    pub multi_tenant_exclude_tables: Vec<String>,
    pub pagination: PaginationConfig,
    pub database: DatabaseConfig,
    pub max_body_bytes: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            api_prefix: "api/v1".into(),
            documentation: DocumentationConfig::default(),
            cache: CacheConfig::default(),
            tables: Vec::new(),
            exclude_tables: vec!["migrations".into(), "_sqlx_migrations".into()],
            default_endpoints: Operation::ALL.to_vec(),
            enabled_endpoints: BTreeMap::new(),
            visible_columns: BTreeMap::new(),
            validation_rules: BTreeMap::new(),
            multi_tenant_columns: BTreeMap::new(),
            multi_tenant_exclude_tables: Vec::new(),
            pagination: PaginationConfig::default(),
            database: DatabaseConfig::default(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl GeneratorConfig {
    /// Enabled operations for a table: explicit per-table list, else the default list.
    pub fn endpoints_for(&self, table: &str) -> &[Operation] {
        self.enabled_endpoints
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_endpoints)
    }

    pub fn is_endpoint_enabled(&self, table: &str, op: Operation) -> bool {
        self.endpoints_for(table).contains(&op)
    }

    /// Visible column allow-list for a table, if one is configured and non-empty.
    pub fn visible_columns_for(&self, table: &str) -> Option<&[String]> {
        self.visible_columns
            .get(table)
            .filter(|cols| !cols.is_empty())
            .map(Vec::as_slice)
    }

    /// Prefix without surrounding slashes (`api/v1`).
    pub fn normalized_prefix(&self) -> &str {
        self.api_prefix.trim_matches('/')
    }

    /// Tenant predicates for a table: configured columns with a non-empty bound value.
    pub fn tenant_bindings_for(&self, table: &str) -> Vec<(String, String)> {
        if self.multi_tenant_exclude_tables.iter().any(|t| t == table) {
            return Vec::new();
        }
        self.multi_tenant_columns
            .iter()
            .filter_map(|(col, value)| match value.as_deref() {
                Some(v) if !v.is_empty() => Some((col.clone(), v.to_string())),
                _ => None,
            })
            .collect()
    }
}
