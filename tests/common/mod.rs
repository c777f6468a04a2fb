//! In-memory catalog used by the integration tests.

#![allow(dead_code)]

use apigen_sdk::error::GeneratorError;
use apigen_sdk::schema::{CatalogDriver, Dialect, RawColumn};
use async_trait::async_trait;

pub struct StaticTable {
    pub name: &'static str,
    pub columns: Vec<RawColumn>,
    pub primary_key: Vec<&'static str>,
}

/// Catalog backed by fixed tables, in listing order.
pub struct StaticCatalog {
    pub tables: Vec<StaticTable>,
    /// Report key discovery as unsupported, like a driver without key metadata.
    pub keys_unsupported: bool,
}

impl StaticCatalog {
    pub fn new(tables: Vec<StaticTable>) -> Self {
        StaticCatalog {
            tables,
            keys_unsupported: false,
        }
    }

    fn table(&self, name: &str) -> Result<&StaticTable, GeneratorError> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| GeneratorError::SchemaUnavailable(format!("no table {}", name)))
    }
}

#[async_trait]
impl CatalogDriver for StaticCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn database_name(&self) -> Result<String, GeneratorError> {
        Ok("memory".into())
    }

    async fn list_tables(&self) -> Result<Vec<String>, GeneratorError> {
        Ok(self.tables.iter().map(|t| t.name.to_string()).collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<RawColumn>, GeneratorError> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, GeneratorError> {
        if self.keys_unsupported {
            return Err(GeneratorError::UnsupportedDialectFeature {
                feature: "primary key discovery",
                dialect: "memory",
            });
        }
        Ok(self.table(table)?.primary_key.iter().map(|k| k.to_string()).collect())
    }
}

pub fn column(name: &str, data_type: &str, nullable: bool, default: Option<&str>) -> RawColumn {
    RawColumn {
        name: name.into(),
        data_type: data_type.into(),
        cast_type: Some(data_type.into()),
        max_length: None,
        nullable,
        default: default.map(String::from),
        allowed_values: vec![],
    }
}

pub fn varchar(name: &str, len: u32, nullable: bool) -> RawColumn {
    RawColumn {
        max_length: Some(len),
        cast_type: Some("varchar".into()),
        ..column(name, "character varying", nullable, None)
    }
}

pub fn users() -> StaticTable {
    StaticTable {
        name: "users",
        columns: vec![
            column("id", "integer", false, Some("nextval('users_id_seq')")),
            varchar("email", 255, false),
            column("age", "integer", true, None),
            column("active", "boolean", false, Some("true")),
            column("created_at", "timestamp without time zone", true, None),
            column("updated_at", "timestamp without time zone", true, None),
        ],
        primary_key: vec!["id"],
    }
}

pub fn order_lines() -> StaticTable {
    StaticTable {
        name: "order_lines",
        columns: vec![
            column("order_id", "integer", false, None),
            column("line_no", "integer", false, None),
            varchar("sku", 64, false),
            column("price", "numeric", true, None),
        ],
        primary_key: vec!["order_id", "line_no"],
    }
}

pub fn audit_log() -> StaticTable {
    StaticTable {
        name: "audit_log",
        columns: vec![
            column("id", "bigint", false, None),
            column("message", "text", false, None),
            column("logged_at", "timestamp with time zone", false, Some("now()")),
        ],
        primary_key: vec!["id"],
    }
}

pub fn events_without_key() -> StaticTable {
    StaticTable {
        name: "events",
        columns: vec![column("payload", "jsonb", true, None)],
        primary_key: vec![],
    }
}

/// Tenant-scoped table whose tenant column and timestamps are NOT NULL without defaults.
pub fn invoices() -> StaticTable {
    StaticTable {
        name: "invoices",
        columns: vec![
            column("id", "integer", false, None),
            column("tenant_id", "integer", false, None),
            column("amount", "numeric", false, None),
            column("note", "text", true, None),
            column("created_at", "timestamp without time zone", false, None),
            column("updated_at", "timestamp without time zone", false, None),
        ],
        primary_key: vec!["id"],
    }
}
