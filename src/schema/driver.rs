//! Catalog driver capability and the pooled connection it reads through.

use crate::config::{DatabaseConfig, DialectSelection};
use crate::error::{ConfigError, GeneratorError};
use crate::schema::{ForeignKey, IndexInfo, MySqlCatalog, PostgresCatalog, TableStats};
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    /// Resolve the dialect from the selection, reading the url scheme for `auto`.
    pub fn select(selection: DialectSelection, url: &str) -> Result<Dialect, ConfigError> {
        match selection {
            DialectSelection::Postgres => Ok(Dialect::Postgres),
            DialectSelection::Mysql => Ok(Dialect::MySql),
            DialectSelection::Auto => {
                let scheme = url.split("://").next().unwrap_or("").to_lowercase();
                match scheme.as_str() {
                    "postgres" | "postgresql" => Ok(Dialect::Postgres),
                    "mysql" | "mariadb" => Ok(Dialect::MySql),
                    _ => Err(ConfigError::UnknownDialect(scheme)),
                }
            }
        }
    }
}

/// Column as read from the catalog, before canonical type mapping.
#[derive(Clone, Debug)]
pub struct RawColumn {
    pub name: String,
    pub data_type: String,
    pub cast_type: Option<String>,
    pub max_length: Option<u32>,
    pub nullable: bool,
    pub default: Option<String>,
    pub allowed_values: Vec<String>,
}

/// Read access to one database's catalog. One implementation per dialect,
/// chosen once when the schema reader is built.
#[async_trait]
pub trait CatalogDriver: Send + Sync {
    fn dialect(&self) -> Dialect;

    async fn database_name(&self) -> Result<String, GeneratorError>;

    /// Base tables in catalog order.
    async fn list_tables(&self) -> Result<Vec<String>, GeneratorError>;

    /// Columns in native ordinal order.
    async fn columns(&self, table: &str) -> Result<Vec<RawColumn>, GeneratorError>;

    /// Primary key columns in declared key sequence. Empty when the table has no key.
    async fn primary_key(&self, table: &str) -> Result<Vec<String>, GeneratorError>;

    async fn foreign_keys(&self, _table: &str) -> Result<Vec<ForeignKey>, GeneratorError> {
        Err(GeneratorError::UnsupportedDialectFeature {
            feature: "foreign key discovery",
            dialect: self.dialect().name(),
        })
    }

    async fn indexes(&self, _table: &str) -> Result<Vec<IndexInfo>, GeneratorError> {
        Err(GeneratorError::UnsupportedDialectFeature {
            feature: "index discovery",
            dialect: self.dialect().name(),
        })
    }

    async fn table_stats(&self, _table: &str) -> Result<TableStats, GeneratorError> {
        Err(GeneratorError::UnsupportedDialectFeature {
            feature: "table statistics",
            dialect: self.dialect().name(),
        })
    }
}

/// Connection pool for the selected dialect.
#[derive(Clone, Debug)]
pub enum DbPool {
    Postgres(PgPool),
    MySql(MySqlPool),
}

impl DbPool {
    pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, GeneratorError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::Validation("database.url (or DATABASE_URL) is required".into()))?;
        let dialect = Dialect::select(config.dialect, url)?;
        tracing::info!(dialect = dialect.name(), "connecting to database");
        let pool = match dialect {
            Dialect::Postgres => DbPool::Postgres(
                PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await?,
            ),
            Dialect::MySql => DbPool::MySql(
                MySqlPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await?,
            ),
        };
        Ok(pool)
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DbPool::Postgres(_) => Dialect::Postgres,
            DbPool::MySql(_) => Dialect::MySql,
        }
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        match self {
            DbPool::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
            DbPool::MySql(pool) => sqlx::query("SELECT 1").execute(pool).await.map(|_| ()),
        }
    }
}

/// Catalog driver for a connected pool. `schema` is the PostgreSQL schema to read.
pub fn catalog_for(pool: &DbPool, schema: &str) -> Arc<dyn CatalogDriver> {
    match pool {
        DbPool::Postgres(pg) => Arc::new(PostgresCatalog::new(pg.clone(), schema)),
        DbPool::MySql(my) => Arc::new(MySqlCatalog::new(my.clone())),
    }
}
