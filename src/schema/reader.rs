//! Schema reader: lists included tables and builds canonical table descriptors.

use crate::config::GeneratorConfig;
use crate::error::GeneratorError;
use crate::schema::{
    canonical_type, CanonicalType, CatalogDriver, ColumnDescriptor, Dialect, ForeignKey, IndexInfo,
    TableDescriptor, TableStats,
};
use std::sync::Arc;

/// Include/exclude policy for table listing.
#[derive(Clone, Debug, Default)]
pub struct TablePolicy {
    /// Empty means every catalog table.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl TablePolicy {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        TablePolicy {
            include: config.tables.clone(),
            exclude: config.exclude_tables.clone(),
        }
    }

    /// Keep catalog order; intersect with the include list, then drop excluded names.
    pub fn apply(&self, catalog: Vec<String>) -> Vec<String> {
        catalog
            .into_iter()
            .filter(|t| self.include.is_empty() || self.include.contains(t))
            .filter(|t| !self.exclude.contains(t))
            .collect()
    }
}

const TIMESTAMP_FIELDS: [&str; 4] = ["created_at", "updated_at", "deleted_at", "timestamp"];

pub struct SchemaReader {
    driver: Arc<dyn CatalogDriver>,
}

impl SchemaReader {
    pub fn new(driver: Arc<dyn CatalogDriver>) -> Self {
        SchemaReader { driver }
    }

    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    pub async fn database_name(&self) -> Result<String, GeneratorError> {
        self.driver.database_name().await
    }

    pub async fn list_tables(&self, policy: &TablePolicy) -> Result<Vec<String>, GeneratorError> {
        let catalog = self.driver.list_tables().await?;
        Ok(policy.apply(catalog))
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, GeneratorError> {
        Ok(self.driver.list_tables().await?.iter().any(|t| t == table))
    }

    /// Canonical descriptor for one table. Catalog failures are fatal; foreign keys degrade to empty.
    pub async fn describe_table(&self, table: &str) -> Result<TableDescriptor, GeneratorError> {
        let dialect = self.driver.dialect();
        let raw_columns = self.driver.columns(table).await?;
        if raw_columns.is_empty() {
            return Err(GeneratorError::SchemaUnavailable(format!(
                "table '{}' has no readable columns",
                table
            )));
        }

        let primary_key = match self.driver.primary_key(table).await {
            Ok(keys) => keys,
            Err(GeneratorError::UnsupportedDialectFeature { .. }) => {
                tracing::warn!(table = %table, "primary key discovery unsupported; falling back to 'id'");
                raw_columns
                    .iter()
                    .filter(|c| c.name == "id")
                    .map(|c| c.name.clone())
                    .collect()
            }
            Err(e) => return Err(e),
        };
        if primary_key.is_empty() {
            tracing::warn!(table = %table, "no primary key found in catalog");
        }

        let columns = raw_columns
            .into_iter()
            .map(|raw| {
                let canonical = if raw.allowed_values.is_empty() {
                    canonical_type(dialect, &raw.data_type)
                } else {
                    CanonicalType::String
                };
                ColumnDescriptor {
                    is_primary_key: primary_key.contains(&raw.name),
                    name: raw.name,
                    canonical_type: canonical,
                    raw_type: raw.data_type,
                    cast_type: raw.cast_type,
                    max_length: raw.max_length,
                    is_nullable: raw.nullable,
                    default_value: raw.default,
                    allowed_values: raw.allowed_values,
                }
            })
            .collect();

        let foreign_keys = self.foreign_keys(table).await;

        Ok(TableDescriptor {
            name: table.to_string(),
            columns,
            primary_key,
            foreign_keys,
        })
    }

    /// Descriptors for every included table, in listing order. Any failure aborts.
    pub async fn table_info(&self, policy: &TablePolicy) -> Result<Vec<TableDescriptor>, GeneratorError> {
        let tables = self.list_tables(policy).await?;
        let mut out = Vec::with_capacity(tables.len());
        for table in &tables {
            out.push(self.describe_table(table).await?);
        }
        Ok(out)
    }

    pub async fn foreign_keys(&self, table: &str) -> Vec<ForeignKey> {
        degrade(table, "foreign keys", self.driver.foreign_keys(table).await)
    }

    pub async fn indexes(&self, table: &str) -> Vec<IndexInfo> {
        degrade(table, "indexes", self.driver.indexes(table).await)
    }

    pub async fn table_stats(&self, table: &str) -> TableStats {
        degrade(table, "statistics", self.driver.table_stats(table).await)
    }
}

/// Auxiliary reads never fail the caller: unsupported or failing lookups become empty.
fn degrade<T: Default>(table: &str, what: &str, result: Result<T, GeneratorError>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(table = %table, error = %e, "{} unavailable", what);
            T::default()
        }
    }
}

/// Non-key columns that must be supplied on create.
pub fn required_fields(table: &TableDescriptor) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|c| c.is_required())
        .map(|c| c.name.clone())
        .collect()
}

/// Conventional timestamp columns present on the table.
pub fn timestamp_fields(table: &TableDescriptor) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|c| TIMESTAMP_FIELDS.contains(&c.name.to_lowercase().as_str()))
        .map(|c| c.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_wins_and_order_is_kept() {
        let policy = TablePolicy {
            include: vec!["users".into(), "orders".into(), "migrations".into()],
            exclude: vec!["migrations".into()],
        };
        let catalog = vec![
            "orders".to_string(),
            "migrations".to_string(),
            "audit".to_string(),
            "users".to_string(),
        ];
        assert_eq!(policy.apply(catalog), vec!["orders", "users"]);
    }

    fn column(name: &str, pk: bool, nullable: bool, default: Option<&str>) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            canonical_type: CanonicalType::Text,
            raw_type: "text".into(),
            cast_type: None,
            max_length: None,
            is_primary_key: pk,
            is_nullable: nullable,
            default_value: default.map(String::from),
            allowed_values: vec![],
        }
    }

    #[test]
    fn required_and_timestamp_fields() {
        let table = TableDescriptor {
            name: "posts".into(),
            columns: vec![
                column("id", true, false, None),
                column("title", false, false, None),
                column("slug", false, false, Some("''")),
                column("body", false, true, None),
                column("Created_At", false, true, None),
                column("updated_at", false, false, None),
                column("deleted_at", false, true, None),
            ],
            primary_key: vec!["id".into()],
            foreign_keys: vec![],
        };
        assert_eq!(required_fields(&table), vec!["title", "updated_at"]);
        assert_eq!(timestamp_fields(&table), vec!["Created_At", "updated_at", "deleted_at"]);
    }

    #[test]
    fn empty_include_means_all() {
        let policy = TablePolicy {
            include: vec![],
            exclude: vec!["ci_sessions".into()],
        };
        let catalog = vec!["b".to_string(), "ci_sessions".to_string(), "a".to_string()];
        assert_eq!(policy.apply(catalog), vec!["b", "a"]);
    }
}
