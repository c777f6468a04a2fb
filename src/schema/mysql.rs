//! MySQL / MariaDB catalog reads over information_schema for the connected database.
//!
//! Catalog columns are cast to CHAR / SIGNED: several information_schema columns come
//! back with binary collations on MySQL 8 and would not decode as text otherwise.

use crate::error::GeneratorError;
use crate::schema::{mysql_enum_values, CatalogDriver, Dialect, ForeignKey, IndexInfo, RawColumn, TableStats};
use async_trait::async_trait;
use sqlx::MySqlPool;

pub struct MySqlCatalog {
    pool: MySqlPool,
}

impl MySqlCatalog {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlCatalog { pool }
    }
}

#[async_trait]
impl CatalogDriver for MySqlCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    async fn database_name(&self) -> Result<String, GeneratorError> {
        let name = sqlx::query_scalar::<_, Option<String>>("SELECT CAST(DATABASE() AS CHAR)")
            .fetch_one(&self.pool)
            .await?;
        name.ok_or_else(|| GeneratorError::SchemaUnavailable("no database selected".into()))
    }

    async fn list_tables(&self) -> Result<Vec<String>, GeneratorError> {
        let sql = r#"
            SELECT CAST(TABLE_NAME AS CHAR)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;
        tracing::debug!(sql = %sql, "catalog query");
        let tables = sqlx::query_scalar::<_, String>(sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(tables)
    }

    async fn columns(&self, table: &str) -> Result<Vec<RawColumn>, GeneratorError> {
        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR),
                   CAST(DATA_TYPE AS CHAR),
                   CAST(COLUMN_TYPE AS CHAR),
                   CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED),
                   CAST(IS_NULLABLE AS CHAR),
                   CAST(COLUMN_DEFAULT AS CHAR)
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let rows = sqlx::query_as::<_, (String, String, String, Option<i64>, String, Option<String>)>(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(name, data_type, column_type, max_len, nullable, default)| {
                let data_type = if column_type.eq_ignore_ascii_case("tinyint(1)") {
                    "tinyint(1)".to_string()
                } else {
                    data_type
                };
                RawColumn {
                    name,
                    data_type,
                    cast_type: None,
                    max_length: max_len.and_then(|n| u32::try_from(n).ok()),
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                    default,
                    allowed_values: mysql_enum_values(&column_type),
                }
            })
            .collect())
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, GeneratorError> {
        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR)
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE()
              AND TABLE_NAME = ?
              AND CONSTRAINT_NAME = 'PRIMARY'
            ORDER BY ORDINAL_POSITION
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let keys = sqlx::query_scalar::<_, String>(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, GeneratorError> {
        let sql = r#"
            SELECT CAST(COLUMN_NAME AS CHAR),
                   CAST(REFERENCED_TABLE_NAME AS CHAR),
                   CAST(REFERENCED_COLUMN_NAME AS CHAR)
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = DATABASE()
              AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let rows = sqlx::query_as::<_, (String, String, String)>(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(column, referenced_table, referenced_column)| ForeignKey {
                column,
                referenced_table,
                referenced_column,
            })
            .collect())
    }

    async fn indexes(&self, table: &str) -> Result<Vec<IndexInfo>, GeneratorError> {
        let sql = r#"
            SELECT CAST(INDEX_NAME AS CHAR),
                   CAST(NON_UNIQUE AS SIGNED),
                   CAST(INDEX_TYPE AS CHAR),
                   CAST(COLUMN_NAME AS CHAR)
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let rows = sqlx::query_as::<_, (String, i64, String, Option<String>)>(sql)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let mut out: Vec<IndexInfo> = Vec::new();
        for (name, non_unique, kind, column) in rows {
            // Functional key parts have no column name.
            let Some(column) = column else { continue };
            match out.last_mut() {
                Some(last) if last.name == name => last.columns.push(column),
                _ => out.push(IndexInfo {
                    name,
                    unique: non_unique == 0,
                    kind: kind.to_lowercase(),
                    columns: vec![column],
                }),
            }
        }
        Ok(out)
    }

    async fn table_stats(&self, table: &str) -> Result<TableStats, GeneratorError> {
        let sql = r#"
            SELECT CAST(DATA_LENGTH AS SIGNED),
                   CAST(INDEX_LENGTH AS SIGNED),
                   CREATE_TIME,
                   UPDATE_TIME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let meta = sqlx::query_as::<
            _,
            (
                Option<i64>,
                Option<i64>,
                Option<chrono::NaiveDateTime>,
                Option<chrono::NaiveDateTime>,
            ),
        >(sql)
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;
        let count_sql = format!(
            "SELECT COUNT(*) FROM {}",
            crate::sql::qualified_table(Dialect::MySql, None, table)
        );
        let row_count = sqlx::query_scalar::<_, i64>(&count_sql)
            .fetch_one(&self.pool)
            .await?;
        let (data_size, index_size, created_at, updated_at) = meta.unwrap_or_default();
        Ok(TableStats {
            row_count,
            data_size: data_size.unwrap_or(0),
            index_size: index_size.unwrap_or(0),
            created_at,
            updated_at,
        })
    }
}
