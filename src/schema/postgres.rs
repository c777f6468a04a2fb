//! PostgreSQL catalog reads over information_schema and pg_catalog, scoped to one schema.

use crate::error::GeneratorError;
use crate::schema::{CatalogDriver, Dialect, ForeignKey, IndexInfo, RawColumn, TableStats};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;

pub struct PostgresCatalog {
    pool: PgPool,
    schema: String,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool, schema: &str) -> Self {
        PostgresCatalog {
            pool,
            schema: schema.to_string(),
        }
    }

    /// Members of every enum type visible in the schema, keyed by `schema.type`.
    async fn enum_values(&self) -> Result<HashMap<String, Vec<String>>, GeneratorError> {
        let sql = r#"
            SELECT n.nspname::text, t.typname::text, e.enumlabel::text
            FROM pg_type t
            JOIN pg_enum e ON e.enumtypid = t.oid
            JOIN pg_namespace n ON n.oid = t.typnamespace
            ORDER BY n.nspname, t.typname, e.enumsortorder
        "#;
        tracing::debug!(sql = %sql, "catalog query");
        let rows = sqlx::query_as::<_, (String, String, String)>(sql)
            .fetch_all(&self.pool)
            .await?;
        let mut out: HashMap<String, Vec<String>> = HashMap::new();
        for (schema, name, label) in rows {
            out.entry(format!("{}.{}", schema, name)).or_default().push(label);
        }
        Ok(out)
    }
}

#[async_trait]
impl CatalogDriver for PostgresCatalog {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn database_name(&self) -> Result<String, GeneratorError> {
        let name = sqlx::query_scalar::<_, String>("SELECT current_database()::text")
            .fetch_one(&self.pool)
            .await?;
        Ok(name)
    }

    async fn list_tables(&self) -> Result<Vec<String>, GeneratorError> {
        let sql = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;
        tracing::debug!(sql = %sql, schema = %self.schema, "catalog query");
        let tables = sqlx::query_scalar::<_, String>(sql)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;
        Ok(tables)
    }

    async fn columns(&self, table: &str) -> Result<Vec<RawColumn>, GeneratorError> {
        let sql = r#"
            SELECT column_name::text,
                   data_type::text,
                   udt_schema::text,
                   udt_name::text,
                   character_maximum_length::int4,
                   is_nullable::text,
                   column_default::text
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let rows = sqlx::query_as::<
            _,
            (String, String, String, String, Option<i32>, String, Option<String>),
        >(sql)
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        let needs_enums = rows.iter().any(|r| r.1 == "USER-DEFINED");
        let enums = if needs_enums {
            self.enum_values().await?
        } else {
            HashMap::new()
        };

        Ok(rows
            .into_iter()
            .map(|(name, data_type, udt_schema, udt_name, max_len, nullable, default)| {
                let qualified = format!("{}.{}", udt_schema, udt_name);
                let allowed_values = enums.get(&qualified).cloned().unwrap_or_default();
                let cast_type = if udt_schema == "pg_catalog" {
                    udt_name
                } else {
                    qualified
                };
                RawColumn {
                    name,
                    data_type,
                    cast_type: Some(cast_type),
                    max_length: max_len.and_then(|n| u32::try_from(n).ok()),
                    nullable: nullable.eq_ignore_ascii_case("YES"),
                    default,
                    allowed_values,
                }
            })
            .collect())
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>, GeneratorError> {
        let sql = r#"
            SELECT kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
             AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY kcu.ordinal_position
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let keys = sqlx::query_scalar::<_, String>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, GeneratorError> {
        let sql = r#"
            SELECT kcu.column_name::text, ccu.table_name::text, ccu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
              ON tc.constraint_name = kcu.constraint_name
             AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage ccu
              ON ccu.constraint_name = tc.constraint_name
             AND ccu.table_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY kcu.ordinal_position
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let rows = sqlx::query_as::<_, (String, String, String)>(sql)
            .bind(&self.schema)
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
            SELECT i.relname::text, ix.indisunique, am.amname::text, a.attname::text
            FROM pg_class t
            JOIN pg_namespace n ON n.oid = t.relnamespace
            JOIN pg_index ix ON ix.indrelid = t.oid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_am am ON am.oid = i.relam
            JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord) ON true
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE n.nspname = $1 AND t.relname = $2
            ORDER BY i.relname, k.ord
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let rows = sqlx::query_as::<_, (String, bool, String, String)>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        let mut out: Vec<IndexInfo> = Vec::new();
        for (name, unique, kind, column) in rows {
            match out.last_mut() {
                Some(last) if last.name == name => last.columns.push(column),
                _ => out.push(IndexInfo {
                    name,
                    unique,
                    kind,
                    columns: vec![column],
                }),
            }
        }
        Ok(out)
    }

    async fn table_stats(&self, table: &str) -> Result<TableStats, GeneratorError> {
        let sql = r#"
            SELECT pg_relation_size(c.oid)::int8, pg_indexes_size(c.oid)::int8
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
        "#;
        tracing::debug!(sql = %sql, table = %table, "catalog query");
        let sizes = sqlx::query_as::<_, (i64, i64)>(sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_optional(&self.pool)
            .await?;
        let count_sql = format!(
            "SELECT COUNT(*) FROM {}",
            crate::sql::qualified_table(Dialect::Postgres, Some(&self.schema), table)
        );
        let row_count = sqlx::query_scalar::<_, i64>(&count_sql)
            .fetch_one(&self.pool)
            .await?;
        let (data_size, index_size) = sizes.unwrap_or((0, 0));
        Ok(TableStats {
            row_count,
            data_size,
            index_size,
            created_at: None,
            updated_at: None,
        })
    }
}
