//! Generic CRUD execution against PostgreSQL or MySQL.

use crate::error::AppError;
use crate::schema::{DbPool, Dialect, TableDescriptor};
use crate::sql::{bind_text, Binding, QueryBuf, TableQuery};
use serde_json::{Map, Value};
use sqlx::{MySql, Postgres};

/// Bind every parameter of a [`QueryBuf`] as nullable text.
macro_rules! bind_all {
    ($query:expr, $buf:expr, $dialect:expr) => {{
        let mut query = $query;
        for p in &$buf.params {
            query = query.bind(bind_text($dialect, p));
        }
        query
    }};
}

/// One page of rows plus the total match count.
#[derive(Debug)]
pub struct Page {
    pub rows: Vec<Value>,
    pub total: u64,
}

pub struct CrudService;

impl CrudService {
    /// Rows matching the filters, `per_page` at a time. `page` starts at 1.
    pub async fn list(
        pool: &DbPool,
        query: &TableQuery<'_>,
        filters: &[Binding<'_>],
        page: u32,
        per_page: u32,
    ) -> Result<Page, AppError> {
        let total = Self::count(pool, &query.count(filters)).await?;
        let offset = u64::from(page.saturating_sub(1)) * u64::from(per_page);
        let rows = Self::fetch_rows(pool, &query.select_page(filters, per_page, offset)).await?;
        Ok(Page { rows, total })
    }

    /// Fetch one row by primary key. Returns JSON object or None.
    pub async fn read(
        pool: &DbPool,
        query: &TableQuery<'_>,
        keys: &[Binding<'_>],
    ) -> Result<Option<Value>, AppError> {
        let rows = Self::fetch_rows(pool, &query.select_by_key(keys)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one row. Returns the new row's id: a scalar for single keys, an object of
    /// key columns for composite keys, `null` for keyless tables.
    pub async fn create(
        pool: &DbPool,
        query: &TableQuery<'_>,
        table: &TableDescriptor,
        values: &[Binding<'_>],
    ) -> Result<Value, AppError> {
        let q = query.insert(values);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let supplied = |name: &str| {
            values
                .iter()
                .find(|(c, _)| c.name == name)
                .map(|(_, v)| v.clone())
        };
        match pool {
            DbPool::Postgres(p) => {
                let row: Value = bind_all!(sqlx::query_scalar::<Postgres, Value>(&q.sql), q, Dialect::Postgres)
                    .fetch_one(p)
                    .await?;
                Ok(key_of(table, |name| row.get(name).cloned()))
            }
            DbPool::MySql(p) => {
                let done = bind_all!(sqlx::query::<MySql>(&q.sql), q, Dialect::MySql).execute(p).await?;
                let last_id = done.last_insert_id();
                Ok(key_of(table, |name| {
                    supplied(name).or_else(|| {
                        (table.primary_key.len() == 1 && last_id > 0).then(|| Value::from(last_id))
                    })
                }))
            }
        }
    }

    /// Update the keyed row. A row outside the caller's scope is reported as not found.
    pub async fn update(
        pool: &DbPool,
        query: &TableQuery<'_>,
        values: &[Binding<'_>],
        keys: &[Binding<'_>],
    ) -> Result<(), AppError> {
        if !Self::exists(pool, &query.exists_by_key(keys)).await? {
            return Err(AppError::RecordNotFound);
        }
        Self::execute(pool, &query.update_by_key(values, keys)).await?;
        Ok(())
    }

    /// Delete (or soft-delete) the keyed row.
    pub async fn delete(pool: &DbPool, query: &TableQuery<'_>, keys: &[Binding<'_>]) -> Result<(), AppError> {
        let affected = Self::execute(pool, &query.delete_by_key(keys)).await?;
        if affected == 0 {
            return Err(AppError::RecordNotFound);
        }
        Ok(())
    }

    async fn fetch_rows(pool: &DbPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = match pool {
            DbPool::Postgres(p) => {
                bind_all!(sqlx::query_scalar::<Postgres, Value>(&q.sql), q, Dialect::Postgres)
                    .fetch_all(p)
                    .await?
            }
            DbPool::MySql(p) => {
                bind_all!(sqlx::query_scalar::<MySql, Value>(&q.sql), q, Dialect::MySql)
                    .fetch_all(p)
                    .await?
            }
        };
        Ok(rows)
    }

    async fn count(pool: &DbPool, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let n: i64 = match pool {
            DbPool::Postgres(p) => {
                bind_all!(sqlx::query_scalar::<Postgres, i64>(&q.sql), q, Dialect::Postgres)
                    .fetch_one(p)
                    .await?
            }
            DbPool::MySql(p) => {
                bind_all!(sqlx::query_scalar::<MySql, i64>(&q.sql), q, Dialect::MySql)
                    .fetch_one(p)
                    .await?
            }
        };
        Ok(u64::try_from(n).unwrap_or(0))
    }

    async fn exists(pool: &DbPool, q: &QueryBuf) -> Result<bool, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let found = match pool {
            DbPool::Postgres(p) => bind_all!(sqlx::query::<Postgres>(&q.sql), q, Dialect::Postgres)
                .fetch_optional(p)
                .await?
                .is_some(),
            DbPool::MySql(p) => bind_all!(sqlx::query::<MySql>(&q.sql), q, Dialect::MySql)
                .fetch_optional(p)
                .await?
                .is_some(),
        };
        Ok(found)
    }

    async fn execute(pool: &DbPool, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let affected = match pool {
            DbPool::Postgres(p) => bind_all!(sqlx::query::<Postgres>(&q.sql), q, Dialect::Postgres)
                .execute(p)
                .await?
                .rows_affected(),
            DbPool::MySql(p) => bind_all!(sqlx::query::<MySql>(&q.sql), q, Dialect::MySql)
                .execute(p)
                .await?
                .rows_affected(),
        };
        Ok(affected)
    }
}

/// Assemble the created-row id from a per-column lookup.
fn key_of(table: &TableDescriptor, lookup: impl Fn(&str) -> Option<Value>) -> Value {
    match table.primary_key.as_slice() {
        [] => Value::Null,
        [single] => lookup(single).unwrap_or(Value::Null),
        keys => {
            let mut id = Map::new();
            for key in keys {
                id.insert(key.clone(), lookup(key).unwrap_or(Value::Null));
            }
            Value::Object(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(keys: &[&str]) -> TableDescriptor {
        TableDescriptor {
            name: "t".into(),
            columns: vec![],
            primary_key: keys.iter().map(|k| k.to_string()).collect(),
            foreign_keys: vec![],
        }
    }

    #[test]
    fn created_id_shape_follows_key() {
        let row = json!({"order_id": 4, "line_no": 2, "sku": "x"});
        assert_eq!(key_of(&table(&["order_id"]), |n| row.get(n).cloned()), json!(4));
        assert_eq!(
            key_of(&table(&["order_id", "line_no"]), |n| row.get(n).cloned()),
            json!({"order_id": 4, "line_no": 2})
        );
        assert_eq!(key_of(&table(&[]), |n| row.get(n).cloned()), Value::Null);
    }
}
