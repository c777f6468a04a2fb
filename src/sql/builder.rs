//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for one table and dialect.
//!
//! Identifiers only ever come from the catalog; values are always bound. Rows are
//! produced as JSON by the database (`to_json` / `JSON_OBJECT`) so no per-type decoding
//! is needed on our side.

use crate::schema::{ColumnDescriptor, Dialect, TableDescriptor};
use serde_json::Value;

/// Quote an identifier for the dialect.
pub fn quoted(dialect: Dialect, s: &str) -> String {
    match dialect {
        Dialect::Postgres => format!("\"{}\"", s.replace('"', "\"\"")),
        Dialect::MySql => format!("`{}`", s.replace('`', "``")),
    }
}

/// Table reference, schema-qualified when a schema is given.
pub fn qualified_table(dialect: Dialect, schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) if !schema.is_empty() => {
            format!("{}.{}", quoted(dialect, schema), quoted(dialect, table))
        }
        _ => quoted(dialect, table),
    }
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// One column/value pair supplied by the caller (key segment, filter or body field).
pub type Binding<'a> = (&'a ColumnDescriptor, Value);

/// Query context for one table: dialect, projection and row scoping.
pub struct TableQuery<'a> {
    dialect: Dialect,
    schema: Option<&'a str>,
    table: &'a TableDescriptor,
    projection: Vec<&'a ColumnDescriptor>,
    tenant: Vec<(&'a ColumnDescriptor, String)>,
}

impl<'a> TableQuery<'a> {
    pub fn new(dialect: Dialect, schema: Option<&'a str>, table: &'a TableDescriptor) -> Self {
        TableQuery {
            dialect,
            schema,
            table,
            projection: table.columns.iter().collect(),
            tenant: Vec::new(),
        }
    }

    /// Restrict returned columns. Unknown names are ignored; an empty result keeps all columns.
    pub fn visible(mut self, columns: Option<&[String]>) -> Self {
        if let Some(names) = columns {
            let picked: Vec<&ColumnDescriptor> = self
                .table
                .columns
                .iter()
                .filter(|c| names.iter().any(|n| n == &c.name))
                .collect();
            if !picked.is_empty() {
                self.projection = picked;
            }
        }
        self
    }

    /// Tenant predicates. Columns the table lacks are skipped.
    pub fn tenant(mut self, bindings: &[(String, String)]) -> Self {
        self.tenant = bindings
            .iter()
            .filter_map(|(col, value)| self.table.column(col).map(|c| (c, value.clone())))
            .collect();
        self
    }

    fn q(&self, ident: &str) -> String {
        quoted(self.dialect, ident)
    }

    fn table_ref(&self) -> String {
        qualified_table(self.dialect, self.schema, &self.table.name)
    }

    fn placeholder(&self, q: &mut QueryBuf, column: &ColumnDescriptor, v: Value) -> String {
        let n = q.push_param(v);
        match self.dialect {
            Dialect::Postgres => match column.cast_type.as_deref() {
                Some(t) => format!("${}::{}", n, t),
                None => format!("${}", n),
            },
            Dialect::MySql => "?".to_string(),
        }
    }

    /// Row as a JSON object over the projected columns.
    fn json_row(&self, source: &str) -> String {
        match self.dialect {
            Dialect::Postgres => format!("to_json({})", source),
            Dialect::MySql => {
                let pairs: Vec<String> = self
                    .projection
                    .iter()
                    .map(|c| format!("'{}', {}", c.name.replace('\'', "''"), self.q(&c.name)))
                    .collect();
                format!("JSON_OBJECT({})", pairs.join(", "))
            }
        }
    }

    fn projection_list(&self) -> String {
        self.projection
            .iter()
            .map(|c| self.q(&c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn order_by(&self) -> String {
        if self.table.primary_key.is_empty() {
            return String::new();
        }
        let keys: Vec<String> = self.table.primary_key.iter().map(|k| self.q(k)).collect();
        format!(" ORDER BY {}", keys.join(", "))
    }

    /// WHERE clause: caller predicates, then tenant scoping, then soft-delete filter.
    fn where_clause(&self, q: &mut QueryBuf, bindings: &[Binding<'_>]) -> String {
        let mut parts = Vec::new();
        for (column, value) in bindings {
            let ph = self.placeholder(q, column, value.clone());
            parts.push(format!("{} = {}", self.q(&column.name), ph));
        }
        for (column, value) in &self.tenant {
            let ph = self.placeholder(q, column, Value::String(value.clone()));
            parts.push(format!("{} = {}", self.q(&column.name), ph));
        }
        if self.table.has_soft_delete() {
            parts.push(format!("{} IS NULL", self.q("deleted_at")));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }

    fn select_rows(&self, bindings: &[Binding<'_>], tail: &str) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_clause(&mut q, bindings);
        q.sql = match self.dialect {
            Dialect::Postgres => format!(
                "SELECT {} FROM (SELECT {} FROM {}{}{}) t",
                self.json_row("t"),
                self.projection_list(),
                self.table_ref(),
                where_clause,
                tail
            ),
            Dialect::MySql => format!(
                "SELECT {} FROM {}{}{}",
                self.json_row(""),
                self.table_ref(),
                where_clause,
                tail
            ),
        };
        q
    }

    /// One page of rows matching the exact-match filters, ordered by primary key.
    pub fn select_page(&self, filters: &[Binding<'_>], limit: u32, offset: u64) -> QueryBuf {
        let tail = format!("{} LIMIT {} OFFSET {}", self.order_by(), limit, offset);
        self.select_rows(filters, &tail)
    }

    pub fn count(&self, filters: &[Binding<'_>]) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_clause(&mut q, filters);
        q.sql = format!("SELECT COUNT(*) FROM {}{}", self.table_ref(), where_clause);
        q
    }

    pub fn select_by_key(&self, keys: &[Binding<'_>]) -> QueryBuf {
        self.select_rows(keys, "")
    }

    /// Existence check honoring tenant and soft-delete scoping.
    pub fn exists_by_key(&self, keys: &[Binding<'_>]) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_clause(&mut q, keys);
        q.sql = format!("SELECT 1 FROM {}{}", self.table_ref(), where_clause);
        q
    }

    /// INSERT with tenant values and `created_at` / `updated_at` filled in when absent.
    /// PostgreSQL returns the inserted row as JSON; MySQL returns nothing.
    pub fn insert(&self, values: &[Binding<'_>]) -> QueryBuf {
        let mut q = QueryBuf::new();
        let mut cols = Vec::new();
        let mut exprs = Vec::new();
        for (column, value) in values {
            cols.push(self.q(&column.name));
            exprs.push(self.placeholder(&mut q, column, value.clone()));
        }
        let provided = |name: &str| values.iter().any(|(c, _)| c.name == name);
        for (column, value) in &self.tenant {
            if !provided(&column.name) {
                cols.push(self.q(&column.name));
                exprs.push(self.placeholder(&mut q, column, Value::String(value.clone())));
            }
        }
        if self.table.has_timestamps() {
            for stamp in ["created_at", "updated_at"] {
                if !provided(stamp) {
                    cols.push(self.q(stamp));
                    exprs.push("CURRENT_TIMESTAMP".to_string());
                }
            }
        }

        let insert = if cols.is_empty() {
            match self.dialect {
                Dialect::Postgres => format!("INSERT INTO {} DEFAULT VALUES", self.table_ref()),
                Dialect::MySql => format!("INSERT INTO {} () VALUES ()", self.table_ref()),
            }
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table_ref(),
                cols.join(", "),
                exprs.join(", ")
            )
        };
        q.sql = match self.dialect {
            Dialect::Postgres => format!(
                "WITH ins AS ({} RETURNING *) SELECT to_json(ins) FROM ins",
                insert
            ),
            Dialect::MySql => insert,
        };
        q
    }

    /// UPDATE of the given columns on the keyed row. `updated_at` is bumped when present.
    pub fn update_by_key(&self, values: &[Binding<'_>], keys: &[Binding<'_>]) -> QueryBuf {
        let mut q = QueryBuf::new();
        let mut sets = Vec::new();
        for (column, value) in values {
            let ph = self.placeholder(&mut q, column, value.clone());
            sets.push(format!("{} = {}", self.q(&column.name), ph));
        }
        if self.table.has_column("updated_at") && !values.iter().any(|(c, _)| c.name == "updated_at") {
            sets.push(format!("{} = CURRENT_TIMESTAMP", self.q("updated_at")));
        }
        let where_clause = self.where_clause(&mut q, keys);
        q.sql = format!(
            "UPDATE {} SET {}{}",
            self.table_ref(),
            sets.join(", "),
            where_clause
        );
        q
    }

    /// Hard DELETE, or a `deleted_at` stamp on soft-delete tables.
    pub fn delete_by_key(&self, keys: &[Binding<'_>]) -> QueryBuf {
        let mut q = QueryBuf::new();
        let where_clause = self.where_clause(&mut q, keys);
        q.sql = if self.table.has_soft_delete() {
            format!(
                "UPDATE {} SET {} = CURRENT_TIMESTAMP{}",
                self.table_ref(),
                self.q("deleted_at"),
                where_clause
            )
        } else {
            format!("DELETE FROM {}{}", self.table_ref(), where_clause)
        };
        q
    }
}
