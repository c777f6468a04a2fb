//! Canonical, dialect-independent table model.

use serde::Serialize;
use std::fmt;

/// Dialect-independent column type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalType {
    Integer,
    Decimal,
    Boolean,
    /// Bounded character data; the bound lives in `ColumnDescriptor::max_length`.
    String,
    Text,
    Date,
    Time,
    DateTime,
    Uuid,
    Binary,
    Json,
    /// Unmapped raw type, lowercased.
    Other(String),
}

impl CanonicalType {
    /// JSON schema primitive used in documentation.
    pub fn json_type(&self) -> &'static str {
        match self {
            CanonicalType::Integer => "integer",
            CanonicalType::Decimal => "number",
            CanonicalType::Boolean => "boolean",
            _ => "string",
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, CanonicalType::Date | CanonicalType::Time | CanonicalType::DateTime)
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CanonicalType::Integer => "int",
            CanonicalType::Decimal => "decimal",
            CanonicalType::Boolean => "boolean",
            CanonicalType::String => "string",
            CanonicalType::Text => "text",
            CanonicalType::Date => "date",
            CanonicalType::Time => "time",
            CanonicalType::DateTime => "datetime",
            CanonicalType::Uuid => "uuid",
            CanonicalType::Binary => "binary",
            CanonicalType::Json => "json",
            CanonicalType::Other(raw) => raw.as_str(),
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub canonical_type: CanonicalType,
    /// Type token as reported by the catalog.
    pub raw_type: String,
    /// Type name bound text parameters are cast to (PostgreSQL only).
    pub cast_type: Option<String>,
    pub max_length: Option<u32>,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub default_value: Option<String>,
    /// Members of an enum type, in declaration order.
    pub allowed_values: Vec<String>,
}

impl ColumnDescriptor {
    /// Not nullable and no default: a value must be supplied on create.
    pub fn is_required(&self) -> bool {
        !self.is_primary_key && !self.is_nullable && self.default_value.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Normalized schema snapshot for one table. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Key columns in declared key order. Empty when the catalog reports no key.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableDescriptor {
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Case-insensitive lookup, as used for query-string filters.
    pub fn column_ignore_case(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn non_key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_primary_key)
    }

    /// Both `created_at` and `updated_at` present: maintained automatically.
    pub fn has_timestamps(&self) -> bool {
        self.has_column("created_at") && self.has_column("updated_at")
    }

    /// `deleted_at` present: deletes are soft and reads skip deleted rows.
    pub fn has_soft_delete(&self) -> bool {
        self.has_column("deleted_at")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    /// Access method (btree, hash, ...).
    pub kind: String,
    pub columns: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub row_count: i64,
    pub data_size: i64,
    pub index_size: i64,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}
