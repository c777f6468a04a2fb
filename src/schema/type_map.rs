//! Raw catalog type tokens to canonical types, one translation table per dialect.
//!
//! A raw type matches every entry whose pattern is a substring of it; the longest
//! pattern wins, so `timestamp` beats `time` and `interval` beats `int`. Ties go to
//! the earlier entry. Anything unmatched passes through lowercased.

use crate::schema::{CanonicalType, Dialect};

type Entry = (&'static str, CanonicalType);

const POSTGRES: &[Entry] = &[
    ("timestamp", CanonicalType::DateTime),
    ("interval", CanonicalType::String),
    ("smallint", CanonicalType::Integer),
    ("bigint", CanonicalType::Integer),
    ("integer", CanonicalType::Integer),
    ("serial", CanonicalType::Integer),
    ("int", CanonicalType::Integer),
    ("point", CanonicalType::String),
    ("double precision", CanonicalType::Decimal),
    ("numeric", CanonicalType::Decimal),
    ("decimal", CanonicalType::Decimal),
    ("money", CanonicalType::Decimal),
    ("real", CanonicalType::Decimal),
    ("boolean", CanonicalType::Boolean),
    ("bool", CanonicalType::Boolean),
    ("character varying", CanonicalType::String),
    ("varchar", CanonicalType::String),
    ("character", CanonicalType::String),
    ("char", CanonicalType::String),
    ("text", CanonicalType::Text),
    ("date", CanonicalType::Date),
    ("time", CanonicalType::Time),
    ("uuid", CanonicalType::Uuid),
    ("jsonb", CanonicalType::Json),
    ("json", CanonicalType::Json),
    ("bytea", CanonicalType::Binary),
];

const MYSQL: &[Entry] = &[
    ("tinyint(1)", CanonicalType::Boolean),
    ("mediumint", CanonicalType::Integer),
    ("smallint", CanonicalType::Integer),
    ("tinyint", CanonicalType::Integer),
    ("bigint", CanonicalType::Integer),
    ("int", CanonicalType::Integer),
    ("year", CanonicalType::Integer),
    ("bit", CanonicalType::Integer),
    ("point", CanonicalType::String),
    ("decimal", CanonicalType::Decimal),
    ("numeric", CanonicalType::Decimal),
    ("double", CanonicalType::Decimal),
    ("float", CanonicalType::Decimal),
    ("boolean", CanonicalType::Boolean),
    ("bool", CanonicalType::Boolean),
    ("varchar", CanonicalType::String),
    ("char", CanonicalType::String),
    ("enum", CanonicalType::String),
    ("set", CanonicalType::String),
    ("text", CanonicalType::Text),
    ("datetime", CanonicalType::DateTime),
    ("timestamp", CanonicalType::DateTime),
    ("date", CanonicalType::Date),
    ("time", CanonicalType::Time),
    ("json", CanonicalType::Json),
    ("varbinary", CanonicalType::Binary),
    ("binary", CanonicalType::Binary),
    ("blob", CanonicalType::Binary),
];

fn table_for(dialect: Dialect) -> &'static [Entry] {
    match dialect {
        Dialect::Postgres => POSTGRES,
        Dialect::MySql => MYSQL,
    }
}

/// Map a raw catalog type to its canonical type. Total and deterministic.
pub fn canonical_type(dialect: Dialect, raw: &str) -> CanonicalType {
    let lower = raw.trim().to_lowercase();
    let mut best: Option<&Entry> = None;
    for entry in table_for(dialect) {
        if lower.contains(entry.0) && best.map_or(true, |b| entry.0.len() > b.0.len()) {
            best = Some(entry);
        }
    }
    match best {
        Some((_, ty)) => ty.clone(),
        None => CanonicalType::Other(lower),
    }
}

/// Extract quoted members from a MySQL `enum('a','b')` column type.
pub fn mysql_enum_values(column_type: &str) -> Vec<String> {
    let lower = column_type.trim_start().to_lowercase();
    if !lower.starts_with("enum(") {
        return Vec::new();
    }
    let inner = column_type
        .trim()
        .get(5..column_type.trim().len().saturating_sub(1))
        .unwrap_or("");
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if in_quote && chars.peek() == Some(&'\'') => {
                current.push('\'');
                chars.next();
            }
            '\'' if in_quote => {
                values.push(std::mem::take(&mut current));
                in_quote = false;
            }
            '\'' => in_quote = true,
            _ if in_quote => current.push(c),
            _ => {}
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_pattern_wins() {
        assert_eq!(
            canonical_type(Dialect::Postgres, "timestamp with time zone"),
            CanonicalType::DateTime
        );
        assert_eq!(
            canonical_type(Dialect::Postgres, "time without time zone"),
            CanonicalType::Time
        );
        assert_eq!(canonical_type(Dialect::Postgres, "interval"), CanonicalType::String);
        assert_eq!(canonical_type(Dialect::MySql, "datetime"), CanonicalType::DateTime);
        assert_eq!(canonical_type(Dialect::MySql, "tinyint(1)"), CanonicalType::Boolean);
        assert_eq!(canonical_type(Dialect::MySql, "tinyint"), CanonicalType::Integer);
        assert_eq!(canonical_type(Dialect::MySql, "varbinary"), CanonicalType::Binary);
    }

    #[test]
    fn postgres_common_types() {
        let cases = [
            ("integer", CanonicalType::Integer),
            ("bigint", CanonicalType::Integer),
            ("numeric", CanonicalType::Decimal),
            ("double precision", CanonicalType::Decimal),
            ("boolean", CanonicalType::Boolean),
            ("character varying", CanonicalType::String),
            ("text", CanonicalType::Text),
            ("date", CanonicalType::Date),
            ("uuid", CanonicalType::Uuid),
            ("jsonb", CanonicalType::Json),
            ("bytea", CanonicalType::Binary),
        ];
        for (raw, expected) in cases {
            assert_eq!(canonical_type(Dialect::Postgres, raw), expected, "{raw}");
        }
    }

    #[test]
    fn unmapped_types_pass_through_lowercased() {
        assert_eq!(
            canonical_type(Dialect::MySql, "GEOMETRY"),
            CanonicalType::Other("geometry".into())
        );
        assert_eq!(
            canonical_type(Dialect::Postgres, "USER-DEFINED"),
            CanonicalType::Other("user-defined".into())
        );
    }

    #[test]
    fn enum_members() {
        assert_eq!(
            mysql_enum_values("enum('draft','it''s live','archived')"),
            vec!["draft", "it's live", "archived"]
        );
        assert!(mysql_enum_values("varchar(20)").is_empty());
    }
}
