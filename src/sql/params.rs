//! Convert serde_json::Value to the text form bound to queries.
//!
//! Every parameter is bound as nullable text. PostgreSQL placeholders carry a cast to the
//! column type; MySQL converts implicitly.

use crate::schema::Dialect;
use serde_json::Value;

pub fn bind_text(dialect: Dialect, v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(b) => Some(match (dialect, b) {
            (Dialect::MySql, true) => "1".into(),
            (Dialect::MySql, false) => "0".into(),
            (Dialect::Postgres, b) => b.to_string(),
        }),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => Some(v.to_string()),
    }
}
