//! Translate store errors into user-facing constraint messages.

use crate::error::AppError;
use regex::{Captures, Regex};
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::postgres::PgDatabaseError;
use std::sync::OnceLock;

struct Patterns {
    pg_key: Option<Regex>,
    pg_null_column: Option<Regex>,
    mysql_fk_column: Option<Regex>,
    mysql_duplicate: Option<Regex>,
    mysql_null_column: Option<Regex>,
    pg_invalid_input: Option<Regex>,
    mysql_bad_value_column: Option<Regex>,
}

fn captures<'t>(re: &Option<Regex>, text: &'t str) -> Option<Captures<'t>> {
    re.as_ref().and_then(|re| re.captures(text))
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        // Key (customer_id)=(99) is not present in table "customers".
        pg_key: Regex::new(r"Key \((?P<col>[^)]+)\)=\((?P<val>[^)]*)\)").ok(),
        pg_null_column: Regex::new(r#"column "(?P<col>[^"]+)""#).ok(),
        mysql_fk_column: Regex::new(r"FOREIGN KEY \(`(?P<col>[^`]+)`\)").ok(),
        // Duplicate entry 'a@b.c' for key 'users.email_UNIQUE'
        mysql_duplicate: Regex::new(r"Duplicate entry '(?P<val>[^']*)' for key '(?P<key>[^']+)'").ok(),
        mysql_null_column: Regex::new(r"Column '(?P<col>[^']+)'").ok(),
        // invalid input syntax for type integer: "abc"
        pg_invalid_input: Regex::new(r#"for type (?P<ty>[\w ]+): "(?P<val>[^"]*)""#).ok(),
        // Incorrect integer value: 'abc' for column 'age' at row 1
        mysql_bad_value_column: Regex::new(r"for column '(?P<col>[^']+)'").ok(),
    })
}

/// Map a sqlx error to an [`AppError`]. Constraint failures get a readable message;
/// anything else stays a generic `Database` error whose text is only logged.
pub fn translate_db_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if let Some(message) = constraint_message(db.as_ref()) {
            tracing::debug!(error = %db, "constraint violation");
            return AppError::ConstraintViolation(message);
        }
        if let Some(message) = invalid_input_message(db.code().as_deref(), db.message()) {
            tracing::debug!(error = %db, "rejected input value");
            return AppError::BadRequest(message);
        }
    }
    match e {
        sqlx::Error::RowNotFound => AppError::RecordNotFound,
        other => AppError::Database(other),
    }
}

/// SQLSTATE class 22 (data exception): the client sent a value the column type cannot hold.
fn invalid_input_message(code: Option<&str>, message: &str) -> Option<String> {
    let p = patterns();
    let lowered = message.to_lowercase();
    let mysql_bad_value = lowered.starts_with("incorrect")
        || lowered.starts_with("out of range value")
        || lowered.starts_with("data too long");
    if let Some(c) = captures(&p.mysql_bad_value_column, message).filter(|_| mysql_bad_value) {
        return Some(format!("Invalid value for '{}'.", &c["col"]));
    }
    match code {
        Some("22P02" | "22007" | "22008" | "22003" | "22001") => Some(
            match captures(&p.pg_invalid_input, message) {
                Some(c) => format!("Invalid value '{}' for type {}.", &c["val"], c["ty"].trim()),
                None => "A value has the wrong format for its field.".into(),
            },
        ),
        _ => None,
    }
}

fn constraint_message(db: &dyn DatabaseError) -> Option<String> {
    let message = db.message();
    let lowered = message.to_lowercase();
    let kind = db.kind();
    let pg_detail = db
        .try_downcast_ref::<PgDatabaseError>()
        .and_then(|pg| pg.detail())
        .unwrap_or("");
    let p = patterns();

    let is_fk = matches!(kind, ErrorKind::ForeignKeyViolation) || lowered.contains("foreign key constraint");
    if is_fk {
        if pg_detail.contains("still referenced") {
            return Some("This record cannot be deleted because other records reference it.".into());
        }
        let column = captures(&p.pg_key, pg_detail)
            .and_then(|c| c.name("col"))
            .or_else(|| captures(&p.mysql_fk_column, message).and_then(|c| c.name("col")))
            .map(|m| m.as_str().to_string());
        return Some(match column {
            Some(col) => format!("Invalid value for '{}'. The referenced record does not exist.", col),
            None => "Foreign key constraint violation. Please ensure all referenced records exist.".into(),
        });
    }

    let is_unique = matches!(kind, ErrorKind::UniqueViolation) || lowered.contains("duplicate entry");
    if is_unique {
        if let Some(c) = captures(&p.pg_key, pg_detail) {
            return Some(format!(
                "The value '{}' already exists for '{}'. Please use a unique value.",
                &c["val"], &c["col"]
            ));
        }
        if let Some(c) = captures(&p.mysql_duplicate, message) {
            let key = &c["key"];
            let field = key.rsplit('.').next().unwrap_or(key).replace("_UNIQUE", "");
            return Some(format!(
                "The value '{}' already exists for '{}'. Please use a unique value.",
                &c["val"], field
            ));
        }
        return Some("Duplicate entry error. This value already exists in the database.".into());
    }

    let is_not_null = matches!(kind, ErrorKind::NotNullViolation) || lowered.contains("cannot be null");
    if is_not_null {
        let column = db
            .try_downcast_ref::<PgDatabaseError>()
            .and_then(|pg| pg.column())
            .map(String::from)
            .or_else(|| {
                captures(&p.pg_null_column, message)
                    .or_else(|| captures(&p.mysql_null_column, message))
                    .map(|c| c["col"].to_string())
            });
        return Some(match column {
            Some(col) => format!("The field '{}' is required and cannot be empty.", col),
            None => "Required field is missing or null.".into(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_is_not_found() {
        assert!(matches!(translate_db_error(sqlx::Error::RowNotFound), AppError::RecordNotFound));
    }

    #[test]
    fn other_errors_stay_generic() {
        assert!(matches!(
            translate_db_error(sqlx::Error::PoolTimedOut),
            AppError::Database(_)
        ));
    }

    #[test]
    fn malformed_values_are_client_errors() {
        assert_eq!(
            invalid_input_message(Some("22P02"), r#"invalid input syntax for type integer: "abc""#).as_deref(),
            Some("Invalid value 'abc' for type integer.")
        );
        assert_eq!(
            invalid_input_message(Some("22007"), "date/time field value out of range").as_deref(),
            Some("A value has the wrong format for its field.")
        );
        assert_eq!(
            invalid_input_message(Some("HY000"), "Incorrect integer value: 'abc' for column 'age' at row 1").as_deref(),
            Some("Invalid value for 'age'.")
        );
        assert!(invalid_input_message(Some("42P01"), r#"relation "x" does not exist"#).is_none());
    }

    #[test]
    fn mysql_duplicate_pattern_extracts_field() {
        let c = captures(&patterns().mysql_duplicate, "Duplicate entry 'a@b.c' for key 'users.email_UNIQUE'")
            .unwrap();
        assert_eq!(&c["val"], "a@b.c");
        assert_eq!(&c["key"], "users.email_UNIQUE");
    }

    #[test]
    fn postgres_key_detail_pattern() {
        let c = captures(&patterns().pg_key, "Key (customer_id)=(99) is not present in table \"customers\".")
            .unwrap();
        assert_eq!(&c["col"], "customer_id");
        assert_eq!(&c["val"], "99");
    }
}
