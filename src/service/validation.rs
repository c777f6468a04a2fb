//! Request validation against synthesized field rules.

use crate::error::AppError;
use crate::generator::{FieldRuleSet, Rule};
use crate::schema::{CanonicalType, ColumnDescriptor};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Create: every rule column is checked, present or not.
    pub fn validate(body: &Map<String, Value>, rules: &FieldRuleSet) -> Result<(), AppError> {
        let mut errors = BTreeMap::new();
        for (column, column_rules) in rules.iter() {
            if let Some(message) = check_field(column, body.get(column), column_rules) {
                errors.insert(column.to_string(), message);
            }
        }
        finish(errors)
    }

    /// Update: only fields present in the body are checked.
    pub fn validate_partial(body: &Map<String, Value>, rules: &FieldRuleSet) -> Result<(), AppError> {
        let mut errors = BTreeMap::new();
        for (column, value) in body {
            let Some(column_rules) = rules.get(column) else { continue };
            if let Some(message) = check_field(column, Some(value), column_rules) {
                errors.insert(column.clone(), message);
            }
        }
        finish(errors)
    }

    /// Check a path key segment or filter value against its column's type before it is
    /// bound, so a malformed value is a client error rather than a failed statement.
    pub fn check_param(column: &ColumnDescriptor, raw: &str) -> Result<(), AppError> {
        let value = Value::String(raw.to_string());
        match param_rule(column).and_then(|rule| check_rule(&column.name, &value, &rule)) {
            Some(message) => Err(AppError::BadRequest(message)),
            None => Ok(()),
        }
    }
}

fn param_rule(column: &ColumnDescriptor) -> Option<Rule> {
    if !column.allowed_values.is_empty() {
        return Some(Rule::InList(column.allowed_values.clone()));
    }
    match column.canonical_type {
        CanonicalType::Integer => Some(Rule::Integer),
        CanonicalType::Decimal => Some(Rule::Decimal),
        CanonicalType::Uuid => Some(Rule::ValidUuid),
        CanonicalType::Date | CanonicalType::Time | CanonicalType::DateTime => Some(Rule::ValidDate(None)),
        CanonicalType::Boolean => Some(Rule::InList(
            ["true", "false", "1", "0"].iter().map(|v| v.to_string()).collect(),
        )),
        _ => None,
    }
}

fn finish(errors: BTreeMap<String, String>) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::ValidationFailed(errors))
    }
}

fn is_empty(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Scalar text form used by length, list and pattern checks.
fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First failing rule's message for one field, if any.
fn check_field(field: &str, value: Option<&Value>, rules: &[Rule]) -> Option<String> {
    if is_empty(value) {
        if rules.contains(&Rule::Required) {
            return Some(format!("The {} field is required.", field));
        }
        return None;
    }
    let value = value?;
    rules.iter().find_map(|rule| check_rule(field, value, rule))
}

fn check_rule(field: &str, v: &Value, rule: &Rule) -> Option<String> {
    let text = as_text(v);
    let ok = match rule {
        Rule::Required | Rule::PermitEmpty | Rule::Custom(_) => true,
        Rule::Integer => match v {
            Value::Number(n) => n.is_i64() || n.is_u64(),
            Value::String(s) => s.trim().parse::<i64>().is_ok(),
            _ => false,
        },
        Rule::Decimal | Rule::Numeric => match v {
            Value::Number(_) => true,
            Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
            _ => false,
        },
        // Structured values are stored as JSON text.
        Rule::String => matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_)),
        Rule::MaxLength(n) => text.as_deref().map_or(true, |s| s.chars().count() <= *n),
        Rule::MinLength(n) => text.as_deref().map_or(true, |s| s.chars().count() >= *n),
        Rule::ValidDate(None) => text.as_deref().is_some_and(is_date_like),
        Rule::ValidDate(Some(format)) => text.as_deref().is_some_and(|s| matches_date_format(s, format)),
        Rule::ValidEmail => text.as_deref().is_some_and(is_email),
        Rule::ValidUuid => text.as_deref().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()),
        Rule::InList(allowed) => text.as_deref().is_some_and(|s| allowed.iter().any(|a| a == s)),
        Rule::RegexMatch(pattern) => match compile_pattern(pattern) {
            Some(re) => text.as_deref().is_some_and(|s| re.is_match(s)),
            None => {
                tracing::warn!(field = %field, pattern = %pattern, "invalid regex_match pattern; rule skipped");
                true
            }
        },
    };
    if ok {
        return None;
    }
    Some(match rule {
        Rule::Integer => format!("The {} field must contain an integer.", field),
        Rule::Decimal => format!("The {} field must contain a decimal number.", field),
        Rule::Numeric => format!("The {} field must contain only numbers.", field),
        Rule::String => format!("The {} field must be a valid string.", field),
        Rule::MaxLength(n) => format!("The {} field cannot exceed {} characters in length.", field, n),
        Rule::MinLength(n) => format!("The {} field must be at least {} characters in length.", field, n),
        Rule::ValidDate(_) => format!("The {} field must contain a valid date.", field),
        Rule::ValidEmail => format!("The {} field must contain a valid email address.", field),
        Rule::ValidUuid => format!("The {} field must contain a valid UUID.", field),
        Rule::InList(allowed) => format!("The {} field must be one of: {}.", field, allowed.join(", ")),
        _ => format!("The {} field is not in the correct format.", field),
    })
}

/// `regex_match` takes a delimited pattern (`/^a+$/i`); bare patterns are accepted too.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    let body = match (pattern.chars().next(), pattern.rfind('/')) {
        (Some('/'), Some(end)) if end > 0 => {
            let flags = &pattern[end + 1..];
            let inner = &pattern[1..end];
            if flags.contains('i') {
                format!("(?i){}", inner)
            } else {
                inner.to_string()
            }
        }
        _ => pattern.to_string(),
    };
    Regex::new(&body).ok()
}

fn is_date_like(s: &str) -> bool {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
        || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
}

/// `valid_date[Y-m-d]` style format: each letter stands for one date part.
fn matches_date_format(s: &str, format: &str) -> bool {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    let mut pattern = String::with_capacity(format.len() * 2);
    for c in format.chars() {
        match c {
            'Y' => pattern.push_str("%Y"),
            'y' => pattern.push_str("%y"),
            'm' => pattern.push_str("%m"),
            'd' => pattern.push_str("%d"),
            'H' => pattern.push_str("%H"),
            'i' => pattern.push_str("%M"),
            's' => pattern.push_str("%S"),
            '%' => pattern.push_str("%%"),
            other => pattern.push(other),
        }
    }
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, &pattern).is_ok()
        || NaiveDate::parse_from_str(s, &pattern).is_ok()
        || NaiveTime::parse_from_str(s, &pattern).is_ok()
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else { return false };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(pairs: &[(&str, &str)]) -> FieldRuleSet {
        let mut overrides = BTreeMap::new();
        for (c, r) in pairs {
            overrides.insert(c.to_string(), r.to_string());
        }
        let table = crate::schema::TableDescriptor {
            name: "t".into(),
            columns: vec![],
            primary_key: vec![],
            foreign_keys: vec![],
        };
        crate::generator::synthesize(&table, Some(&overrides), crate::generator::RuleMode::Create)
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_required_field_is_reported() {
        let set = rules(&[("email", "required|valid_email"), ("name", "max_length[5]")]);
        let err = RequestValidator::validate(&body(json!({"name": "abcdefg"})), &set).unwrap_err();
        let AppError::ValidationFailed(fields) = err else { panic!("expected validation error") };
        assert_eq!(fields["email"], "The email field is required.");
        assert_eq!(fields["name"], "The name field cannot exceed 5 characters in length.");
    }

    #[test]
    fn partial_checks_only_present_fields() {
        let set = rules(&[("email", "required|valid_email"), ("age", "integer")]);
        assert!(RequestValidator::validate_partial(&body(json!({"age": "42"})), &set).is_ok());
        assert!(RequestValidator::validate_partial(&body(json!({"age": "4.2"})), &set).is_err());
    }

    #[test]
    fn typed_rules() {
        let set = rules(&[
            ("active", "in_list[true,false]"),
            ("born", "valid_date"),
            ("ref", "valid_uuid"),
            ("code", "regex_match[/^[a-z]+$/]"),
        ]);
        let good = json!({
            "active": true,
            "born": "2024-01-01",
            "ref": "00000000-0000-0000-0000-000000000000",
            "code": "abc",
        });
        assert!(RequestValidator::validate(&body(good), &set).is_ok());
        let bad = json!({"active": "yes", "born": "yesterday", "ref": "x", "code": "ABC"});
        let AppError::ValidationFailed(fields) = RequestValidator::validate(&body(bad), &set).unwrap_err() else {
            panic!("expected validation error")
        };
        assert_eq!(fields.len(), 4);
    }

    #[test]
    fn date_format_argument_is_honored() {
        let set = rules(&[("born", "valid_date[d/m/Y]")]);
        assert!(RequestValidator::validate(&body(json!({"born": "31/01/2024"})), &set).is_ok());
        assert!(RequestValidator::validate(&body(json!({"born": "2024-01-31"})), &set).is_err());
    }

    #[test]
    fn params_are_checked_against_column_type() {
        let column = |ty: CanonicalType| ColumnDescriptor {
            name: "age".into(),
            canonical_type: ty,
            raw_type: String::new(),
            cast_type: None,
            max_length: None,
            is_primary_key: false,
            is_nullable: true,
            default_value: None,
            allowed_values: vec![],
        };
        assert!(RequestValidator::check_param(&column(CanonicalType::Integer), "42").is_ok());
        let err = RequestValidator::check_param(&column(CanonicalType::Integer), "abc").unwrap_err();
        assert_eq!(err.to_string(), "The age field must contain an integer.");
        assert!(RequestValidator::check_param(&column(CanonicalType::Uuid), "nope").is_err());
        assert!(RequestValidator::check_param(&column(CanonicalType::Date), "2024-02-30").is_err());
        assert!(RequestValidator::check_param(&column(CanonicalType::Boolean), "1").is_ok());
        assert!(RequestValidator::check_param(&column(CanonicalType::Text), "anything").is_ok());
    }

    #[test]
    fn permit_empty_and_unknown_rules_pass() {
        let set = rules(&[("nick", "permit_empty|min_length[3]"), ("email", "is_unique[users.email]")]);
        assert!(RequestValidator::validate(&body(json!({"nick": "", "email": "x"})), &set).is_ok());
    }
}
