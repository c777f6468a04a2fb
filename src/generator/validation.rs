//! Validation synthesizer: per-column rule lists derived from table metadata plus overrides.

use crate::schema::{CanonicalType, TableDescriptor};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One validation rule. Renders to the familiar pipe-token form (`max_length[50]`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rule {
    Required,
    PermitEmpty,
    Integer,
    Decimal,
    Numeric,
    String,
    MaxLength(usize),
    MinLength(usize),
    /// Optional format in `Y-m-d H:i:s` notation.
    ValidDate(Option<String>),
    ValidEmail,
    ValidUuid,
    InList(Vec<String>),
    RegexMatch(String),
    /// Token we do not evaluate; kept so documentation and caches stay faithful.
    Custom(String),
}

impl Rule {
    /// Parse one token. Unknown tokens become [`Rule::Custom`].
    pub fn parse(token: &str) -> Rule {
        let token = token.trim();
        let (name, arg) = match token.find('[') {
            Some(open) if token.ends_with(']') => (&token[..open], Some(&token[open + 1..token.len() - 1])),
            _ => (token, None),
        };
        match (name, arg) {
            ("required", None) => Rule::Required,
            ("permit_empty", None) => Rule::PermitEmpty,
            ("integer", None) => Rule::Integer,
            ("decimal", None) => Rule::Decimal,
            ("numeric", None) => Rule::Numeric,
            ("string", None) => Rule::String,
            ("valid_date", format) => Rule::ValidDate(
                format.map(str::trim).filter(|f| !f.is_empty()).map(String::from),
            ),
            ("valid_email", None) => Rule::ValidEmail,
            ("valid_uuid", None) => Rule::ValidUuid,
            ("max_length", Some(n)) => match n.trim().parse() {
                Ok(n) => Rule::MaxLength(n),
                Err(_) => Rule::Custom(token.to_string()),
            },
            ("min_length", Some(n)) => match n.trim().parse() {
                Ok(n) => Rule::MinLength(n),
                Err(_) => Rule::Custom(token.to_string()),
            },
            ("in_list", Some(list)) => {
                Rule::InList(list.split(',').map(|v| v.trim().to_string()).collect())
            }
            ("regex_match", Some(pattern)) => Rule::RegexMatch(pattern.to_string()),
            _ => Rule::Custom(token.to_string()),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => f.write_str("required"),
            Rule::PermitEmpty => f.write_str("permit_empty"),
            Rule::Integer => f.write_str("integer"),
            Rule::Decimal => f.write_str("decimal"),
            Rule::Numeric => f.write_str("numeric"),
            Rule::String => f.write_str("string"),
            Rule::MaxLength(n) => write!(f, "max_length[{}]", n),
            Rule::MinLength(n) => write!(f, "min_length[{}]", n),
            Rule::ValidDate(None) => f.write_str("valid_date"),
            Rule::ValidDate(Some(format)) => write!(f, "valid_date[{}]", format),
            Rule::ValidEmail => f.write_str("valid_email"),
            Rule::ValidUuid => f.write_str("valid_uuid"),
            Rule::InList(values) => write!(f, "in_list[{}]", values.join(",")),
            Rule::RegexMatch(p) => write!(f, "regex_match[{}]", p),
            Rule::Custom(raw) => f.write_str(raw),
        }
    }
}

/// Split a rule string on `|`, ignoring pipes inside `[...]` (regex arguments).
fn split_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in input.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '|' if depth == 0 => tokens.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    tokens.push(current);
    tokens
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn parse_rules(input: &str) -> Vec<Rule> {
    split_tokens(input).iter().map(|t| Rule::parse(t)).collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleMode {
    Create,
    Update,
}

/// Rules for one column plus the text they render back to.
#[derive(Clone, Debug, PartialEq, Eq)]
struct ColumnRules {
    column: String,
    rules: Vec<Rule>,
    tokens: Vec<String>,
    /// Configured rule string, rendered as given while no token has been dropped.
    raw: Option<String>,
}

impl ColumnRules {
    fn derived(column: &str, rules: Vec<Rule>) -> Self {
        ColumnRules {
            column: column.to_string(),
            tokens: rules.iter().map(Rule::to_string).collect(),
            rules,
            raw: None,
        }
    }

    fn configured(column: &str, rule_string: &str) -> Self {
        let tokens = split_tokens(rule_string);
        ColumnRules {
            column: column.to_string(),
            rules: tokens.iter().map(|t| Rule::parse(t)).collect(),
            tokens,
            raw: Some(rule_string.to_string()),
        }
    }

    fn render(&self) -> String {
        match &self.raw {
            Some(raw) => raw.clone(),
            None => self.tokens.join("|"),
        }
    }

    fn without_required(&self) -> ColumnRules {
        if !self.rules.contains(&Rule::Required) {
            return self.clone();
        }
        let (rules, tokens) = self
            .rules
            .iter()
            .zip(&self.tokens)
            .filter(|(rule, _)| **rule != Rule::Required)
            .map(|(rule, token)| (rule.clone(), token.clone()))
            .unzip();
        ColumnRules {
            column: self.column.clone(),
            rules,
            tokens,
            raw: None,
        }
    }
}

/// Ordered column -> rules mapping. Columns without rules are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldRuleSet {
    fields: Vec<ColumnRules>,
}

impl FieldRuleSet {
    pub fn get(&self, column: &str) -> Option<&[Rule]> {
        self.fields
            .iter()
            .find(|f| f.column == column)
            .map(|f| f.rules.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.fields.iter().map(|f| (f.column.as_str(), f.rules.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_required(&self, column: &str) -> bool {
        self.get(column).is_some_and(|r| r.contains(&Rule::Required))
    }

    pub fn required_columns(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, rules)| rules.contains(&Rule::Required))
            .map(|(c, _)| c)
            .collect()
    }

    /// Rule string per column. Configured overrides come back exactly as written.
    pub fn render(&self) -> BTreeMap<String, String> {
        self.fields.iter().map(|f| (f.column.clone(), f.render())).collect()
    }

    /// Drop `required` everywhere; columns left with no rules disappear.
    pub fn relaxed(&self) -> FieldRuleSet {
        self.relaxed_where(|_| true)
    }

    /// Drop `required` from the named columns only.
    pub fn relaxed_for(&self, columns: &[String]) -> FieldRuleSet {
        self.relaxed_where(|c| columns.iter().any(|name| name == c))
    }

    fn relaxed_where(&self, pick: impl Fn(&str) -> bool) -> FieldRuleSet {
        FieldRuleSet {
            fields: self
                .fields
                .iter()
                .map(|f| if pick(&f.column) { f.without_required() } else { f.clone() })
                .filter(|f| !f.rules.is_empty())
                .collect(),
        }
    }

    fn set(&mut self, rules: ColumnRules) {
        match self.fields.iter_mut().find(|f| f.column == rules.column) {
            Some(entry) => *entry = rules,
            None => self.fields.push(rules),
        }
    }
}

impl Serialize for FieldRuleSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter().map(|f| (&f.column, f.render())))
    }
}

/// Create and update rules for one table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableRules {
    pub create: FieldRuleSet,
    pub update: FieldRuleSet,
}

/// Rules derived from column metadata only. Primary key columns are never validated.
fn derived_rules(table: &TableDescriptor) -> FieldRuleSet {
    let mut set = FieldRuleSet::default();
    for column in table.non_key_columns() {
        let mut rules = Vec::new();
        if column.is_required() {
            rules.push(Rule::Required);
        }
        if !column.allowed_values.is_empty() {
            rules.push(Rule::InList(column.allowed_values.clone()));
        } else {
            match column.canonical_type {
                CanonicalType::Integer => rules.push(Rule::Integer),
                CanonicalType::Decimal => rules.push(Rule::Decimal),
                CanonicalType::String => match column.max_length {
                    Some(n) if n > 0 => rules.push(Rule::MaxLength(n as usize)),
                    _ => rules.push(Rule::String),
                },
                CanonicalType::Text | CanonicalType::Json => rules.push(Rule::String),
                CanonicalType::Date | CanonicalType::Time | CanonicalType::DateTime => {
                    rules.push(Rule::ValidDate(None))
                }
                CanonicalType::Uuid => rules.push(Rule::ValidUuid),
                CanonicalType::Boolean => {
                    rules.push(Rule::InList(vec!["true".into(), "false".into()]))
                }
                CanonicalType::Binary | CanonicalType::Other(_) => {}
            }
        }
        if !rules.is_empty() {
            set.set(ColumnRules::derived(&column.name, rules));
        }
    }
    set
}

/// Field rules for a table in the given mode. An override replaces the whole derived
/// entry for its column; override columns the table lacks are kept and logged.
pub fn synthesize(
    table: &TableDescriptor,
    overrides: Option<&BTreeMap<String, String>>,
    mode: RuleMode,
) -> FieldRuleSet {
    let mut set = derived_rules(table);
    if let Some(overrides) = overrides {
        for (column, rule_string) in overrides {
            if !table.has_column(column) {
                tracing::warn!(table = %table.name, column = %column, "validation override for unknown column");
            }
            let rules = ColumnRules::configured(column, rule_string);
            for rule in &rules.rules {
                if let Rule::Custom(raw) = rule {
                    tracing::warn!(table = %table.name, column = %column, rule = %raw, "rule is kept but not evaluated");
                }
            }
            set.set(rules);
        }
    }
    match mode {
        RuleMode::Create => set,
        RuleMode::Update => set.relaxed(),
    }
}

pub fn synthesize_table(table: &TableDescriptor, overrides: Option<&BTreeMap<String, String>>) -> TableRules {
    let create = synthesize(table, overrides, RuleMode::Create);
    let update = create.relaxed();
    TableRules { create, update }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;

    fn col(name: &str, ty: CanonicalType, nullable: bool, default: Option<&str>) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            canonical_type: ty,
            raw_type: String::new(),
            cast_type: None,
            max_length: None,
            is_primary_key: false,
            is_nullable: nullable,
            default_value: default.map(String::from),
            allowed_values: vec![],
        }
    }

    fn users() -> TableDescriptor {
        let mut id = col("id", CanonicalType::Integer, false, None);
        id.is_primary_key = true;
        let mut email = col("email", CanonicalType::String, false, None);
        email.max_length = Some(255);
        let mut status = col("status", CanonicalType::String, false, Some("'active'"));
        status.allowed_values = vec!["active".into(), "blocked".into()];
        TableDescriptor {
            name: "users".into(),
            columns: vec![
                id,
                email,
                col("age", CanonicalType::Integer, true, None),
                col("bio", CanonicalType::Text, true, None),
                col("verified", CanonicalType::Boolean, false, Some("false")),
                col("born_on", CanonicalType::Date, true, None),
                status,
                col("avatar", CanonicalType::Binary, true, None),
            ],
            primary_key: vec!["id".into()],
            foreign_keys: vec![],
        }
    }

    #[test]
    fn derived_create_rules() {
        let rules = synthesize(&users(), None, RuleMode::Create).render();
        assert!(!rules.contains_key("id"));
        assert!(!rules.contains_key("avatar"));
        assert_eq!(rules["email"], "required|max_length[255]");
        assert_eq!(rules["age"], "integer");
        assert_eq!(rules["bio"], "string");
        assert_eq!(rules["verified"], "in_list[true,false]");
        assert_eq!(rules["born_on"], "valid_date");
        assert_eq!(rules["status"], "in_list[active,blocked]");
    }

    #[test]
    fn update_rules_never_require() {
        let update = synthesize(&users(), None, RuleMode::Update);
        assert!(update.required_columns().is_empty());
        assert_eq!(update.get("email"), Some(&[Rule::MaxLength(255)][..]));
    }

    #[test]
    fn override_replaces_whole_entry() {
        let mut overrides = BTreeMap::new();
        overrides.insert("email".to_string(), "required|valid_email".to_string());
        overrides.insert("nickname".to_string(), "permit_empty|min_length[2]".to_string());
        let rules = synthesize(&users(), Some(&overrides), RuleMode::Create);
        assert_eq!(rules.get("email"), Some(&[Rule::Required, Rule::ValidEmail][..]));
        assert_eq!(
            rules.get("nickname"),
            Some(&[Rule::PermitEmpty, Rule::MinLength(2)][..])
        );
    }

    #[test]
    fn override_reduced_to_required_disappears_on_update() {
        let mut overrides = BTreeMap::new();
        overrides.insert("email".to_string(), "required".to_string());
        let table = synthesize_table(&users(), Some(&overrides));
        assert!(table.create.is_required("email"));
        assert!(table.update.get("email").is_none());
    }

    #[test]
    fn configured_rule_strings_render_as_written() {
        let mut overrides = BTreeMap::new();
        overrides.insert("status".to_string(), "required|in_list[active, blocked]".to_string());
        overrides.insert("born_on".to_string(), "permit_empty|valid_date[d/m/Y]".to_string());
        let table = synthesize_table(&users(), Some(&overrides));

        let create = table.create.render();
        assert_eq!(create["status"], "required|in_list[active, blocked]");
        assert_eq!(create["born_on"], "permit_empty|valid_date[d/m/Y]");
        assert_eq!(
            table.create.get("born_on"),
            Some(&[Rule::PermitEmpty, Rule::ValidDate(Some("d/m/Y".into()))][..])
        );

        // Dropping `required` keeps the remaining tokens' text.
        let update = table.update.render();
        assert_eq!(update["status"], "in_list[active, blocked]");
        assert_eq!(update["born_on"], "permit_empty|valid_date[d/m/Y]");
    }

    #[test]
    fn relaxing_named_columns_leaves_others_required() {
        let mut overrides = BTreeMap::new();
        overrides.insert("bio".to_string(), "required".to_string());
        let create = synthesize(&users(), Some(&overrides), RuleMode::Create);
        assert!(create.is_required("bio"));

        let relaxed = create.relaxed_for(&["bio".to_string()]);
        assert!(relaxed.get("bio").is_none());
        assert!(relaxed.is_required("email"));
        assert_eq!(relaxed.render()["email"], "required|max_length[255]");
    }

    #[test]
    fn pipes_inside_brackets_do_not_split() {
        let rules = parse_rules("required|regex_match[/^(a|b)$/]|max_length[3]");
        assert_eq!(
            rules,
            vec![
                Rule::Required,
                Rule::RegexMatch("/^(a|b)$/".into()),
                Rule::MaxLength(3)
            ]
        );
        assert_eq!(parse_rules("is_unique[users.email]"), vec![Rule::Custom("is_unique[users.email]".into())]);
    }
}
