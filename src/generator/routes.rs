//! Route builder: one typed route per (table, enabled operation), keyed by primary-key segments.

use crate::case::table_to_path;
use crate::config::{GeneratorConfig, Operation};
use crate::error::{ConfigError, GeneratorError};
use crate::schema::TableDescriptor;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    pub fn for_operation(op: Operation) -> HttpMethod {
        match op {
            Operation::Index | Operation::Show => HttpMethod::Get,
            Operation::Create => HttpMethod::Post,
            Operation::Update => HttpMethod::Put,
            Operation::Delete => HttpMethod::Delete,
        }
    }

    fn parse(s: &str) -> Option<HttpMethod> {
        match s {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Handler binding for one generated route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub method: HttpMethod,
    pub table: String,
    pub operation: Operation,
    /// Collection path relative to the API prefix, e.g. `/order-lines`.
    pub collection_path: String,
    /// Number of key segments after the collection path.
    pub key_segments: usize,
    /// Primary key columns bound positionally to the key segments.
    #[serde(default)]
    pub key_columns: Vec<String>,
}

impl RouteEntry {
    /// Name of the n-th key placeholder: the bound key column, or `id{n}` when unbound.
    pub fn key_param_name(&self, index: usize) -> String {
        self.key_columns
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("id{}", index + 1))
    }

    pub fn key_param_names(&self) -> Vec<String> {
        (0..self.key_segments).map(|i| self.key_param_name(i)).collect()
    }

    /// Path below the prefix with `{name}` placeholders: `/order-lines/{order_id}/{line_no}`.
    pub fn relative_template(&self) -> String {
        let mut path = self.collection_path.clone();
        for name in self.key_param_names() {
            path.push_str("/{");
            path.push_str(&name);
            path.push('}');
        }
        path
    }
}

/// Route listing row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouteListing {
    pub method: HttpMethod,
    pub path: String,
    pub table: String,
    pub action: &'static str,
}

/// Ordered, deterministic set of generated routes under one prefix.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RouteSet {
    prefix: String,
    entries: Vec<RouteEntry>,
}

impl RouteSet {
    pub fn new(prefix: &str) -> Self {
        RouteSet {
            prefix: prefix.trim_matches('/').to_string(),
            entries: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, table: &str, op: Operation) -> Option<&RouteEntry> {
        self.entries.iter().find(|e| e.table == table && e.operation == op)
    }

    pub fn for_table<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a RouteEntry> + 'a {
        self.entries.iter().filter(move |e| e.table == table)
    }

    /// Full path template including the prefix: `/api/v1/order-lines/{order_id}`.
    pub fn path_template(&self, entry: &RouteEntry) -> String {
        if self.prefix.is_empty() {
            entry.relative_template()
        } else {
            format!("/{}{}", self.prefix, entry.relative_template())
        }
    }

    /// `"{METHOD} {path}"` key used by the route cache.
    pub fn route_key(&self, entry: &RouteEntry) -> String {
        format!("{} {}", entry.method, self.path_template(entry))
    }

    pub fn describe(&self) -> Vec<RouteListing> {
        self.entries
            .iter()
            .map(|e| RouteListing {
                method: e.method,
                path: self.path_template(e),
                table: e.table.clone(),
                action: e.operation.action_label(),
            })
            .collect()
    }

    /// Routes of one table only, same order.
    pub fn filter_table(&self, table: &str) -> RouteSet {
        RouteSet {
            prefix: self.prefix.clone(),
            entries: self.for_table(table).cloned().collect(),
        }
    }

    fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }
}

pub struct RouteBuilder<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> RouteBuilder<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        RouteBuilder { config }
    }

    /// Routes for the given tables in order; operations in canonical order.
    /// A keyed operation on a table without a primary key is an error, never a guessed `id`.
    pub fn build(&self, tables: &[TableDescriptor]) -> Result<RouteSet, GeneratorError> {
        let mut routes = RouteSet::new(&self.config.api_prefix);
        let mut seen_paths: HashMap<String, &str> = HashMap::new();

        for table in tables {
            let collection_path = format!("/{}", table_to_path(&table.name));
            if let Some(other) = seen_paths.insert(collection_path.clone(), &table.name) {
                return Err(ConfigError::DuplicatePathSegment(format!(
                    "{} (tables '{}' and '{}')",
                    collection_path, other, table.name
                ))
                .into());
            }

            let enabled = self.config.endpoints_for(&table.name);
            for op in Operation::ALL {
                if !enabled.contains(&op) {
                    continue;
                }
                let key_columns = if op.is_keyed() {
                    if table.primary_key.is_empty() {
                        return Err(GeneratorError::RouteKeyResolution {
                            table: table.name.clone(),
                            operation: op.to_string(),
                        });
                    }
                    table.primary_key.clone()
                } else {
                    Vec::new()
                };
                routes.push(RouteEntry {
                    method: HttpMethod::for_operation(op),
                    table: table.name.clone(),
                    operation: op,
                    collection_path: collection_path.clone(),
                    key_segments: key_columns.len(),
                    key_columns,
                });
            }
        }
        Ok(routes)
    }
}

/// Serialized as `{ "prefix": ..., "routes": { "GET /api/v1/users": binding, ... } }`, routes in build order.
impl Serialize for RouteSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("prefix", &self.prefix)?;
        map.serialize_entry("routes", &OrderedRoutes(self))?;
        map.end()
    }
}

struct OrderedRoutes<'a>(&'a RouteSet);

impl Serialize for OrderedRoutes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .entries
                .iter()
                .map(|e| (self.0.route_key(e), RouteBinding::from(e))),
        )
    }
}

#[derive(Serialize, Deserialize)]
struct RouteBinding {
    table: String,
    operation: Operation,
    collection_path: String,
    key_segments: usize,
    #[serde(default)]
    key_columns: Vec<String>,
}

impl From<&RouteEntry> for RouteBinding {
    fn from(e: &RouteEntry) -> Self {
        RouteBinding {
            table: e.table.clone(),
            operation: e.operation,
            collection_path: e.collection_path.clone(),
            key_segments: e.key_segments,
            key_columns: e.key_columns.clone(),
        }
    }
}

#[derive(Deserialize)]
struct RouteSetRepr {
    prefix: String,
    routes: OrderedBindings,
}

struct OrderedBindings(Vec<(String, RouteBinding)>);

impl<'de> Deserialize<'de> for OrderedBindings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BindingsVisitor;

        impl<'de> Visitor<'de> for BindingsVisitor {
            type Value = OrderedBindings;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of \"METHOD path\" to route bindings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, binding)) = access.next_entry::<String, RouteBinding>()? {
                    out.push((key, binding));
                }
                Ok(OrderedBindings(out))
            }
        }

        deserializer.deserialize_map(BindingsVisitor)
    }
}

impl<'de> Deserialize<'de> for RouteSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = RouteSetRepr::deserialize(deserializer)?;
        let mut routes = RouteSet::new(&repr.prefix);
        for (key, b) in repr.routes.0 {
            let method = key
                .split_whitespace()
                .next()
                .and_then(HttpMethod::parse)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid route key: {}", key)))?;
            routes.push(RouteEntry {
                method,
                table: b.table,
                operation: b.operation,
                collection_path: b.collection_path,
                key_segments: b.key_segments,
                key_columns: b.key_columns,
            });
        }
        Ok(routes)
    }
}
