//! OpenAPI 3.0 document derived from the route set and table descriptors.
//!
//! Paths come only from [`RouteSet`]: one path item per distinct path template, one
//! operation per route. Every map is ordered so output is byte-stable.

use crate::case::humanize;
use crate::config::{GeneratorConfig, Operation};
use crate::generator::{HttpMethod, RouteEntry, RouteSet, TableRules};
use crate::schema::{CanonicalType, ColumnDescriptor, TableDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const OPENAPI_VERSION: &str = "3.0.3";
const JSON_MEDIA: &str = "application/json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,
    pub info: Info,
    pub servers: Vec<Server>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    /// path template (relative to the server url) -> lowercase method -> operation
    pub paths: BTreeMap<String, BTreeMap<String, OperationDoc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperationDoc {
    pub tags: Vec<String>,
    pub summary: String,
    #[serde(rename = "operationId")]
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDoc>,
    #[serde(rename = "requestBody", default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyDoc>,
    pub responses: BTreeMap<String, ResponseDoc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterDoc {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub description: String,
    pub schema: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestBodyDoc {
    pub required: bool,
    pub content: BTreeMap<String, MediaTypeDoc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaTypeDoc {
    pub schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseDoc {
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaTypeDoc>,
}

impl OpenApiDocument {
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// (method, path) pairs in document order.
    pub fn operations(&self) -> Vec<(String, String)> {
        self.paths
            .iter()
            .flat_map(|(path, item)| item.keys().map(move |m| (m.to_uppercase(), path.clone())))
            .collect()
    }
}

/// Example value for a column type. Fixed per type so documents are reproducible.
pub fn example_value(column: &ColumnDescriptor) -> Value {
    if let Some(first) = column.allowed_values.first() {
        return Value::String(first.clone());
    }
    match column.canonical_type {
        CanonicalType::Integer => json!(1),
        CanonicalType::Decimal => json!(10.5),
        CanonicalType::Boolean => json!(true),
        CanonicalType::Date => json!("2024-01-01"),
        CanonicalType::Time => json!("12:00:00"),
        CanonicalType::DateTime => json!("2024-01-01 00:00:00"),
        CanonicalType::Uuid => json!("00000000-0000-0000-0000-000000000000"),
        CanonicalType::Json => json!({}),
        _ => json!("sample value"),
    }
}

fn column_schema(column: &ColumnDescriptor) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), json!(column.canonical_type.json_type()));
    match column.canonical_type {
        CanonicalType::Date => {
            schema.insert("format".into(), json!("date"));
        }
        CanonicalType::DateTime => {
            schema.insert("format".into(), json!("date-time"));
        }
        CanonicalType::Uuid => {
            schema.insert("format".into(), json!("uuid"));
        }
        CanonicalType::String => {
            if let Some(n) = column.max_length {
                schema.insert("maxLength".into(), json!(n));
            }
        }
        _ => {}
    }
    if !column.allowed_values.is_empty() {
        schema.insert("enum".into(), json!(column.allowed_values));
    }
    if column.is_nullable {
        schema.insert("nullable".into(), json!(true));
    }
    Value::Object(schema)
}

pub struct DocumentationGenerator<'a> {
    config: &'a GeneratorConfig,
}

impl<'a> DocumentationGenerator<'a> {
    pub fn new(config: &'a GeneratorConfig) -> Self {
        DocumentationGenerator { config }
    }

    fn server_url(&self, routes: &RouteSet) -> String {
        let prefix = routes.prefix();
        match self.config.documentation.server_url.as_deref() {
            Some(base) if !base.is_empty() => {
                if prefix.is_empty() {
                    base.trim_end_matches('/').to_string()
                } else {
                    format!("{}/{}", base.trim_end_matches('/'), prefix)
                }
            }
            _ => format!("/{}", prefix),
        }
    }

    /// Document for exactly the routes in `routes`. Tables missing from `tables` still get
    /// their paths, with empty body schemas.
    pub fn generate(
        &self,
        routes: &RouteSet,
        tables: &[TableDescriptor],
        rules: &BTreeMap<String, TableRules>,
    ) -> OpenApiDocument {
        let doc_config = &self.config.documentation;
        let mut paths: BTreeMap<String, BTreeMap<String, OperationDoc>> = BTreeMap::new();
        let mut tags: Vec<Tag> = Vec::new();

        for entry in routes.entries() {
            let table = tables.iter().find(|t| t.name == entry.table);
            let tag = humanize(&entry.table);
            if !tags.iter().any(|t| t.name == tag) {
                tags.push(Tag {
                    description: format!("Operations on the {} table", entry.table),
                    name: tag.clone(),
                });
            }
            let op = self.operation(entry, table, rules.get(&entry.table), tag);
            paths
                .entry(entry.relative_template())
                .or_default()
                .insert(entry.method.as_str().to_lowercase(), op);
        }

        OpenApiDocument {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info {
                title: doc_config.title.clone(),
                version: doc_config.version.clone(),
                description: "Automatically generated REST API documentation".to_string(),
            },
            servers: vec![Server {
                url: self.server_url(routes),
                description: "API Server".to_string(),
            }],
            tags,
            paths,
        }
    }

    fn operation(
        &self,
        entry: &RouteEntry,
        table: Option<&TableDescriptor>,
        rules: Option<&TableRules>,
        tag: String,
    ) -> OperationDoc {
        let keys = entry.key_param_names();
        let by_keys = if keys.is_empty() {
            String::new()
        } else {
            format!(" by {}", keys.join(", "))
        };
        let summary = match entry.operation {
            Operation::Index => format!("List {}", tag),
            Operation::Show => format!("Retrieve {}{}", tag, by_keys),
            Operation::Create => format!("Create new {}", tag),
            Operation::Update => format!("Update {}{}", tag, by_keys),
            Operation::Delete => format!("Delete {}{}", tag, by_keys),
        };

        let mut parameters: Vec<ParameterDoc> = keys
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let column = table.and_then(|t| entry.key_columns.get(i).and_then(|k| t.column(k)));
                let schema = match column {
                    Some(c) => json!({ "type": c.canonical_type.json_type() }),
                    None => json!({ "type": "string" }),
                };
                ParameterDoc {
                    name: name.clone(),
                    location: "path".into(),
                    required: true,
                    description: if keys.len() > 1 {
                        format!("Primary key part: {}", name)
                    } else {
                        format!("Primary key: {}", name)
                    },
                    schema,
                }
            })
            .collect();
        if entry.operation == Operation::Index {
            let pagination = &self.config.pagination;
            parameters.push(ParameterDoc {
                name: "page".into(),
                location: "query".into(),
                required: false,
                description: "Page number, starting at 1".into(),
                schema: json!({ "type": "integer", "minimum": 1, "default": 1 }),
            });
            parameters.push(ParameterDoc {
                name: "per_page".into(),
                location: "query".into(),
                required: false,
                description: format!("Rows per page, at most {}", pagination.max_per_page),
                schema: json!({
                    "type": "integer",
                    "minimum": 1,
                    "maximum": pagination.max_per_page,
                    "default": pagination.per_page,
                }),
            });
        }

        let request_body = match entry.operation {
            Operation::Create | Operation::Update => Some(self.request_body(entry, table, rules)),
            _ => None,
        };

        OperationDoc {
            tags: vec![tag],
            summary,
            operation_id: format!("{}_{}", entry.operation, entry.table),
            parameters,
            request_body,
            responses: self.responses(entry, table),
        }
    }

    fn request_body(
        &self,
        entry: &RouteEntry,
        table: Option<&TableDescriptor>,
        rules: Option<&TableRules>,
    ) -> RequestBodyDoc {
        let mut properties = Map::new();
        let mut example = Map::new();
        let mut required = Vec::new();
        if let Some(table) = table {
            for column in table.non_key_columns() {
                properties.insert(column.name.clone(), column_schema(column));
                example.insert(column.name.clone(), example_value(column));
                // Update bodies document the same required set as create.
                if rules.is_some_and(|r| r.create.is_required(&column.name)) {
                    required.push(column.name.clone());
                }
            }
        }
        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        let mut content = BTreeMap::new();
        content.insert(
            JSON_MEDIA.to_string(),
            MediaTypeDoc {
                schema: Value::Object(schema),
                example: Some(Value::Object(example)),
            },
        );
        RequestBodyDoc {
            required: entry.operation == Operation::Create,
            content,
        }
    }

    fn record_example(&self, entry: &RouteEntry, table: Option<&TableDescriptor>) -> Value {
        let mut record = Map::new();
        if let Some(table) = table {
            let visible = self.config.visible_columns_for(&table.name);
            for column in &table.columns {
                if visible.is_some_and(|v| !v.contains(&column.name)) {
                    continue;
                }
                record.insert(column.name.clone(), example_value(column));
            }
        } else {
            for key in &entry.key_columns {
                record.insert(key.clone(), json!(1));
            }
        }
        Value::Object(record)
    }

    fn responses(&self, entry: &RouteEntry, table: Option<&TableDescriptor>) -> BTreeMap<String, ResponseDoc> {
        let record = self.record_example(entry, table);
        let (code, description, body) = match entry.operation {
            Operation::Index => (
                "200",
                "Paginated list of records",
                json!({
                    "status": "success",
                    "data": [record],
                    "pagination": {
                        "current_page": 1,
                        "per_page": self.config.pagination.per_page,
                        "total": 1,
                        "last_page": 1,
                    },
                }),
            ),
            Operation::Show => ("200", "Record found", json!({ "status": "success", "data": record })),
            Operation::Create => (
                "201",
                "Record created",
                json!({
                    "status": "success",
                    "message": "Record created successfully",
                    "id": created_id_example(entry, &record),
                }),
            ),
            Operation::Update => (
                "200",
                "Record updated",
                json!({ "status": "success", "message": "Record updated successfully" }),
            ),
            Operation::Delete => (
                "200",
                "Record deleted",
                json!({ "status": "success", "message": "Record deleted successfully" }),
            ),
        };

        let mut responses = BTreeMap::new();
        let mut content = BTreeMap::new();
        content.insert(
            JSON_MEDIA.to_string(),
            MediaTypeDoc {
                schema: json!({ "type": "object" }),
                example: Some(body),
            },
        );
        responses.insert(
            code.to_string(),
            ResponseDoc {
                description: description.to_string(),
                content,
            },
        );
        if matches!(entry.operation, Operation::Create | Operation::Update) {
            responses.extend([error_response("400", "Validation failed")]);
        }
        if entry.method != HttpMethod::Post && entry.operation != Operation::Index {
            responses.extend([error_response("404", "Record not found")]);
        }
        responses
    }
}

/// Scalar id for single keys, key object for composite keys.
fn created_id_example(entry: &RouteEntry, record: &Value) -> Value {
    match entry.key_columns.len() {
        0 | 1 => json!(1),
        _ => {
            let mut id = Map::new();
            for key in &entry.key_columns {
                id.insert(key.clone(), record.get(key).cloned().unwrap_or(json!(1)));
            }
            Value::Object(id)
        }
    }
}

fn error_response(code: &str, description: &str) -> (String, ResponseDoc) {
    (
        code.to_string(),
        ResponseDoc {
            description: description.to_string(),
            content: BTreeMap::new(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{synthesize_table, RouteBuilder};

    fn column(name: &str, ty: CanonicalType, pk: bool, nullable: bool) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.into(),
            canonical_type: ty,
            raw_type: String::new(),
            cast_type: None,
            max_length: None,
            is_primary_key: pk,
            is_nullable: nullable,
            default_value: None,
            allowed_values: vec![],
        }
    }

    fn order_lines() -> TableDescriptor {
        TableDescriptor {
            name: "order_lines".into(),
            columns: vec![
                column("order_id", CanonicalType::Integer, true, false),
                column("line_no", CanonicalType::Integer, true, false),
                column("sku", CanonicalType::String, false, false),
                column("price", CanonicalType::Decimal, false, true),
            ],
            primary_key: vec!["order_id".into(), "line_no".into()],
            foreign_keys: vec![],
        }
    }

    fn build(config: &GeneratorConfig, tables: &[TableDescriptor]) -> OpenApiDocument {
        let routes = RouteBuilder::new(config).build(tables).unwrap();
        let rules = tables
            .iter()
            .map(|t| (t.name.clone(), synthesize_table(t, None)))
            .collect();
        DocumentationGenerator::new(config).generate(&routes, tables, &rules)
    }

    #[test]
    fn composite_key_parameters_follow_key_order() {
        let config = GeneratorConfig::default();
        let doc = build(&config, &[order_lines()]);
        let item = &doc.paths["/order-lines/{order_id}/{line_no}"];
        let show = &item["get"];
        let names: Vec<&str> = show.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "line_no"]);
        assert_eq!(show.summary, "Retrieve Order Lines by order_id, line_no");
        assert_eq!(item.len(), 3);
        assert_eq!(doc.servers[0].url, "/api/v1");
    }

    #[test]
    fn create_body_lists_required_columns() {
        let config = GeneratorConfig::default();
        let doc = build(&config, &[order_lines()]);
        let create = &doc.paths["/order-lines"]["post"];
        let body = create.request_body.as_ref().unwrap();
        let schema = &body.content[JSON_MEDIA].schema;
        assert_eq!(schema["required"], json!(["sku"]));
        assert!(schema["properties"].get("order_id").is_none());
        assert_eq!(body.content[JSON_MEDIA].example, Some(json!({"sku": "sample value", "price": 10.5})));
        assert!(create.responses.contains_key("201"));
        let update = &doc.paths["/order-lines/{order_id}/{line_no}"]["put"];
        let update_schema = &update.request_body.as_ref().unwrap().content[JSON_MEDIA].schema;
        assert_eq!(update_schema["required"], json!(["sku"]));
    }

    #[test]
    fn validation_and_missing_record_responses_are_listed() {
        let config = GeneratorConfig::default();
        let doc = build(&config, &[order_lines()]);
        let create = &doc.paths["/order-lines"]["post"].responses;
        assert_eq!(create.keys().collect::<Vec<_>>(), vec!["201", "400"]);
        let update = &doc.paths["/order-lines/{order_id}/{line_no}"]["put"].responses;
        assert_eq!(update.keys().collect::<Vec<_>>(), vec!["200", "400", "404"]);
        let index = &doc.paths["/order-lines"]["get"].responses;
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["200"]);
        assert_eq!(update["404"].description, "Record not found");
    }

    #[test]
    fn empty_route_set_gives_empty_paths() {
        let config = GeneratorConfig::default();
        let doc = build(&config, &[]);
        assert!(doc.paths.is_empty());
        assert_eq!(doc.openapi, "3.0.3");
    }

    #[test]
    fn server_url_joins_base_and_prefix() {
        let mut config = GeneratorConfig::default();
        config.documentation.server_url = Some("https://api.example.test/".into());
        let doc = build(&config, &[order_lines()]);
        assert_eq!(doc.servers[0].url, "https://api.example.test/api/v1");
    }
}
