use async_trait::async_trait;
use indoc::indoc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::db::{GraphStore, Params, Record};

use super::errors::ToolError;
use super::registry::Tool;
use super::types::{ParameterKind, ParameterSpec, ToolDescriptor};

pub const INFORMATION_TOOL_NAME: &str = "Information";

/// Default cap on relationship lines per entity
pub const DEFAULT_MAX_RELATIONSHIP_LINES: usize = 25;

/// Entity-name match returning attributes plus immediate neighbours in both directions
const ENTITY_QUERY: &str = indoc! {"
    SELECT n.id AS id, n.label AS label, n.name AS name, n.properties AS properties,
           (SELECT json_group_array(json_object(
                       'type', e.relationship_type, 'direction', 'out',
                       'name', t.name, 'label', t.label))
              FROM edges e JOIN nodes t ON t.id = e.target_id
             WHERE e.source_id = n.id) AS outgoing,
           (SELECT json_group_array(json_object(
                       'type', e.relationship_type, 'direction', 'in',
                       'name', s.name, 'label', s.label))
              FROM edges e JOIN nodes s ON s.id = e.source_id
             WHERE e.target_id = n.id) AS incoming
    FROM nodes n
    WHERE n.name = :name COLLATE NOCASE
    ORDER BY n.label, n.id
"};

/// Canned answer for names with no matching entity
pub fn not_found_message(name: &str) -> String {
    format!("No information found for '{}'.", name)
}

/// The subject of a lookup: a trimmed, non-empty name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    name: String,
}

impl EntityQuery {
    pub fn new(raw: &str) -> Result<Self, ToolError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ToolError::InvalidInput(
                "Entity name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Deserialize)]
struct InformationInput {
    entity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Direction {
    Out,
    In,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
struct RelatedEntity {
    #[serde(rename = "type")]
    relationship_type: String,
    direction: Direction,
    name: String,
    label: String,
}

/// Looks up a movie or person by name and describes its graph neighbourhood
pub struct InformationTool {
    store: Arc<dyn GraphStore>,
    max_relationship_lines: usize,
}

impl InformationTool {
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            max_relationship_lines: DEFAULT_MAX_RELATIONSHIP_LINES,
        }
    }

    pub fn with_max_relationship_lines(mut self, max: usize) -> Self {
        self.max_relationship_lines = max.max(1);
        self
    }

    pub async fn lookup(&self, query: &EntityQuery) -> Result<String, ToolError> {
        let mut params = Params::new();
        params.insert("name".to_string(), json!(query.name()));

        let records = self.store.query(ENTITY_QUERY, &params).await?;
        debug!("Lookup '{}' matched {} entities", query.name(), records.len());

        if records.is_empty() {
            return Ok(not_found_message(query.name()));
        }

        Ok(render_records(&records, self.max_relationship_lines))
    }
}

#[async_trait]
impl Tool for InformationTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            INFORMATION_TOOL_NAME,
            "Use this tool to get information about movies or people in the movie database",
        )
        .with_parameter(ParameterSpec::required(
            "entity",
            ParameterKind::String,
            "The name of the movie or person to search for",
        ))
    }

    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        let input: InformationInput = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        let query = EntityQuery::new(&input.entity)?;
        self.lookup(&query).await
    }
}

/// Render lookup records, one block per matched entity
pub fn render_records(records: &[Record], max_relationship_lines: usize) -> String {
    records
        .iter()
        .map(|record| render_entity(record, max_relationship_lines))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_entity(record: &Record, max_relationship_lines: usize) -> String {
    let label = record
        .get("label")
        .and_then(Value::as_str)
        .unwrap_or("Entity");
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("(unnamed)");

    let mut lines = vec![format!("{}: {}", label, name)];

    let properties = match nested_field(record, "properties") {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if !properties.is_empty() {
        let mut attributes: Vec<(&String, &Value)> = properties.iter().collect();
        attributes.sort_by(|a, b| a.0.cmp(b.0));

        lines.push("Attributes:".to_string());
        for (key, value) in attributes {
            lines.push(format!("- {}: {}", key, display_value(value)));
        }
    }

    let mut related = related_entities(record, "outgoing");
    related.extend(related_entities(record, "incoming"));
    related.sort();

    if !related.is_empty() {
        lines.push("Relationships:".to_string());
        for rel in related.iter().take(max_relationship_lines) {
            let arrow = match rel.direction {
                Direction::Out => "->",
                Direction::In => "<-",
            };
            lines.push(format!(
                "- {} {} {} ({})",
                rel.relationship_type, arrow, rel.name, rel.label
            ));
        }
        if related.len() > max_relationship_lines {
            lines.push(format!(
                "- ... and {} more",
                related.len() - max_relationship_lines
            ));
        }
    }

    lines.join("\n")
}

/// Nested values arrive as JSON text from SQLite, or already structured from other stores
fn nested_field(record: &Record, key: &str) -> Value {
    match record.get(key) {
        Some(Value::String(text)) => serde_json::from_str(text).unwrap_or(Value::Null),
        Some(value) => value.clone(),
        None => Value::Null,
    }
}

fn related_entities(record: &Record, key: &str) -> Vec<RelatedEntity> {
    match nested_field(record, key) {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        // One attribute per line
        Value::String(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        Value::Null => "unknown".to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
