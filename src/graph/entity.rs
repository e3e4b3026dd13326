use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a node in the property graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: &str) -> Self {
        NodeId(id.to_string())
    }

    /// Build an id scoped by label, e.g. `person:keanu reeves`
    pub fn scoped(label: &str, key: &str) -> Self {
        NodeId(format!(
            "{}:{}",
            label.to_lowercase(),
            key.trim().to_lowercase()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named node in the graph store (a movie, a person, a genre, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub name: String,
    pub properties: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(id: NodeId, label: &str, name: &str) -> Self {
        Self {
            id,
            label: label.to_string(),
            name: name.trim().to_string(),
            properties: BTreeMap::new(),
        }
    }

    /// Attach a property, skipping nulls so absent CSV cells don't become attributes
    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        if !value.is_null() {
            self.properties.insert(key.to_string(), value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scoped_id_is_normalized() {
        let id = NodeId::scoped("Person", "  Keanu Reeves ");
        assert_eq!(id.as_str(), "person:keanu reeves");
    }

    #[test]
    fn test_null_properties_are_skipped() {
        let node = Node::new(NodeId::new("movie:1"), "Movie", "Casino")
            .with_property("released", json!("1995-11-22"))
            .with_property("imdbRating", Value::Null);

        assert_eq!(node.properties.len(), 1);
        assert_eq!(node.properties["released"], json!("1995-11-22"));
    }
}
