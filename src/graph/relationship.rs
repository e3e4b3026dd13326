use serde::{Deserialize, Serialize};

use super::entity::NodeId;

/// Unique identifier for an edge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EdgeId(pub String);

impl EdgeId {
    pub fn new(id: &str) -> Self {
        EdgeId(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Directed, typed relationship between two nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub relationship_type: String,
}

impl Edge {
    /// Create an edge with an id derived from its endpoints and type
    pub fn new(source_id: NodeId, target_id: NodeId, relationship_type: &str) -> Self {
        let relationship_type = normalize_relationship_type(relationship_type);
        let id = Self::generate_id(&source_id, &target_id, &relationship_type);
        Self {
            id,
            source_id,
            target_id,
            relationship_type,
        }
    }

    /// Generate a default edge ID based on source, target, and type
    pub fn generate_id(source_id: &NodeId, target_id: &NodeId, rel_type: &str) -> EdgeId {
        EdgeId::new(&format!(
            "{}->{}::{}",
            source_id.as_str(),
            target_id.as_str(),
            rel_type
        ))
    }
}

/// Relationship types are stored upper snake case: "acted in" -> "ACTED_IN"
pub fn normalize_relationship_type(raw: &str) -> String {
    raw.trim()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}
