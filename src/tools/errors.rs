use thiserror::Error;

use crate::db::StoreError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Query error: {0}")]
    QueryError(String),
}

impl From<StoreError> for ToolError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => ToolError::StoreUnavailable(msg),
            StoreError::Query(msg) => ToolError::QueryError(msg),
        }
    }
}
