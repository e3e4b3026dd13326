pub mod errors;
pub mod information;
pub mod registry;
pub mod types;

pub use errors::*;
pub use information::{EntityQuery, InformationTool};
pub use registry::*;
pub use types::*;

use std::sync::Arc;

use crate::db::GraphStore;

/// Registry with the default tool set wired to the given store
pub fn default_registry(
    store: Arc<dyn GraphStore>,
    max_relationship_lines: usize,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register_tool(
        InformationTool::new(store).with_max_relationship_lines(max_relationship_lines),
    )?;
    Ok(registry)
}
