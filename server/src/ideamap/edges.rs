//! Persisted edge to canvas-edge mapping

use super::types::FlowEdge;
use crate::config::DEFAULT_EDGE_TYPE;
use crate::database::{Edge, EdgeInput};

pub fn edge_to_flow_edge(edge: &Edge) -> FlowEdge {
    let edge_type = if edge.edge_type.is_empty() {
        DEFAULT_EDGE_TYPE.to_string()
    } else {
        edge.edge_type.clone()
    };

    FlowEdge {
        id: edge.id.clone(),
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge.source_handle.clone(),
        target_handle: edge.target_handle.clone(),
        edge_type: Some(edge_type),
        animated: Some(edge.animated),
        style: edge.style.0.clone(),
        data: edge.data.0.clone(),
    }
}

/// Create payload for a canvas edge. The project is left for the caller to set.
pub fn flow_edge_to_edge_input(edge: &FlowEdge) -> EdgeInput {
    EdgeInput {
        source: edge.source.clone(),
        target: edge.target.clone(),
        source_handle: edge.source_handle.clone(),
        target_handle: edge.target_handle.clone(),
        edge_type: edge
            .edge_type
            .clone()
            .unwrap_or_else(|| DEFAULT_EDGE_TYPE.to_string()),
        animated: edge.animated.unwrap_or(false),
        style: edge.style.clone(),
        data: edge.data.clone(),
        project_id: None,
    }
}
