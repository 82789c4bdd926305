//! Canvas element shapes, matching the renderer's node and edge schema

use crate::database::Position;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload carried by a card node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CardNodeData {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub position: Position,
    pub data: CardNodeData,
    /// Measured size, when the renderer has reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub selected: bool,
}

impl FlowNode {
    pub fn size_or(&self, default_width: f64, default_height: f64) -> (f64, f64) {
        (
            self.width.filter(|w| *w > 0.0).unwrap_or(default_width),
            self.height.filter(|h| *h > 0.0).unwrap_or(default_height),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
    #[serde(default)]
    pub style: Value,
    #[serde(default)]
    pub data: Value,
}

/// A project's map as handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdeaMap {
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
}
