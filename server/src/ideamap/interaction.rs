//! Canvas interaction state: connection drags and node selection

use super::types::FlowNode;
use crate::config::{CONNECT_TOLERANCE_PX, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH};
use crate::database::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which end of an edge a drag started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleType {
    Source,
    Target,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting {
        node_id: String,
        handle_type: HandleType,
    },
}

/// What the canvas should do once a connection drag ends
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConnectOutcome {
    Cancelled,
    /// Released over another node; the renderer's own connect handler takes over
    #[serde(rename_all = "camelCase")]
    NativeConnect { target_node_id: String },
    /// Released on empty canvas: create a card there and link it to the drag origin
    #[serde(rename_all = "camelCase")]
    CreateNodeAt {
        position: Position,
        source_node_id: String,
        handle_type: HandleType,
    },
}

#[derive(Debug, Clone)]
pub struct ConnectionController {
    state: ConnectionState,
    tolerance: f64,
}

impl Default for ConnectionController {
    fn default() -> Self {
        Self::new(CONNECT_TOLERANCE_PX)
    }
}

impl ConnectionController {
    pub fn new(tolerance: f64) -> Self {
        Self {
            state: ConnectionState::Idle,
            tolerance,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.state, ConnectionState::Connecting { .. })
    }

    pub fn on_connect_start(&mut self, node_id: impl Into<String>, handle_type: HandleType) {
        let node_id = node_id.into();
        tracing::debug!("Connection drag started at {} ({:?})", node_id, handle_type);
        self.state = ConnectionState::Connecting {
            node_id,
            handle_type,
        };
    }

    /// Finish a drag. The controller is always idle afterwards.
    pub fn on_connect_end(&mut self, release: Option<Position>, nodes: &[FlowNode]) -> ConnectOutcome {
        let (node_id, handle_type) = match std::mem::take(&mut self.state) {
            ConnectionState::Idle => return ConnectOutcome::Cancelled,
            ConnectionState::Connecting {
                node_id,
                handle_type,
            } => (node_id, handle_type),
        };

        let Some(point) = release else {
            return ConnectOutcome::Cancelled;
        };

        // Another node wins over the origin when both are in reach
        let nearest = nodes
            .iter()
            .filter(|n| n.id != node_id)
            .map(|n| (n, distance_to_node(point, n)))
            .filter(|(_, d)| *d <= self.tolerance)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((node, _)) = nearest {
            return ConnectOutcome::NativeConnect {
                target_node_id: node.id.clone(),
            };
        }

        let over_origin = nodes
            .iter()
            .any(|n| n.id == node_id && distance_to_node(point, n) <= self.tolerance);
        if over_origin {
            return ConnectOutcome::Cancelled;
        }

        ConnectOutcome::CreateNodeAt {
            position: point,
            source_node_id: node_id,
            handle_type,
        }
    }
}

/// Euclidean distance from a point to a node's box; zero inside it
fn distance_to_node(point: Position, node: &FlowNode) -> f64 {
    let (width, height) = node.size_or(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT);
    let left = node.position.x;
    let top = node.position.y;

    let dx = (left - point.x).max(0.0).max(point.x - (left + width));
    let dy = (top - point.y).max(0.0).max(point.y - (top + height));
    dx.hypot(dy)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClickModifiers {
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub meta: bool,
    #[serde(default)]
    pub shift: bool,
}

impl ClickModifiers {
    pub fn any(&self) -> bool {
        self.ctrl || self.meta || self.shift
    }
}

/// Selected node ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: BTreeSet<String>,
}

impl Selection {
    pub fn on_node_click(&mut self, node_id: &str, modifiers: ClickModifiers) {
        if modifiers.any() {
            if !self.ids.remove(node_id) {
                self.ids.insert(node_id.to_string());
            }
        } else {
            self.ids.clear();
            self.ids.insert(node_id.to_string());
        }
    }

    pub fn on_pane_click(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.ids.contains(node_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Copy the selection onto the nodes' `selected` flags
    pub fn apply_to(&self, nodes: &mut [FlowNode]) {
        for node in nodes {
            node.selected = self.ids.contains(&node.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ideamap::types::CardNodeData;

    fn node_at(id: &str, x: f64, y: f64) -> FlowNode {
        FlowNode {
            id: id.to_string(),
            node_type: "card".to_string(),
            position: Position::new(x, y),
            data: CardNodeData::default(),
            width: Some(100.0),
            height: Some(50.0),
            selected: false,
        }
    }

    fn nodes() -> Vec<FlowNode> {
        vec![node_at("a", 0.0, 0.0), node_at("b", 400.0, 0.0)]
    }

    #[test]
    fn test_end_without_start_is_cancelled() {
        let mut controller = ConnectionController::default();
        let outcome = controller.on_connect_end(Some(Position::new(1.0, 1.0)), &nodes());
        assert_eq!(outcome, ConnectOutcome::Cancelled);
    }

    #[test]
    fn test_missing_release_cancels() {
        let mut controller = ConnectionController::default();
        controller.on_connect_start("a", HandleType::Source);
        assert!(controller.is_connecting());

        assert_eq!(controller.on_connect_end(None, &nodes()), ConnectOutcome::Cancelled);
        assert_eq!(controller.state(), &ConnectionState::Idle);
    }

    #[test]
    fn test_release_near_node_is_native() {
        let mut controller = ConnectionController::default();
        controller.on_connect_start("a", HandleType::Source);

        // 10px left of b's box
        let outcome = controller.on_connect_end(Some(Position::new(390.0, 25.0)), &nodes());
        assert_eq!(
            outcome,
            ConnectOutcome::NativeConnect {
                target_node_id: "b".to_string()
            }
        );
        assert!(!controller.is_connecting());
    }

    #[test]
    fn test_release_on_pane_creates_node() {
        let mut controller = ConnectionController::default();
        controller.on_connect_start("a", HandleType::Target);

        let drop = Position::new(200.0, 300.0);
        let outcome = controller.on_connect_end(Some(drop), &nodes());
        assert_eq!(
            outcome,
            ConnectOutcome::CreateNodeAt {
                position: drop,
                source_node_id: "a".to_string(),
                handle_type: HandleType::Target,
            }
        );
        assert_eq!(controller.state(), &ConnectionState::Idle);
    }

    #[test]
    fn test_release_on_origin_cancels() {
        let mut controller = ConnectionController::default();
        controller.on_connect_start("a", HandleType::Source);
        let outcome = controller.on_connect_end(Some(Position::new(50.0, 25.0)), &nodes());
        assert_eq!(outcome, ConnectOutcome::Cancelled);
    }

    #[test]
    fn test_neighbour_beats_origin_in_reach() {
        let mut controller = ConnectionController::default();
        controller.on_connect_start("a", HandleType::Source);

        // a ends at x=100 and c starts at x=110; the release sits on a's edge
        let nodes = vec![node_at("a", 0.0, 0.0), node_at("c", 110.0, 0.0)];
        let outcome = controller.on_connect_end(Some(Position::new(100.0, 25.0)), &nodes);
        assert_eq!(
            outcome,
            ConnectOutcome::NativeConnect {
                target_node_id: "c".to_string()
            }
        );
    }

    #[test]
    fn test_selection_clicks() {
        let mut selection = Selection::default();

        selection.on_node_click("a", ClickModifiers::default());
        selection.on_node_click("b", ClickModifiers::default());
        assert_eq!(selection.ids().collect::<Vec<_>>(), vec!["b"]);

        let ctrl = ClickModifiers {
            ctrl: true,
            ..Default::default()
        };
        selection.on_node_click("a", ctrl);
        assert_eq!(selection.len(), 2);

        let meta = ClickModifiers {
            meta: true,
            ..Default::default()
        };
        selection.on_node_click("b", meta);
        assert_eq!(selection.ids().collect::<Vec<_>>(), vec!["a"]);

        let mut canvas = nodes();
        selection.apply_to(&mut canvas);
        assert!(canvas[0].selected);
        assert!(!canvas[1].selected);

        selection.on_pane_click();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_outcome_wire_shape() {
        let json = serde_json::to_value(ConnectOutcome::CreateNodeAt {
            position: Position::new(1.0, 2.0),
            source_node_id: "a".to_string(),
            handle_type: HandleType::Source,
        })
        .unwrap();

        assert_eq!(json["kind"], "createNodeAt");
        assert_eq!(json["sourceNodeId"], "a");
        assert_eq!(json["handleType"], "source");
    }
}
