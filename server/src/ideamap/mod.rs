//! Idea-map core
//!
//! Pure, framework-independent pieces of the canvas pipeline:
//! - `nodes` / `edges`: persisted records to canvas elements and back
//! - `layout`: layered auto-layout with direction-aware handles
//! - `interaction`: connection gestures and click selection
//! - `store`: per-session UI state, passed explicitly instead of living in a global

pub mod edges;
pub mod interaction;
pub mod layout;
pub mod nodes;
pub mod store;
pub mod types;

pub use edges::{edge_to_flow_edge, flow_edge_to_edge_input};
pub use interaction::{ClickModifiers, ConnectOutcome, ConnectionController, HandleType, Selection};
pub use layout::{layout_elements, LayeredLayout, LayoutDirection, LayoutOptions, SugiyamaLayout};
pub use nodes::{cards_to_nodes, node_position_updates};
pub use store::IdeaMapStore;
pub use types::{CardNodeData, FlowEdge, FlowNode, IdeaMap};
