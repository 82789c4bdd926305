//! Layered auto-layout
//!
//! `layout_elements` registers every node (with its measured or fallback size)
//! and every edge with a `LayeredLayout` engine, converts the returned centers
//! into top-left positions and points each edge's handles along the layout
//! direction.
//!
//! The bundled engine is a compact Sugiyama pipeline on `petgraph`:
//!   1. Cycle removal (DFS back edges are reversed)
//!   2. Layer assignment (longest path from the sources)
//!   3. Crossing reduction (barycenter sweeps)
//!   4. Coordinate assignment (layers separated by `rank_sep`, siblings by `node_sep`)

use super::types::{FlowEdge, FlowNode};
use crate::config::{
    CROSSING_SWEEPS, DEFAULT_NODE_HEIGHT, DEFAULT_NODE_SEP, DEFAULT_NODE_WIDTH, DEFAULT_RANK_SEP,
    HANDLE_BOTTOM, HANDLE_LEFT, HANDLE_RIGHT, HANDLE_TOP,
};
use crate::database::Position;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Axis along which layers are stacked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LayoutDirection {
    /// Top to bottom
    #[default]
    TB,
    /// Left to right
    LR,
    /// Bottom to top
    BT,
    /// Right to left
    RL,
}

impl LayoutDirection {
    pub fn is_horizontal(self) -> bool {
        matches!(self, LayoutDirection::LR | LayoutDirection::RL)
    }

    /// `(source handle, target handle)` for edges in this direction
    pub fn handles(self) -> (&'static str, &'static str) {
        match self {
            LayoutDirection::TB => (HANDLE_BOTTOM, HANDLE_TOP),
            LayoutDirection::BT => (HANDLE_TOP, HANDLE_BOTTOM),
            LayoutDirection::LR => (HANDLE_RIGHT, HANDLE_LEFT),
            LayoutDirection::RL => (HANDLE_LEFT, HANDLE_RIGHT),
        }
    }
}

impl fmt::Display for LayoutDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LayoutDirection::TB => "TB",
            LayoutDirection::LR => "LR",
            LayoutDirection::BT => "BT",
            LayoutDirection::RL => "RL",
        };
        f.write_str(s)
    }
}

impl FromStr for LayoutDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TB" => Ok(LayoutDirection::TB),
            "LR" => Ok(LayoutDirection::LR),
            "BT" => Ok(LayoutDirection::BT),
            "RL" => Ok(LayoutDirection::RL),
            other => Err(format!(
                "Invalid layout direction '{}'. Use TB, LR, BT or RL",
                other
            )),
        }
    }
}

/// Spacing between and within layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub rank_sep: f64,
    pub node_sep: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            rank_sep: DEFAULT_RANK_SEP,
            node_sep: DEFAULT_NODE_SEP,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
}

/// Input to a layered layout engine
#[derive(Debug, Clone)]
pub struct LayoutGraph {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<(String, String)>,
    pub direction: LayoutDirection,
    pub options: LayoutOptions,
}

/// A layered graph layout routine returning node centers
pub trait LayeredLayout {
    fn compute(&self, graph: &LayoutGraph) -> HashMap<String, Position>;
}

/// Lay out canvas elements with the bundled Sugiyama engine
pub fn layout_elements(
    nodes: &[FlowNode],
    edges: &[FlowEdge],
    direction: LayoutDirection,
    options: LayoutOptions,
) -> (Vec<FlowNode>, Vec<FlowEdge>) {
    layout_elements_with(&SugiyamaLayout::default(), nodes, edges, direction, options)
}

pub fn layout_elements_with<L: LayeredLayout + ?Sized>(
    engine: &L,
    nodes: &[FlowNode],
    edges: &[FlowEdge],
    direction: LayoutDirection,
    options: LayoutOptions,
) -> (Vec<FlowNode>, Vec<FlowEdge>) {
    let graph = LayoutGraph {
        nodes: nodes
            .iter()
            .map(|n| {
                let (width, height) = n.size_or(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT);
                LayoutNode {
                    id: n.id.clone(),
                    width,
                    height,
                }
            })
            .collect(),
        edges: edges
            .iter()
            .map(|e| (e.source.clone(), e.target.clone()))
            .collect(),
        direction,
        options,
    };

    let centers = engine.compute(&graph);

    let laid_out_nodes = nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if let Some(center) = centers.get(&node.id) {
                let (width, height) = node.size_or(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT);
                node.position = Position::new(center.x - width / 2.0, center.y - height / 2.0);
            }
            node
        })
        .collect();

    let (source_handle, target_handle) = direction.handles();
    let laid_out_edges = edges
        .iter()
        .map(|edge| FlowEdge {
            source_handle: Some(source_handle.to_string()),
            target_handle: Some(target_handle.to_string()),
            ..edge.clone()
        })
        .collect();

    (laid_out_nodes, laid_out_edges)
}

/// Sugiyama-style layered layout
#[derive(Debug, Clone)]
pub struct SugiyamaLayout {
    pub sweeps: usize,
}

impl Default for SugiyamaLayout {
    fn default() -> Self {
        Self {
            sweeps: CROSSING_SWEEPS,
        }
    }
}

impl LayeredLayout for SugiyamaLayout {
    fn compute(&self, graph: &LayoutGraph) -> HashMap<String, Position> {
        let mut digraph: DiGraph<usize, ()> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for (i, node) in graph.nodes.iter().enumerate() {
            if !index.contains_key(node.id.as_str()) {
                index.insert(node.id.as_str(), digraph.add_node(i));
            }
        }

        for (source, target) in &graph.edges {
            match (index.get(source.as_str()), index.get(target.as_str())) {
                (Some(&s), Some(&t)) if s != t => {
                    digraph.add_edge(s, t, ());
                }
                _ => {}
            }
        }

        let dag = acyclic(&digraph);
        let ranks = assign_ranks(&dag);
        let mut layers = build_layers(&dag, &ranks);
        reduce_crossings(&dag, &mut layers, self.sweeps);

        let centers = assign_coordinates(graph, &digraph, &layers);

        centers
            .into_iter()
            .map(|(idx, pos)| (graph.nodes[digraph[idx]].id.clone(), pos))
            .collect()
    }
}

/// Copy of the graph with every DFS back edge reversed
fn acyclic(graph: &DiGraph<usize, ()>) -> DiGraph<(), ()> {
    let mut back_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
    depth_first_search(graph, graph.node_indices(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back_edges.insert((u, v));
        }
    });

    let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
    for _ in graph.node_indices() {
        dag.add_node(());
    }

    for edge in graph.raw_edges() {
        let (s, t) = (edge.source(), edge.target());
        if back_edges.contains(&(s, t)) {
            dag.add_edge(t, s, ());
        } else {
            dag.add_edge(s, t, ());
        }
    }

    dag
}

/// Longest-path layering: every edge points to a strictly deeper layer
fn assign_ranks(dag: &DiGraph<(), ()>) -> Vec<usize> {
    let mut ranks = vec![0usize; dag.node_count()];

    let order = toposort(dag, None).unwrap_or_else(|_| dag.node_indices().collect());
    for node in order {
        let rank = ranks[node.index()];
        for next in dag.neighbors(node) {
            if ranks[next.index()] < rank + 1 {
                ranks[next.index()] = rank + 1;
            }
        }
    }

    ranks
}

fn build_layers(dag: &DiGraph<(), ()>, ranks: &[usize]) -> Vec<Vec<NodeIndex>> {
    let layer_count = ranks.iter().copied().max().map_or(0, |r| r + 1);
    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); layer_count];
    for node in dag.node_indices() {
        layers[ranks[node.index()]].push(node);
    }
    layers
}

/// Alternate downward and upward barycenter passes
fn reduce_crossings(dag: &DiGraph<(), ()>, layers: &mut [Vec<NodeIndex>], sweeps: usize) {
    if layers.len() < 2 {
        return;
    }

    for _ in 0..sweeps {
        for r in 1..layers.len() {
            let (fixed, rest) = layers.split_at_mut(r);
            order_by_barycenter(&mut rest[0], &fixed[r - 1], |n| {
                dag.neighbors_directed(n, petgraph::Direction::Incoming)
                    .collect()
            });
        }
        for r in (0..layers.len() - 1).rev() {
            let (head, tail) = layers.split_at_mut(r + 1);
            order_by_barycenter(&mut head[r], &tail[0], |n| {
                dag.neighbors_directed(n, petgraph::Direction::Outgoing)
                    .collect()
            });
        }
    }
}

fn order_by_barycenter(
    layer: &mut Vec<NodeIndex>,
    reference: &[NodeIndex],
    neighbors: impl Fn(NodeIndex) -> Vec<NodeIndex>,
) {
    let reference_pos: HashMap<NodeIndex, usize> =
        reference.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut keyed: Vec<(f64, NodeIndex)> = layer
        .iter()
        .enumerate()
        .map(|(current, &node)| {
            let positions: Vec<usize> = neighbors(node)
                .into_iter()
                .filter_map(|n| reference_pos.get(&n).copied())
                .collect();
            let key = if positions.is_empty() {
                current as f64
            } else {
                positions.iter().sum::<usize>() as f64 / positions.len() as f64
            };
            (key, node)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    *layer = keyed.into_iter().map(|(_, n)| n).collect();
}

/// Centers for every node, normalized so the drawing starts at (0, 0)
fn assign_coordinates(
    graph: &LayoutGraph,
    digraph: &DiGraph<usize, ()>,
    layers: &[Vec<NodeIndex>],
) -> HashMap<NodeIndex, Position> {
    let horizontal = graph.direction.is_horizontal();
    let size = |idx: NodeIndex| {
        let node = &graph.nodes[digraph[idx]];
        (node.width, node.height)
    };
    // (breadth along the layer, depth across layers)
    let extent = |idx: NodeIndex| {
        let (w, h) = size(idx);
        if horizontal {
            (h, w)
        } else {
            (w, h)
        }
    };

    let mut centers: HashMap<NodeIndex, Position> = HashMap::new();
    let mut depth_offset = 0.0;

    for layer in layers {
        let layer_depth = layer
            .iter()
            .map(|&n| extent(n).1)
            .fold(0.0_f64, f64::max);
        let depth_center = depth_offset + layer_depth / 2.0;

        let total_breadth: f64 = layer.iter().map(|&n| extent(n).0).sum::<f64>()
            + graph.options.node_sep * layer.len().saturating_sub(1) as f64;
        let mut cursor = -total_breadth / 2.0;

        for &node in layer {
            let breadth = extent(node).0;
            let b = cursor + breadth / 2.0;
            cursor += breadth + graph.options.node_sep;

            let (x, y) = match graph.direction {
                LayoutDirection::TB => (b, depth_center),
                LayoutDirection::BT => (b, -depth_center),
                LayoutDirection::LR => (depth_center, b),
                LayoutDirection::RL => (-depth_center, b),
            };
            centers.insert(node, Position::new(x, y));
        }

        depth_offset += layer_depth + graph.options.rank_sep;
    }

    let min_x = centers
        .iter()
        .map(|(&n, p)| p.x - size(n).0 / 2.0)
        .fold(f64::INFINITY, f64::min);
    let min_y = centers
        .iter()
        .map(|(&n, p)| p.y - size(n).1 / 2.0)
        .fold(f64::INFINITY, f64::min);

    if min_x.is_finite() && min_y.is_finite() {
        for pos in centers.values_mut() {
            pos.x -= min_x;
            pos.y -= min_y;
        }
    }

    centers
}
