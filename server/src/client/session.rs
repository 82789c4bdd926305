//! Client-side driver for one open idea map
//!
//! Ties the canvas state (`IdeaMapStore`) to the server through the query
//! cache: reads go through cached keys, writes invalidate them.

use super::api::ApiClient;
use super::cache::{Invalidation, QueryCache, QueryKey, Resource};
use super::error::ClientResult;
use crate::config::{DEFAULT_EDGE_TYPE, NEW_CARD_TITLE};
use crate::database::{
    Card, CardNode, CreateCardNodeRequest, CreateCardRequest, Edge, EdgeInput, Position,
    UpdateCardNodeRequest,
};
use crate::ideamap::{
    cards_to_nodes, edge_to_flow_edge, ConnectOutcome, FlowEdge, FlowNode, HandleType, IdeaMap,
    IdeaMapStore, LayoutDirection,
};
use crate::services::settings::Settings;
use serde_json::{json, Value};
use std::sync::Arc;

/// Records written when a connection is dropped on empty canvas
#[derive(Debug, Clone)]
pub struct CreatedNode {
    pub card: Card,
    pub card_node: CardNode,
    pub edge: Edge,
}

pub struct IdeaMapSession {
    api: Arc<ApiClient>,
    cache: QueryCache<ApiClient>,
    project_id: String,
    pub store: IdeaMapStore,
}

impl IdeaMapSession {
    pub fn new(api: Arc<ApiClient>, project_id: impl Into<String>) -> Self {
        Self {
            cache: QueryCache::new(Arc::clone(&api)),
            api,
            project_id: project_id.into(),
            store: IdeaMapStore::new(),
        }
    }

    /// Open a map with the signed-in user's theme and layout direction
    pub async fn open(api: Arc<ApiClient>, project_id: impl Into<String>) -> ClientResult<Self> {
        let mut session = Self::new(api, project_id);
        let settings: Settings = session
            .cache
            .read_as(&QueryKey::new(Resource::Settings))
            .await
            .into_result()?;
        session.store = IdeaMapStore::from_settings(&settings);
        Ok(session)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn cache(&self) -> &QueryCache<ApiClient> {
        &self.cache
    }

    fn key(&self, resource: Resource) -> QueryKey {
        QueryKey::new(resource).with("projectId", self.project_id.as_str())
    }

    fn invalidation(&self, resource: Resource) -> Invalidation {
        Invalidation::field(resource, "projectId", self.project_id.as_str())
    }

    pub async fn nodes(&self) -> ClientResult<Vec<FlowNode>> {
        let cards: Vec<Card> = self
            .cache
            .read_as(&self.key(Resource::Cards))
            .await
            .into_result()?;
        let mut nodes = cards_to_nodes(&cards);
        self.store.selection.apply_to(&mut nodes);
        Ok(nodes)
    }

    pub async fn edges(&self) -> ClientResult<Vec<FlowEdge>> {
        let edges: Vec<Edge> = self
            .cache
            .read_as(&self.key(Resource::Edges))
            .await
            .into_result()?;
        Ok(edges.iter().map(edge_to_flow_edge).collect())
    }

    pub async fn snapshot(&self) -> ClientResult<IdeaMap> {
        Ok(IdeaMap {
            nodes: self.nodes().await?,
            edges: self.edges().await?,
        })
    }

    pub fn connect_start(&mut self, node_id: &str, handle_type: HandleType) {
        self.store.connection.on_connect_start(node_id, handle_type);
    }

    /// Finish a connection drag released at `release` (canvas coordinates)
    pub async fn connect_end(&mut self, release: Option<Position>) -> ClientResult<Option<CreatedNode>> {
        let nodes = self.nodes().await?;
        let outcome = self.store.connection.on_connect_end(release, &nodes);
        self.handle_outcome(outcome).await
    }

    /// Only `CreateNodeAt` writes anything; the other outcomes are left to the renderer
    pub async fn handle_outcome(&self, outcome: ConnectOutcome) -> ClientResult<Option<CreatedNode>> {
        let (position, origin, handle_type) = match outcome {
            ConnectOutcome::CreateNodeAt {
                position,
                source_node_id,
                handle_type,
            } => (position, source_node_id, handle_type),
            ConnectOutcome::Cancelled | ConnectOutcome::NativeConnect { .. } => return Ok(None),
        };

        let card = self
            .cache
            .mutate(
                self.invalidation(Resource::Cards),
                self.api.create_card(&CreateCardRequest {
                    title: NEW_CARD_TITLE.to_string(),
                    content: String::new(),
                    project_id: Some(self.project_id.clone()),
                    tags: Vec::new(),
                }),
            )
            .await?;

        let card_node = self
            .cache
            .mutate(
                self.invalidation(Resource::CardNodes),
                self.api.create_card_node(&CreateCardNodeRequest {
                    card_id: card.id.clone(),
                    project_id: self.project_id.clone(),
                    position_x: position.x,
                    position_y: position.y,
                    style: json!({}),
                    data: json!({}),
                }),
            )
            .await?;
        // Card lists carry the placement too
        self.cache.invalidate(&self.invalidation(Resource::Cards)).await;

        let input = link_new_card(
            &origin,
            &card.id,
            handle_type,
            self.store.layout_direction,
            &self.project_id,
        );
        let edge = self
            .cache
            .mutate(self.invalidation(Resource::Edges), self.api.create_edge(&input))
            .await?;

        tracing::debug!("Created card {} linked to {}", card.id, origin);
        Ok(Some(CreatedNode {
            card,
            card_node,
            edge,
        }))
    }

    /// Persist a renderer `onConnect` between two existing nodes
    pub async fn connect(&self, source: &str, target: &str) -> ClientResult<Edge> {
        let (source_handle, target_handle) = self.store.layout_direction.handles();
        let input = EdgeInput {
            source: source.to_string(),
            target: target.to_string(),
            source_handle: Some(source_handle.to_string()),
            target_handle: Some(target_handle.to_string()),
            edge_type: DEFAULT_EDGE_TYPE.to_string(),
            animated: false,
            style: json!({}),
            data: json!({}),
            project_id: Some(self.project_id.clone()),
        };
        self.cache
            .mutate(self.invalidation(Resource::Edges), self.api.create_edge(&input))
            .await
    }

    pub async fn remove_edges(&self, ids: &[String]) -> ClientResult<u64> {
        self.cache
            .mutate(self.invalidation(Resource::Edges), self.api.delete_edges(ids))
            .await
    }

    /// Move a card on the canvas, showing the new position before the server confirms it
    pub async fn move_node(&self, card_id: &str, position: Position) -> ClientResult<CardNode> {
        let key = self.key(Resource::Cards);
        let patch = self
            .cache
            .apply_optimistic(&key, |cards| move_card(cards, card_id, position))
            .await;

        let saved = match self.save_position(card_id, position).await {
            Ok(node) => node,
            Err(e) => {
                self.cache.rollback(patch).await;
                return Err(e);
            }
        };

        match self.cache.fetcher().list_cards(Some(&self.project_id)).await {
            Ok(cards) => {
                self.cache
                    .confirm(patch, serde_json::to_value(cards)?)
                    .await;
            }
            Err(e) => {
                tracing::warn!("Could not refresh cards after move: {}", e);
                self.cache.rollback(patch).await;
                self.cache.invalidate(&self.invalidation(Resource::Cards)).await;
            }
        }

        Ok(saved)
    }

    async fn save_position(&self, card_id: &str, position: Position) -> ClientResult<CardNode> {
        let placements: Vec<CardNode> = self
            .cache
            .read_as(&self.key(Resource::CardNodes))
            .await
            .into_result()?;

        let write = async {
            match placements.iter().find(|n| n.card_id == card_id) {
                Some(node) => {
                    self.api
                        .update_card_node(
                            &node.id,
                            &UpdateCardNodeRequest {
                                position_x: Some(position.x),
                                position_y: Some(position.y),
                                ..Default::default()
                            },
                        )
                        .await
                }
                None => {
                    self.api
                        .create_card_node(&CreateCardNodeRequest {
                            card_id: card_id.to_string(),
                            project_id: self.project_id.clone(),
                            position_x: position.x,
                            position_y: position.y,
                            style: json!({}),
                            data: json!({}),
                        })
                        .await
                }
            }
        };

        self.cache
            .mutate(self.invalidation(Resource::CardNodes), write)
            .await
    }

    /// Lay the map out server-side and drop every cached view of it
    pub async fn auto_layout(&mut self, direction: Option<LayoutDirection>) -> ClientResult<IdeaMap> {
        let map = self
            .cache
            .mutate(
                self.invalidation(Resource::CardNodes),
                self.api.auto_layout(&self.project_id, direction),
            )
            .await?;
        self.cache.invalidate(&self.invalidation(Resource::Cards)).await;

        if let Some(direction) = direction {
            self.store.set_layout_direction(direction);
        }
        Ok(map)
    }
}

/// Edge between a drag origin and the card created where it was dropped.
///
/// Dragging from a source handle makes the new card the target, and the
/// other way round for a target handle.
fn link_new_card(
    origin: &str,
    new_card: &str,
    handle_type: HandleType,
    direction: LayoutDirection,
    project_id: &str,
) -> EdgeInput {
    let (source, target) = match handle_type {
        HandleType::Source => (origin, new_card),
        HandleType::Target => (new_card, origin),
    };
    let (source_handle, target_handle) = direction.handles();

    EdgeInput {
        source: source.to_string(),
        target: target.to_string(),
        source_handle: Some(source_handle.to_string()),
        target_handle: Some(target_handle.to_string()),
        edge_type: DEFAULT_EDGE_TYPE.to_string(),
        animated: false,
        style: json!({}),
        data: json!({}),
        project_id: Some(project_id.to_string()),
    }
}

fn move_card(cards: &mut Value, card_id: &str, position: Position) {
    if let Some(list) = cards.as_array_mut() {
        for card in list.iter_mut().filter(|c| c["id"] == card_id) {
            card["positionX"] = json!(position.x);
            card["positionY"] = json!(position.y);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_from_source_handle() {
        let input = link_new_card("origin", "fresh", HandleType::Source, LayoutDirection::TB, "p1");
        assert_eq!(input.source, "origin");
        assert_eq!(input.target, "fresh");
        assert_eq!(input.source_handle.as_deref(), Some("bottom"));
        assert_eq!(input.target_handle.as_deref(), Some("top"));
        assert_eq!(input.project_id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_link_from_target_handle_reverses() {
        let input = link_new_card("origin", "fresh", HandleType::Target, LayoutDirection::LR, "p1");
        assert_eq!(input.source, "fresh");
        assert_eq!(input.target, "origin");
        assert_eq!(input.source_handle.as_deref(), Some("right"));
        assert_eq!(input.target_handle.as_deref(), Some("left"));
    }

    #[test]
    fn test_move_card_patches_only_matching_entry() {
        let mut cards = json!([
            {"id": "a", "title": "A"},
            {"id": "b", "title": "B", "positionX": 1.0, "positionY": 1.0}
        ]);
        move_card(&mut cards, "b", Position::new(40.0, -5.0));

        assert_eq!(cards[0].get("positionX"), None);
        assert_eq!(cards[1]["positionX"], json!(40.0));
        assert_eq!(cards[1]["positionY"], json!(-5.0));
    }

    #[test]
    fn test_move_card_ignores_non_lists() {
        let mut value = Value::Null;
        move_card(&mut value, "a", Position::new(1.0, 2.0));
        assert_eq!(value, Value::Null);
    }
}
