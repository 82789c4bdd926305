//! Idea-map service
//!
//! Assembles a project's canvas from the cards on its map (its own plus
//! any placed there from elsewhere) and its edges, and runs the
//! auto-layout with the user's spacing preferences.

use crate::database::{CardFilter, EdgeFilter, Repository};
use crate::error::Result;
use crate::ideamap::{
    cards_to_nodes, edge_to_flow_edge, layout_elements, node_position_updates, IdeaMap,
    LayoutDirection, LayoutOptions,
};
use crate::services::projects::require_project_access;
use crate::services::settings::SettingsService;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LayoutRequest {
    /// Falls back to the user's saved layout direction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<LayoutDirection>,
}

#[derive(Clone)]
pub struct IdeaMapService {
    repo: Repository,
    settings: SettingsService,
}

impl IdeaMapService {
    pub fn new(repo: Repository, settings: SettingsService) -> Self {
        Self { repo, settings }
    }

    pub async fn load(&self, user_id: &str, project_id: &str) -> Result<IdeaMap> {
        require_project_access(&self.repo, project_id, user_id).await?;

        let cards = self
            .repo
            .list_cards(
                user_id,
                &CardFilter {
                    project_id: Some(project_id.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        let edges = self
            .repo
            .list_edges(
                user_id,
                &EdgeFilter {
                    project_id: Some(project_id.to_string()),
                    ..Default::default()
                },
            )
            .await?;

        Ok(IdeaMap {
            nodes: cards_to_nodes(&cards),
            edges: edges.iter().map(edge_to_flow_edge).collect(),
        })
    }

    /// Lay out a project's map and save every card's new placement
    pub async fn auto_layout(
        &self,
        user_id: &str,
        project_id: &str,
        req: LayoutRequest,
    ) -> Result<IdeaMap> {
        let map = self.load(user_id, project_id).await?;
        let preferences = self.settings.get(user_id).await?.layout;

        let direction = req.direction.unwrap_or(preferences.direction);
        let options = LayoutOptions {
            rank_sep: preferences.rank_sep,
            node_sep: preferences.node_sep,
        };

        let (nodes, edges) = layout_elements(&map.nodes, &map.edges, direction, options);

        self.repo
            .upsert_card_positions(project_id, &node_position_updates(&nodes))
            .await?;

        tracing::info!(
            "Laid out {} nodes in project {} ({})",
            nodes.len(),
            project_id,
            direction
        );

        Ok(IdeaMap { nodes, edges })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::test_support::{create_project, create_test_repo, create_user};
    use crate::database::{CreateCardRequest, EdgeInput, Position};
    use crate::error::AppError;
    use serde_json::json;

    async fn seed_card(repo: &Repository, user_id: &str, project_id: &str, title: &str) -> String {
        repo.create_card(
            user_id,
            &CreateCardRequest {
                title: title.to_string(),
                content: String::new(),
                project_id: Some(project_id.to_string()),
                tags: vec!["map".to_string()],
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn seed_edge(repo: &Repository, user_id: &str, project_id: &str, source: &str, target: &str) {
        repo.create_edge(
            user_id,
            &EdgeInput {
                source: source.to_string(),
                target: target.to_string(),
                source_handle: None,
                target_handle: None,
                edge_type: "custom".to_string(),
                animated: false,
                style: json!({}),
                data: json!({}),
                project_id: Some(project_id.to_string()),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_load_uses_grid_then_saved_positions() {
        let repo = create_test_repo().await;
        let service = IdeaMapService::new(repo.clone(), SettingsService::new(repo.clone()));
        let owner = create_user(&repo, "owner@example.com").await;
        let project = create_project(&repo, &owner).await;

        let a = seed_card(&repo, &owner.id, &project.id, "A").await;
        let b = seed_card(&repo, &owner.id, &project.id, "B").await;
        seed_edge(&repo, &owner.id, &project.id, &a, &b).await;

        let map = service.load(&owner.id, &project.id).await.unwrap();
        assert_eq!(map.nodes.len(), 2);
        assert_ne!(map.nodes[0].position, map.nodes[1].position);
        assert_eq!(map.nodes[0].data.tags, vec!["map"]);
        assert_eq!(map.edges.len(), 1);
        assert_eq!(map.edges[0].edge_type.as_deref(), Some("custom"));

        repo.upsert_card_position(&b, &project.id, Position::new(-50.0, 75.0))
            .await
            .unwrap();
        let map = service.load(&owner.id, &project.id).await.unwrap();
        let placed = map.nodes.iter().find(|n| n.id == b).unwrap();
        assert_eq!(placed.position, Position::new(-50.0, 75.0));
    }

    #[tokio::test]
    async fn test_auto_layout_persists_positions() {
        let repo = create_test_repo().await;
        let service = IdeaMapService::new(repo.clone(), SettingsService::new(repo.clone()));
        let owner = create_user(&repo, "owner@example.com").await;
        let project = create_project(&repo, &owner).await;

        let a = seed_card(&repo, &owner.id, &project.id, "A").await;
        let b = seed_card(&repo, &owner.id, &project.id, "B").await;
        let c = seed_card(&repo, &owner.id, &project.id, "C").await;
        seed_edge(&repo, &owner.id, &project.id, &a, &b).await;
        seed_edge(&repo, &owner.id, &project.id, &b, &c).await;

        let laid_out = service
            .auto_layout(&owner.id, &project.id, LayoutRequest::default())
            .await
            .unwrap();
        assert!(laid_out
            .edges
            .iter()
            .all(|e| e.source_handle.as_deref() == Some("bottom")));

        let reloaded = service.load(&owner.id, &project.id).await.unwrap();
        let y = |id: &str| reloaded.nodes.iter().find(|n| n.id == id).unwrap().position.y;
        assert!(y(&a) < y(&b) && y(&b) < y(&c));
        assert_eq!(repo.list_card_nodes(&project.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cards_placed_from_another_project_join_the_map() {
        let repo = create_test_repo().await;
        let service = IdeaMapService::new(repo.clone(), SettingsService::new(repo.clone()));
        let owner = create_user(&repo, "owner@example.com").await;
        let home = create_project(&repo, &owner).await;
        let board = create_project(&repo, &owner).await;

        let visitor = seed_card(&repo, &owner.id, &home.id, "Visitor").await;
        let local = seed_card(&repo, &owner.id, &board.id, "Local").await;
        repo.upsert_card_position(&visitor, &board.id, Position::new(900.0, 900.0))
            .await
            .unwrap();
        seed_edge(&repo, &owner.id, &board.id, &local, &visitor).await;

        let map = service.load(&owner.id, &board.id).await.unwrap();
        assert_eq!(map.nodes.len(), 2);
        let placed = map.nodes.iter().find(|n| n.id == visitor).unwrap();
        assert_eq!(placed.position, Position::new(900.0, 900.0));

        // Layout moves the visitor on the board only
        service
            .auto_layout(&owner.id, &board.id, LayoutRequest::default())
            .await
            .unwrap();
        let reloaded = service.load(&owner.id, &board.id).await.unwrap();
        let y = |id: &str| reloaded.nodes.iter().find(|n| n.id == id).unwrap().position.y;
        assert!(y(&local) < y(&visitor));
        assert_ne!(
            reloaded.nodes.iter().find(|n| n.id == visitor).unwrap().position,
            Position::new(900.0, 900.0)
        );

        let at_home = service.load(&owner.id, &home.id).await.unwrap();
        assert_eq!(at_home.nodes.len(), 1);
        assert_eq!(repo.list_card_nodes(&home.id).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_outsider_cannot_load() {
        let repo = create_test_repo().await;
        let service = IdeaMapService::new(repo.clone(), SettingsService::new(repo.clone()));
        let owner = create_user(&repo, "owner@example.com").await;
        let outsider = create_user(&repo, "outsider@example.com").await;
        let project = create_project(&repo, &owner).await;

        assert!(matches!(
            service.load(&outsider.id, &project.id).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
