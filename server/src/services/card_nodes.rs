//! Card placements on a project's idea map

use crate::database::{
    CardNode, CardNodeFilter, CreateCardNodeRequest, Repository, UpdateCardNodeRequest,
};
use crate::error::{AppError, Result};
use crate::services::cards::require_card_access;
use crate::services::projects::require_project_access;

#[derive(Clone)]
pub struct CardNodesService {
    repo: Repository,
}

impl CardNodesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Place a card on a project's map. A card has at most one placement per project.
    pub async fn create_card_node(&self, user_id: &str, req: CreateCardNodeRequest) -> Result<CardNode> {
        require_project_access(&self.repo, &req.project_id, user_id).await?;

        let card = self
            .repo
            .find_card(&req.card_id)
            .await?
            .ok_or_else(|| AppError::not_found("Card", &req.card_id))?;
        require_card_access(&self.repo, &card, user_id).await?;

        let node = self.repo.create_card_node(&req).await.map_err(|e| match e {
            AppError::Database(ref db) if is_unique_violation(db) => AppError::Conflict(format!(
                "Card {} is already placed in project {}",
                req.card_id, req.project_id
            )),
            other => other,
        })?;

        tracing::debug!("Card {} placed in project {}", req.card_id, req.project_id);
        Ok(node)
    }

    pub async fn list_card_nodes(&self, user_id: &str, filter: &CardNodeFilter) -> Result<Vec<CardNode>> {
        let project_id = filter
            .project_id
            .as_deref()
            .ok_or_else(|| AppError::Validation("projectId is required".to_string()))?;

        require_project_access(&self.repo, project_id, user_id).await?;
        self.repo.list_card_nodes(project_id).await
    }

    pub async fn get_card_node(&self, user_id: &str, id: &str) -> Result<CardNode> {
        let node = self
            .repo
            .find_card_node(id)
            .await?
            .ok_or_else(|| AppError::not_found("Card node", id))?;

        require_project_access(&self.repo, &node.project_id, user_id).await?;
        Ok(node)
    }

    pub async fn update_card_node(
        &self,
        user_id: &str,
        id: &str,
        req: UpdateCardNodeRequest,
    ) -> Result<CardNode> {
        self.get_card_node(user_id, id).await?;
        self.repo.update_card_node(id, &req).await
    }

    /// Remove a placement. The card stays.
    pub async fn delete_card_node(&self, user_id: &str, id: &str) -> Result<()> {
        self.get_card_node(user_id, id).await?;
        self.repo.delete_card_node(id).await?;

        tracing::debug!("Card node removed: {}", id);
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::test_support::{create_project, create_test_repo, create_user};
    use crate::database::CreateCardRequest;
    use serde_json::json;

    fn placement(card_id: &str, project_id: &str) -> CreateCardNodeRequest {
        CreateCardNodeRequest {
            card_id: card_id.to_string(),
            project_id: project_id.to_string(),
            position_x: 10.0,
            position_y: 20.0,
            style: json!({}),
            data: json!({}),
        }
    }

    async fn seed_card(repo: &Repository, user_id: &str, project_id: &str) -> String {
        repo.create_card(
            user_id,
            &CreateCardRequest {
                title: "Placed".to_string(),
                content: String::new(),
                project_id: Some(project_id.to_string()),
                tags: vec![],
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_single_placement_per_project() {
        let repo = create_test_repo().await;
        let service = CardNodesService::new(repo.clone());
        let owner = create_user(&repo, "owner@example.com").await;
        let project = create_project(&repo, &owner).await;
        let card_id = seed_card(&repo, &owner.id, &project.id).await;

        service
            .create_card_node(&owner.id, placement(&card_id, &project.id))
            .await
            .unwrap();

        let duplicate = service
            .create_card_node(&owner.id, placement(&card_id, &project.id))
            .await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_keeps_card_and_checks_access() {
        let repo = create_test_repo().await;
        let service = CardNodesService::new(repo.clone());
        let owner = create_user(&repo, "owner@example.com").await;
        let outsider = create_user(&repo, "outsider@example.com").await;
        let project = create_project(&repo, &owner).await;
        let card_id = seed_card(&repo, &owner.id, &project.id).await;

        let node = service
            .create_card_node(&owner.id, placement(&card_id, &project.id))
            .await
            .unwrap();

        assert!(matches!(
            service.delete_card_node(&outsider.id, &node.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(repo.find_card_node(&node.id).await.unwrap().is_some());

        service.delete_card_node(&owner.id, &node.id).await.unwrap();
        assert!(repo.find_card_node(&node.id).await.unwrap().is_none());
        assert!(repo.find_card(&card_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_requires_project() {
        let repo = create_test_repo().await;
        let service = CardNodesService::new(repo.clone());
        let owner = create_user(&repo, "owner@example.com").await;

        assert!(matches!(
            service
                .list_card_nodes(&owner.id, &CardNodeFilter::default())
                .await,
            Err(AppError::Validation(_))
        ));
    }
}
