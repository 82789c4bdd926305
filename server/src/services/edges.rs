//! Edges service

use crate::database::{Edge, EdgeFilter, EdgeInput, Repository, UpdateEdgeRequest};
use crate::error::{AppError, Result};
use crate::services::cards::require_card_access;
use crate::services::projects::require_project_access;

#[derive(Clone)]
pub struct EdgesService {
    repo: Repository,
}

impl EdgesService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// An endpoint must be a card on the edge's project map (its own card or
    /// one placed there), or for a loose edge one of the user's loose cards.
    /// Unknown and off-limits cards are rejected alike.
    async fn require_endpoint(
        &self,
        user_id: &str,
        project_id: Option<&str>,
        card_id: &str,
        end: &str,
    ) -> Result<()> {
        let rejected = || {
            AppError::Validation(format!(
                "Edge {} is not a card on this map: {}",
                end, card_id
            ))
        };

        let card = self.repo.find_card(card_id).await?.ok_or_else(rejected)?;

        let allowed = match project_id {
            Some(project_id) => {
                card.project_id.as_deref() == Some(project_id)
                    || self.repo.find_placement(card_id, project_id).await?.is_some()
            }
            None => {
                card.project_id.is_none()
                    && require_card_access(&self.repo, &card, user_id).await.is_ok()
            }
        };

        if !allowed {
            return Err(rejected());
        }
        Ok(())
    }

    /// Project edges follow project access; loose edges belong to their creator
    async fn require_edge_access(&self, edge: &Edge, user_id: &str) -> Result<()> {
        match &edge.project_id {
            Some(project_id) => require_project_access(&self.repo, project_id, user_id)
                .await
                .map(|_| ()),
            None if edge.user_id == user_id => Ok(()),
            None => Err(AppError::Forbidden(
                "You do not have access to this edge".to_string(),
            )),
        }
    }

    pub async fn create_edge(&self, user_id: &str, input: EdgeInput) -> Result<Edge> {
        if let Some(project_id) = &input.project_id {
            require_project_access(&self.repo, project_id, user_id).await?;
        }
        let project_id = input.project_id.as_deref();
        self.require_endpoint(user_id, project_id, &input.source, "source")
            .await?;
        self.require_endpoint(user_id, project_id, &input.target, "target")
            .await?;

        let edge = self.repo.create_edge(user_id, &input).await?;
        tracing::info!("Edge created: {} ({} -> {})", edge.id, edge.source, edge.target);

        Ok(edge)
    }

    pub async fn list_edges(&self, user_id: &str, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        if let Some(project_id) = &filter.project_id {
            require_project_access(&self.repo, project_id, user_id).await?;
        }
        self.repo.list_edges(user_id, filter).await
    }

    pub async fn get_edge(&self, user_id: &str, id: &str) -> Result<Edge> {
        let edge = self
            .repo
            .find_edge(id)
            .await?
            .ok_or_else(|| AppError::not_found("Edge", id))?;

        self.require_edge_access(&edge, user_id).await?;
        Ok(edge)
    }

    pub async fn update_edge(&self, user_id: &str, id: &str, req: UpdateEdgeRequest) -> Result<Edge> {
        let edge = self.get_edge(user_id, id).await?;
        let project_id = edge.project_id.as_deref();

        if let Some(source) = &req.source {
            self.require_endpoint(user_id, project_id, source, "source")
                .await?;
        }
        if let Some(target) = &req.target {
            self.require_endpoint(user_id, project_id, target, "target")
                .await?;
        }

        let edge = self.repo.update_edge(id, &req).await?;
        tracing::debug!("Edge updated: {}", id);
        Ok(edge)
    }

    pub async fn delete_edge(&self, user_id: &str, id: &str) -> Result<()> {
        self.get_edge(user_id, id).await?;
        self.repo.delete_edge(id).await?;

        tracing::info!("Edge deleted: {}", id);
        Ok(())
    }

    /// Delete several edges. Unknown ids are skipped; any inaccessible edge fails the batch.
    pub async fn delete_edges(&self, user_id: &str, ids: &[String]) -> Result<u64> {
        let mut accessible = Vec::with_capacity(ids.len());

        for id in ids {
            if let Some(edge) = self.repo.find_edge(id).await? {
                self.require_edge_access(&edge, user_id).await?;
                accessible.push(edge.id);
            }
        }

        let deleted = self.repo.delete_edges(&accessible).await?;
        tracing::info!("Batch deleted {} of {} edges", deleted, ids.len());

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::test_support::{create_project, create_test_repo, create_user};
    use crate::database::{CreateCardRequest, Position};
    use serde_json::json;

    async fn seed_card(repo: &Repository, user_id: &str, title: &str) -> String {
        repo.create_card(
            user_id,
            &CreateCardRequest {
                title: title.to_string(),
                content: String::new(),
                project_id: None,
                tags: vec![],
            },
        )
        .await
        .unwrap()
        .id
    }

    fn input(source: &str, target: &str) -> EdgeInput {
        EdgeInput {
            source: source.to_string(),
            target: target.to_string(),
            source_handle: Some("bottom".to_string()),
            target_handle: Some("top".to_string()),
            edge_type: "custom".to_string(),
            animated: false,
            style: json!({}),
            data: json!({}),
            project_id: None,
        }
    }

    #[tokio::test]
    async fn test_endpoints_must_exist() {
        let repo = create_test_repo().await;
        let service = EdgesService::new(repo.clone());
        let user = create_user(&repo, "u@example.com").await;
        let a = seed_card(&repo, &user.id, "A").await;

        assert!(matches!(
            service.create_edge(&user.id, input(&a, "ghost")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ownership_and_batch_delete() {
        let repo = create_test_repo().await;
        let service = EdgesService::new(repo.clone());
        let user = create_user(&repo, "u@example.com").await;
        let other = create_user(&repo, "o@example.com").await;

        let a = seed_card(&repo, &user.id, "A").await;
        let b = seed_card(&repo, &user.id, "B").await;

        let first = service.create_edge(&user.id, input(&a, &b)).await.unwrap();
        let second = service.create_edge(&user.id, input(&b, &a)).await.unwrap();

        assert!(matches!(
            service.get_edge(&other.id, &first.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(service
            .delete_edges(&other.id, &[first.id.clone()])
            .await
            .is_err());

        let deleted = service
            .delete_edges(
                &user.id,
                &[first.id.clone(), second.id.clone(), "missing".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(deleted, 2);
    }

    #[tokio::test]
    async fn test_other_users_private_cards_are_rejected() {
        let repo = create_test_repo().await;
        let service = EdgesService::new(repo.clone());
        let user = create_user(&repo, "u@example.com").await;
        let other = create_user(&repo, "o@example.com").await;

        let mine = seed_card(&repo, &user.id, "Mine").await;
        let theirs = seed_card(&repo, &other.id, "Theirs").await;

        // Same answer as for a card that does not exist
        let private = service.create_edge(&user.id, input(&mine, &theirs)).await;
        let missing = service.create_edge(&user.id, input(&mine, "ghost")).await;
        match (private, missing) {
            (Err(AppError::Validation(a)), Err(AppError::Validation(b))) => {
                assert!(a.starts_with("Edge target is not a card on this map"));
                assert!(b.starts_with("Edge target is not a card on this map"));
            }
            other => panic!("unexpected results: {:?}", other),
        }

        let also_mine = seed_card(&repo, &user.id, "Also mine").await;
        let edge = service
            .create_edge(&user.id, input(&mine, &also_mine))
            .await
            .unwrap();
        assert!(matches!(
            service
                .update_edge(
                    &user.id,
                    &edge.id,
                    UpdateEdgeRequest {
                        source: Some(theirs.clone()),
                        ..Default::default()
                    },
                )
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_project_edges_stay_on_the_project_map() {
        let repo = create_test_repo().await;
        let service = EdgesService::new(repo.clone());
        let user = create_user(&repo, "u@example.com").await;
        let board = create_project(&repo, &user).await;
        let elsewhere = create_project(&repo, &user).await;

        let project_card = |project_id: String, title: &'static str| {
            let repo = repo.clone();
            let user_id = user.id.clone();
            async move {
                repo.create_card(
                    &user_id,
                    &CreateCardRequest {
                        title: title.to_string(),
                        content: String::new(),
                        project_id: Some(project_id),
                        tags: vec![],
                    },
                )
                .await
                .unwrap()
                .id
            }
        };

        let local = project_card(board.id.clone(), "Local").await;
        let foreign = project_card(elsewhere.id.clone(), "Foreign").await;
        let loose = seed_card(&repo, &user.id, "Loose").await;

        let on_board = |source: &str, target: &str| EdgeInput {
            project_id: Some(board.id.clone()),
            ..input(source, target)
        };

        assert!(matches!(
            service.create_edge(&user.id, on_board(&local, &foreign)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_edge(&user.id, on_board(&local, &loose)).await,
            Err(AppError::Validation(_))
        ));

        // Once placed on the board the foreign card can be linked there
        repo.upsert_card_position(&foreign, &board.id, Position::new(0.0, 0.0))
            .await
            .unwrap();
        let edge = service
            .create_edge(&user.id, on_board(&local, &foreign))
            .await
            .unwrap();
        assert_eq!(edge.project_id.as_deref(), Some(board.id.as_str()));
    }
}
