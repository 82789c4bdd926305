//! Cards service
//!
//! High-level business logic for cards: validation, visibility and
//! tag bookkeeping on create and update.

use crate::config::{MAX_TAG_NAME_LENGTH, MAX_TITLE_LENGTH};
use crate::database::{Card, CardFilter, CreateCardRequest, Repository, UpdateCardRequest};
use crate::error::{AppError, Result};
use crate::services::projects::require_project_access;

fn validate_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Card title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Card title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

fn validate_tags(tags: &[String]) -> Result<()> {
    if let Some(long) = tags
        .iter()
        .find(|t| t.trim().chars().count() > MAX_TAG_NAME_LENGTH)
    {
        return Err(AppError::Validation(format!(
            "Tag '{}' is longer than {} characters",
            long.trim(),
            MAX_TAG_NAME_LENGTH
        )));
    }
    Ok(())
}

/// A card is visible through its project, or to its author when it has none
pub(crate) async fn require_card_access(repo: &Repository, card: &Card, user_id: &str) -> Result<()> {
    match &card.project_id {
        Some(project_id) => require_project_access(repo, project_id, user_id)
            .await
            .map(|_| ()),
        None if card.user_id == user_id => Ok(()),
        None => Err(AppError::Forbidden(
            "You do not have access to this card".to_string(),
        )),
    }
}

/// Service for managing cards
#[derive(Clone)]
pub struct CardsService {
    repo: Repository,
}

impl CardsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create_card(&self, user_id: &str, req: CreateCardRequest) -> Result<Card> {
        let title = validate_title(&req.title)?;
        validate_tags(&req.tags)?;

        if let Some(project_id) = &req.project_id {
            require_project_access(&self.repo, project_id, user_id).await?;
        }

        let req = CreateCardRequest { title, ..req };
        let card = self.repo.create_card(user_id, &req).await?;

        tracing::info!("Card created: {}", card.id);
        Ok(card)
    }

    pub async fn get_card(&self, user_id: &str, id: &str) -> Result<Card> {
        let card = self
            .repo
            .find_card(id)
            .await?
            .ok_or_else(|| AppError::not_found("Card", id))?;

        require_card_access(&self.repo, &card, user_id).await?;
        Ok(card)
    }

    pub async fn list_cards(&self, user_id: &str, filter: &CardFilter) -> Result<Vec<Card>> {
        if let Some(project_id) = &filter.project_id {
            require_project_access(&self.repo, project_id, user_id).await?;
        }

        self.repo.list_cards(user_id, filter).await
    }

    pub async fn update_card(&self, user_id: &str, id: &str, req: UpdateCardRequest) -> Result<Card> {
        self.get_card(user_id, id).await?;

        let title = req.title.as_deref().map(validate_title).transpose()?;
        if let Some(tags) = &req.tags {
            validate_tags(tags)?;
        }

        let req = UpdateCardRequest { title, ..req };
        let card = self.repo.update_card(id, &req).await?;

        tracing::debug!("Card updated: {}", id);
        Ok(card)
    }

    /// Delete a card with its placements and connected edges
    pub async fn delete_card(&self, user_id: &str, id: &str) -> Result<()> {
        self.get_card(user_id, id).await?;

        self.repo.delete_card(id).await?;
        tracing::info!("Card deleted: {}", id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repository::test_support::{create_project, create_test_repo, create_user};

    async fn create_test_service() -> (CardsService, Repository) {
        let repo = create_test_repo().await;
        (CardsService::new(repo.clone()), repo)
    }

    fn card_req(title: &str, project_id: Option<&str>, tags: &[&str]) -> CreateCardRequest {
        CreateCardRequest {
            title: title.to_string(),
            content: "{}".to_string(),
            project_id: project_id.map(str::to_string),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_card() {
        let (service, repo) = create_test_service().await;
        let user = create_user(&repo, "u@example.com").await;

        let card = service
            .create_card(&user.id, card_req("  Seed idea ", None, &["개발"]))
            .await
            .unwrap();
        assert_eq!(card.title, "Seed idea");

        let fetched = service.get_card(&user.id, &card.id).await.unwrap();
        assert_eq!(fetched.tags, vec!["개발"]);
    }

    #[tokio::test]
    async fn test_title_rules() {
        let (service, repo) = create_test_service().await;
        let user = create_user(&repo, "u@example.com").await;

        assert!(matches!(
            service.create_card(&user.id, card_req("  ", None, &[])).await,
            Err(AppError::Validation(_))
        ));

        let long = "x".repeat(MAX_TITLE_LENGTH + 1);
        assert!(service
            .create_card(&user.id, card_req(&long, None, &[]))
            .await
            .is_err());

        let long_tag = "t".repeat(MAX_TAG_NAME_LENGTH + 1);
        assert!(service
            .create_card(&user.id, card_req("ok", None, &[&long_tag]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_visibility() {
        let (service, repo) = create_test_service().await;
        let owner = create_user(&repo, "owner@example.com").await;
        let other = create_user(&repo, "other@example.com").await;
        let project = create_project(&repo, &owner).await;

        let private = service
            .create_card(&owner.id, card_req("Private", None, &[]))
            .await
            .unwrap();
        let shared = service
            .create_card(&owner.id, card_req("Shared", Some(&project.id), &[]))
            .await
            .unwrap();

        assert!(matches!(
            service.get_card(&other.id, &private.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(service.get_card(&other.id, &shared.id).await.is_err());

        repo.add_project_member(&project.id, &other.id).await.unwrap();
        assert!(service.get_card(&other.id, &shared.id).await.is_ok());

        assert!(matches!(
            service
                .create_card(&other.id, card_req("Sneaky", Some("missing"), &[]))
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_tags_and_delete() {
        let (service, repo) = create_test_service().await;
        let user = create_user(&repo, "u@example.com").await;

        let card = service
            .create_card(&user.id, card_req("Tagged", None, &["a", "b"]))
            .await
            .unwrap();

        let updated = service
            .update_card(
                &user.id,
                &card.id,
                UpdateCardRequest {
                    tags: Some(vec!["b".to_string(), "c".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tags, vec!["b", "c"]);
        assert_eq!(updated.title, "Tagged");

        service.delete_card(&user.id, &card.id).await.unwrap();
        assert!(matches!(
            service.get_card(&user.id, &card.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_by_query() {
        let (service, repo) = create_test_service().await;
        let user = create_user(&repo, "u@example.com").await;

        service
            .create_card(&user.id, card_req("Apple", None, &[]))
            .await
            .unwrap();
        service
            .create_card(&user.id, card_req("Banana", None, &[]))
            .await
            .unwrap();

        let found = service
            .list_cards(
                &user.id,
                &CardFilter {
                    q: Some("app".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Apple");
    }
}
