//! Tags service
//!
//! Tag names are global and unique. Usage counts are maintained by the
//! card repository as cards gain and lose tags.

use crate::config::MAX_TAG_NAME_LENGTH;
use crate::database::{Repository, Tag};
use crate::error::{AppError, Result};

fn validate_tag_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Tag name is required".to_string()));
    }
    if name.chars().count() > MAX_TAG_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Tag name must be at most {} characters",
            MAX_TAG_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

#[derive(Clone)]
pub struct TagsService {
    repo: Repository,
}

impl TagsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.repo.list_tags().await
    }

    pub async fn get_tag(&self, id: &str) -> Result<Tag> {
        self.repo
            .find_tag(id)
            .await?
            .ok_or_else(|| AppError::not_found("Tag", id))
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let name = validate_tag_name(name)?;

        if self.repo.find_tag_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict(format!("Tag already exists: {}", name)));
        }

        let tag = self.repo.create_tag(&name).await?;
        tracing::info!("Tag created: {}", tag.name);
        Ok(tag)
    }

    pub async fn rename_tag(&self, id: &str, name: &str) -> Result<Tag> {
        let name = validate_tag_name(name)?;
        self.get_tag(id).await?;

        if let Some(existing) = self.repo.find_tag_by_name(&name).await? {
            if existing.id != id {
                return Err(AppError::Conflict(format!("Tag already exists: {}", name)));
            }
        }

        self.repo.rename_tag(id, &name).await
    }

    /// Delete a tag. Cards that carried it keep existing.
    pub async fn delete_tag(&self, id: &str) -> Result<()> {
        if !self.repo.delete_tag(id).await? {
            return Err(AppError::not_found("Tag", id));
        }

        tracing::info!("Tag deleted: {}", id);
        Ok(())
    }
}
