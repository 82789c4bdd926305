use super::Repository;
use crate::database::models::Tag;
use crate::error::{AppError, Result};
use chrono::Utc;
use uuid::Uuid;

impl Repository {
    /// All tags, most used first
    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY count DESC, name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    pub async fn find_tag(&self, id: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    pub async fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    pub async fn create_tag(&self, name: &str) -> Result<Tag> {
        let id = Uuid::new_v4().to_string();

        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (id, name, count, created_at) VALUES (?, ?, 0, ?) RETURNING *",
        )
        .bind(&id)
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created tag: {} ({})", name, id);
        Ok(tag)
    }

    pub async fn rename_tag(&self, id: &str, name: &str) -> Result<Tag> {
        let tag = sqlx::query_as::<_, Tag>("UPDATE tags SET name = ? WHERE id = ? RETURNING *")
            .bind(name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Tag", id))?;
        Ok(tag)
    }

    /// Delete a tag; its card links go with it, the cards stay
    pub async fn delete_tag(&self, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM tags WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Deleted tag: {}", id);
        Ok(rows > 0)
    }
}
