use super::Repository;
use crate::database::models::{CreateProjectRequest, Project, UpdateProjectRequest, User};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

impl Repository {
    pub async fn create_project(&self, owner_id: &str, req: &CreateProjectRequest) -> Result<Project> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (id, name, description, owner_id, is_deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created project: {}", id);
        Ok(project)
    }

    /// Find a project regardless of its deletion state
    pub async fn find_project(&self, id: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    /// Projects the user owns or is a member of
    pub async fn list_projects_for_user(
        &self,
        user_id: &str,
        include_deleted: bool,
    ) -> Result<Vec<Project>> {
        let mut query = r#"
            SELECT * FROM projects
            WHERE (owner_id = ? OR id IN (SELECT project_id FROM project_members WHERE user_id = ?))
            "#
        .to_string();

        if !include_deleted {
            query.push_str(" AND is_deleted = 0");
        }
        query.push_str(" ORDER BY updated_at DESC");

        let projects = sqlx::query_as::<_, Project>(&query)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(projects)
    }

    pub async fn update_project(&self, id: &str, req: &UpdateProjectRequest) -> Result<Project> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET name = COALESCE(?, name),
                description = COALESCE(?, description),
                updated_at = ?
            WHERE id = ? AND is_deleted = 0
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.description)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Project", id))?;

        Ok(project)
    }

    pub async fn soft_delete_project(&self, id: &str) -> Result<()> {
        let now = Utc::now();

        let rows = sqlx::query(
            "UPDATE projects SET is_deleted = 1, deleted_at = ?, updated_at = ? WHERE id = ? AND is_deleted = 0",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Project", id));
        }

        tracing::debug!("Soft deleted project: {}", id);
        Ok(())
    }

    pub async fn restore_project(&self, id: &str) -> Result<Project> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET is_deleted = 0, deleted_at = NULL, updated_at = ?
            WHERE id = ? AND is_deleted = 1
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No deleted project with id: {}", id)))?;

        tracing::debug!("Restored project: {}", id);
        Ok(project)
    }

    /// Hard-delete projects soft-deleted before the cutoff
    pub async fn purge_deleted_projects(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let rows = sqlx::query("DELETE FROM projects WHERE is_deleted = 1 AND deleted_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Purged {} deleted projects", rows);
        Ok(rows)
    }

    pub async fn is_project_member(&self, project_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn add_project_member(&self, project_id: &str, user_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO project_members (project_id, user_id, created_at) VALUES (?, ?, ?)
            ON CONFLICT(project_id, user_id) DO NOTHING
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Added member {} to project {}", user_id, project_id);
        Ok(())
    }

    pub async fn remove_project_member(&self, project_id: &str, user_id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows > 0)
    }

    pub async fn list_project_members(&self, project_id: &str) -> Result<Vec<User>> {
        let members = sqlx::query_as::<_, User>(
            r#"
            SELECT u.* FROM users u
            JOIN project_members m ON m.user_id = u.id
            WHERE m.project_id = ?
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::database::UpdateProjectRequest;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let repo = create_test_repo().await;
        let owner = create_user(&repo, "owner@example.com").await;
        let project = create_project(&repo, &owner).await;

        repo.soft_delete_project(&project.id).await.unwrap();

        let deleted = repo.find_project(&project.id).await.unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert!(deleted.deleted_at.is_some());
        assert!(repo
            .list_projects_for_user(&owner.id, false)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.list_projects_for_user(&owner.id, true)
                .await
                .unwrap()
                .len(),
            1
        );

        let restored = repo.restore_project(&project.id).await.unwrap();
        assert!(!restored.is_deleted);
        assert!(restored.deleted_at.is_none());

        // Restoring a live project is an error
        assert!(repo.restore_project(&project.id).await.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let repo = create_test_repo().await;
        let owner = create_user(&repo, "owner@example.com").await;
        let project = create_project(&repo, &owner).await;

        let updated = repo
            .update_project(
                &project.id,
                &UpdateProjectRequest {
                    name: None,
                    description: Some("seeds".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Garden");
        assert_eq!(updated.description.as_deref(), Some("seeds"));
    }

    #[tokio::test]
    async fn test_members() {
        let repo = create_test_repo().await;
        let owner = create_user(&repo, "owner@example.com").await;
        let guest = create_user(&repo, "guest@example.com").await;
        let project = create_project(&repo, &owner).await;

        assert!(!repo.is_project_member(&project.id, &guest.id).await.unwrap());

        repo.add_project_member(&project.id, &guest.id).await.unwrap();
        repo.add_project_member(&project.id, &guest.id).await.unwrap();

        assert!(repo.is_project_member(&project.id, &guest.id).await.unwrap());
        assert_eq!(repo.list_project_members(&project.id).await.unwrap().len(), 1);
        assert_eq!(
            repo.list_projects_for_user(&guest.id, false)
                .await
                .unwrap()
                .len(),
            1
        );

        assert!(repo.remove_project_member(&project.id, &guest.id).await.unwrap());
        assert!(!repo.is_project_member(&project.id, &guest.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_only_old_deleted_projects() {
        let repo = create_test_repo().await;
        let owner = create_user(&repo, "owner@example.com").await;
        let old = create_project(&repo, &owner).await;
        let live = create_project(&repo, &owner).await;

        repo.soft_delete_project(&old.id).await.unwrap();

        let purged = repo
            .purge_deleted_projects(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(repo.find_project(&old.id).await.unwrap().is_none());
        assert!(repo.find_project(&live.id).await.unwrap().is_some());
    }
}
