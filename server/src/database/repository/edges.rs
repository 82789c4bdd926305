use super::Repository;
use crate::database::models::{Edge, EdgeFilter, EdgeInput, UpdateEdgeRequest};
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

impl Repository {
    pub async fn create_edge(&self, user_id: &str, input: &EdgeInput) -> Result<Edge> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let edge = sqlx::query_as::<_, Edge>(
            r#"
            INSERT INTO edges (id, source, target, source_handle, target_handle, edge_type, animated,
                               style, data, user_id, project_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&input.source)
        .bind(&input.target)
        .bind(&input.source_handle)
        .bind(&input.target_handle)
        .bind(&input.edge_type)
        .bind(input.animated)
        .bind(Json(&input.style))
        .bind(Json(&input.data))
        .bind(user_id)
        .bind(&input.project_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created edge: {} ({} -> {})", id, input.source, input.target);
        Ok(edge)
    }

    pub async fn find_edge(&self, id: &str) -> Result<Option<Edge>> {
        let edge = sqlx::query_as::<_, Edge>("SELECT * FROM edges WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(edge)
    }

    /// Edges of a project, or the user's own edges when no project is given
    pub async fn list_edges(&self, user_id: &str, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM edges WHERE ");

        match &filter.project_id {
            Some(project_id) => {
                builder.push("project_id = ");
                builder.push_bind(project_id.clone());
            }
            None => {
                builder.push("user_id = ");
                builder.push_bind(user_id.to_string());
            }
        }

        if let Some(source) = &filter.source {
            builder.push(" AND source = ");
            builder.push_bind(source.clone());
        }

        if let Some(target) = &filter.target {
            builder.push(" AND target = ");
            builder.push_bind(target.clone());
        }

        builder.push(" ORDER BY created_at ASC");

        Ok(builder
            .build_query_as::<Edge>()
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn update_edge(&self, id: &str, req: &UpdateEdgeRequest) -> Result<Edge> {
        let edge = sqlx::query_as::<_, Edge>(
            r#"
            UPDATE edges
            SET source = COALESCE(?, source),
                target = COALESCE(?, target),
                source_handle = COALESCE(?, source_handle),
                target_handle = COALESCE(?, target_handle),
                edge_type = COALESCE(?, edge_type),
                animated = COALESCE(?, animated),
                style = COALESCE(?, style),
                data = COALESCE(?, data),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(&req.source)
        .bind(&req.target)
        .bind(&req.source_handle)
        .bind(&req.target_handle)
        .bind(&req.edge_type)
        .bind(req.animated)
        .bind(req.style.as_ref().map(Json))
        .bind(req.data.as_ref().map(Json))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Edge", id))?;

        Ok(edge)
    }

    pub async fn delete_edge(&self, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM edges WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Deleted edge: {}", id);
        Ok(rows > 0)
    }

    /// Delete several edges at once, returning how many were removed
    pub async fn delete_edges(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM edges WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows = builder.build().execute(&self.pool).await?.rows_affected();

        tracing::debug!("Batch deleted {} edges", rows);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::database::{EdgeFilter, EdgeInput, UpdateEdgeRequest};
    use serde_json::json;

    fn input(source: &str, target: &str) -> EdgeInput {
        EdgeInput {
            source: source.to_string(),
            target: target.to_string(),
            source_handle: Some("bottom".to_string()),
            target_handle: Some("top".to_string()),
            edge_type: "custom".to_string(),
            animated: false,
            style: json!({"stroke": "#999"}),
            data: json!({}),
            project_id: None,
        }
    }

    #[tokio::test]
    async fn test_edges_allow_duplicates_between_pair() {
        let repo = create_test_repo().await;
        let user = create_user(&repo, "u@example.com").await;

        repo.create_edge(&user.id, &input("a", "b")).await.unwrap();
        repo.create_edge(&user.id, &input("a", "b")).await.unwrap();
        repo.create_edge(&user.id, &input("b", "c")).await.unwrap();

        let from_a = repo
            .list_edges(
                &user.id,
                &EdgeFilter {
                    source: Some("a".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(from_a.len(), 2);
        assert_eq!(from_a[0].style.0["stroke"], "#999");

        let b_to_c = repo
            .list_edges(
                &user.id,
                &EdgeFilter {
                    source: Some("b".to_string()),
                    target: Some("c".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(b_to_c.len(), 1);

        let other = create_user(&repo, "o@example.com").await;
        assert!(repo
            .list_edges(&other.id, &EdgeFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_update_and_batch_delete() {
        let repo = create_test_repo().await;
        let user = create_user(&repo, "u@example.com").await;

        let first = repo.create_edge(&user.id, &input("a", "b")).await.unwrap();
        let second = repo.create_edge(&user.id, &input("b", "c")).await.unwrap();

        let updated = repo
            .update_edge(
                &first.id,
                &UpdateEdgeRequest {
                    animated: Some(true),
                    target: Some("c".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.animated);
        assert_eq!(updated.target, "c");
        assert_eq!(updated.source_handle.as_deref(), Some("bottom"));

        let deleted = repo
            .delete_edges(&[first.id.clone(), second.id.clone(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(repo
            .list_edges(&user.id, &EdgeFilter::default())
            .await
            .unwrap()
            .is_empty());
    }
}
