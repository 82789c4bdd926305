use super::Repository;
use crate::database::models::{CardNode, CreateCardNodeRequest, Position, UpdateCardNodeRequest};
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqliteConnection;
use uuid::Uuid;

impl Repository {
    pub async fn create_card_node(&self, req: &CreateCardNodeRequest) -> Result<CardNode> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let node = sqlx::query_as::<_, CardNode>(
            r#"
            INSERT INTO card_nodes (id, card_id, project_id, position_x, position_y, style, data, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.card_id)
        .bind(&req.project_id)
        .bind(req.position_x)
        .bind(req.position_y)
        .bind(Json(&req.style))
        .bind(Json(&req.data))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Placed card {} on project {}", req.card_id, req.project_id);
        Ok(node)
    }

    pub async fn find_card_node(&self, id: &str) -> Result<Option<CardNode>> {
        let node = sqlx::query_as::<_, CardNode>("SELECT * FROM card_nodes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(node)
    }

    /// A card's placement on one project's map
    pub async fn find_placement(&self, card_id: &str, project_id: &str) -> Result<Option<CardNode>> {
        let node = sqlx::query_as::<_, CardNode>(
            "SELECT * FROM card_nodes WHERE card_id = ? AND project_id = ?",
        )
        .bind(card_id)
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(node)
    }

    pub async fn list_card_nodes(&self, project_id: &str) -> Result<Vec<CardNode>> {
        let nodes = sqlx::query_as::<_, CardNode>(
            "SELECT * FROM card_nodes WHERE project_id = ? ORDER BY created_at ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(nodes)
    }

    pub async fn update_card_node(&self, id: &str, req: &UpdateCardNodeRequest) -> Result<CardNode> {
        let node = sqlx::query_as::<_, CardNode>(
            r#"
            UPDATE card_nodes
            SET position_x = COALESCE(?, position_x),
                position_y = COALESCE(?, position_y),
                style = COALESCE(?, style),
                data = COALESCE(?, data),
                updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(req.position_x)
        .bind(req.position_y)
        .bind(req.style.as_ref().map(Json))
        .bind(req.data.as_ref().map(Json))
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("Card node", id))?;

        Ok(node)
    }

    /// Move a card's placement, creating the placement if it does not exist yet
    pub async fn upsert_card_position(
        &self,
        card_id: &str,
        project_id: &str,
        position: Position,
    ) -> Result<CardNode> {
        let mut conn = self.pool.acquire().await?;
        upsert_position(&mut conn, card_id, project_id, position).await
    }

    /// Save many placements at once; either all of them land or none do
    pub async fn upsert_card_positions(
        &self,
        project_id: &str,
        positions: &[(String, Position)],
    ) -> Result<Vec<CardNode>> {
        let mut tx = self.pool.begin().await?;

        let mut nodes = Vec::with_capacity(positions.len());
        for (card_id, position) in positions {
            nodes.push(upsert_position(&mut tx, card_id, project_id, *position).await?);
        }

        tx.commit().await?;

        tracing::debug!("Saved {} placements on project {}", nodes.len(), project_id);
        Ok(nodes)
    }

    /// Remove a placement; the card itself is untouched
    pub async fn delete_card_node(&self, id: &str) -> Result<bool> {
        let rows = sqlx::query("DELETE FROM card_nodes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!("Deleted card node: {}", id);
        Ok(rows > 0)
    }
}

async fn upsert_position(
    conn: &mut SqliteConnection,
    card_id: &str,
    project_id: &str,
    position: Position,
) -> Result<CardNode> {
    let now = Utc::now();

    let node = sqlx::query_as::<_, CardNode>(
        r#"
        INSERT INTO card_nodes (id, card_id, project_id, position_x, position_y, style, data, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, '{}', '{}', ?, ?)
        ON CONFLICT(card_id, project_id) DO UPDATE SET
            position_x = excluded.position_x,
            position_y = excluded.position_y,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(card_id)
    .bind(project_id)
    .bind(position.x)
    .bind(position.y)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(node)
}
