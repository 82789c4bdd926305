use super::Repository;
use crate::database::models::{Card, CardFilter, CreateCardRequest, UpdateCardRequest};
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

/// Cards joined with their placement in their own project
const CARD_SELECT: &str = r#"
    SELECT c.*, cn.position_x AS position_x, cn.position_y AS position_y
    FROM cards c
    LEFT JOIN card_nodes cn ON cn.card_id = c.id AND cn.project_id = c.project_id
"#;

impl Repository {
    /// Create a card and attach its tags, creating tags on first use
    pub async fn create_card(&self, user_id: &str, req: &CreateCardRequest) -> Result<Card> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO cards (id, title, content, project_id, user_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.project_id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        attach_tags(&mut tx, &id, &req.tags).await?;

        tx.commit().await?;

        tracing::debug!("Created card: {}", id);
        self.find_card(&id)
            .await?
            .ok_or_else(|| AppError::not_found("Card", &id))
    }

    pub async fn find_card(&self, id: &str) -> Result<Option<Card>> {
        let query = format!("{} WHERE c.id = ?", CARD_SELECT);

        let card = sqlx::query_as::<_, Card>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match card {
            Some(card) => {
                let mut cards = vec![card];
                self.load_tags(&mut cards).await?;
                Ok(cards.pop())
            }
            None => Ok(None),
        }
    }

    /// List cards visible to a user, oldest first.
    ///
    /// With a project filter this is everything on the project's map: its own
    /// cards plus cards from elsewhere placed on it, positioned by their
    /// placement in that project. Without one it covers the user's own cards
    /// plus cards of every live project they own or belong to.
    pub async fn list_cards(&self, user_id: &str, filter: &CardFilter) -> Result<Vec<Card>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT c.*, cn.position_x AS position_x, cn.position_y AS position_y FROM cards c ",
        );

        match &filter.project_id {
            Some(project_id) => {
                builder.push("LEFT JOIN card_nodes cn ON cn.card_id = c.id AND cn.project_id = ");
                builder.push_bind(project_id.clone());
                builder.push(" WHERE (c.project_id = ");
                builder.push_bind(project_id.clone());
                builder.push(" OR cn.id IS NOT NULL)");
            }
            None => {
                builder.push(
                    "LEFT JOIN card_nodes cn ON cn.card_id = c.id AND cn.project_id = c.project_id WHERE (c.user_id = ",
                );
                builder.push_bind(user_id.to_string());
                builder.push(" OR c.project_id IN (SELECT id FROM projects WHERE owner_id = ");
                builder.push_bind(user_id.to_string());
                builder.push(
                    " AND is_deleted = 0 UNION SELECT m.project_id FROM project_members m \
                     JOIN projects p ON p.id = m.project_id WHERE m.user_id = ",
                );
                builder.push_bind(user_id.to_string());
                builder.push(" AND p.is_deleted = 0))");
            }
        }

        if let Some(tag) = &filter.tag {
            builder.push(
                " AND c.id IN (SELECT ct.card_id FROM card_tags ct JOIN tags t ON t.id = ct.tag_id WHERE t.name = ",
            );
            builder.push_bind(tag.trim().to_string());
            builder.push(")");
        }

        if let Some(q) = filter.q.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = format!("%{}%", escape_like(&q.trim().to_lowercase()));
            builder.push(" AND (LOWER(c.title) LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" ESCAPE '\\' OR LOWER(c.content) LIKE ");
            builder.push_bind(pattern);
            builder.push(" ESCAPE '\\')");
        }

        builder.push(" ORDER BY c.created_at ASC, c.id ASC");

        let mut cards = builder
            .build_query_as::<Card>()
            .fetch_all(&self.pool)
            .await?;
        self.load_tags(&mut cards).await?;

        Ok(cards)
    }

    pub async fn update_card(&self, id: &str, req: &UpdateCardRequest) -> Result<Card> {
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query(
            r#"
            UPDATE cards
            SET title = COALESCE(?, title),
                content = COALESCE(?, content),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.title)
        .bind(&req.content)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::not_found("Card", id));
        }

        if let Some(tags) = &req.tags {
            detach_all_tags(&mut tx, id).await?;
            attach_tags(&mut tx, id, tags).await?;
        }

        tx.commit().await?;

        self.find_card(id)
            .await?
            .ok_or_else(|| AppError::not_found("Card", id))
    }

    /// Delete a card together with its placements, tag links and edges
    pub async fn delete_card(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        detach_all_tags(&mut tx, id).await?;

        sqlx::query("DELETE FROM edges WHERE source = ? OR target = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let rows = sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        tracing::debug!("Deleted card: {}", id);
        Ok(rows > 0)
    }

    /// Fill in tag names for a batch of cards
    async fn load_tags(&self, cards: &mut [Card]) -> Result<()> {
        if cards.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT ct.card_id, t.name FROM card_tags ct JOIN tags t ON t.id = ct.tag_id WHERE ct.card_id IN (",
        );
        let mut separated = builder.separated(", ");
        for card in cards.iter() {
            separated.push_bind(card.id.clone());
        }
        separated.push_unseparated(") ORDER BY t.name ASC");

        let rows: Vec<(String, String)> = builder.build_query_as().fetch_all(&self.pool).await?;

        let mut by_card: HashMap<String, Vec<String>> = HashMap::new();
        for (card_id, name) in rows {
            by_card.entry(card_id).or_default().push(name);
        }

        for card in cards.iter_mut() {
            card.tags = by_card.remove(&card.id).unwrap_or_default();
        }

        Ok(())
    }
}

/// Link tags by name, creating missing tags and bumping usage counts
/// Make `%`, `_` and the escape character itself match literally in a LIKE pattern
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

async fn attach_tags(conn: &mut SqliteConnection, card_id: &str, names: &[String]) -> Result<()> {
    for name in normalize_tag_names(names) {
        sqlx::query(
            r#"
            INSERT INTO tags (id, name, count, created_at) VALUES (?, ?, 0, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&name)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let tag_id: String = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
            .bind(&name)
            .fetch_one(&mut *conn)
            .await?;

        let linked = sqlx::query("INSERT OR IGNORE INTO card_tags (card_id, tag_id) VALUES (?, ?)")
            .bind(card_id)
            .bind(&tag_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        if linked > 0 {
            sqlx::query("UPDATE tags SET count = count + 1 WHERE id = ?")
                .bind(&tag_id)
                .execute(&mut *conn)
                .await?;
        }
    }

    Ok(())
}

async fn detach_all_tags(conn: &mut SqliteConnection, card_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE tags SET count = MAX(count - 1, 0)
        WHERE id IN (SELECT tag_id FROM card_tags WHERE card_id = ?)
        "#,
    )
    .bind(card_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM card_tags WHERE card_id = ?")
        .bind(card_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Trimmed, non-empty, de-duplicated tag names in first-seen order
pub(crate) fn normalize_tag_names(names: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for name in names {
        let trimmed = name.trim();
        if !trimmed.is_empty() && !seen.iter().any(|s: &String| s == trimmed) {
            seen.push(trimmed.to_string());
        }
    }
    seen
}
