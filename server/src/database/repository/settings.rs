use super::Repository;
use crate::error::Result;
use chrono::Utc;

impl Repository {
    /// Raw settings document for a user, if one was ever stored
    pub async fn get_user_settings(&self, user_id: &str) -> Result<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT settings_json FROM user_settings WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    pub async fn set_user_settings(&self, user_id: &str, settings_json: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, settings_json, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                settings_json = excluded.settings_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(settings_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored settings for user: {}", user_id);
        Ok(())
    }
}
