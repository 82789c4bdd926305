//! Database schema and migrations
//!
//! Versioned SQL migrations are embedded at compile time and applied in order,
//! each inside its own transaction.

use crate::error::Result;
use sqlx::sqlite::SqlitePool;

/// Initialize database with schema
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Initializing database schema");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current = current_version(pool).await?;
    tracing::info!("Current database version: {}", current);

    apply_migrations(pool, current).await?;

    tracing::info!("Database initialization complete");
    Ok(())
}

/// Highest applied migration version (0 for an empty database)
pub async fn current_version(pool: &SqlitePool) -> Result<i64> {
    let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

async fn apply_migrations(pool: &SqlitePool, current_version: i64) -> Result<()> {
    for (version, sql) in migrations() {
        if version <= current_version {
            continue;
        }

        tracing::info!("Applying migration version {}", version);

        let mut tx = pool.begin().await?;

        for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query("INSERT INTO migrations (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
    }

    Ok(())
}

fn migrations() -> Vec<(i64, &'static str)> {
    vec![(1, include_str!("migrations/001_initial_schema.sql"))]
}
