//! Repository layer for database operations
//!
//! This module provides CRUD operations for all entities. Operations that
//! touch more than one table run inside a transaction.

mod card_nodes;
mod cards;
mod edges;
mod projects;
mod settings;
mod tags;
mod users;

use sqlx::SqlitePool;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Repository;
    use crate::database::{create_memory_pool, CreateProjectRequest, Project, User};

    pub async fn create_test_repo() -> Repository {
        Repository::new(create_memory_pool().await.unwrap())
    }

    pub async fn create_user(repo: &Repository, email: &str) -> User {
        repo.create_user(email, "Tester", "$argon2id$placeholder")
            .await
            .unwrap()
    }

    pub async fn create_project(repo: &Repository, owner: &User) -> Project {
        repo.create_project(
            &owner.id,
            &CreateProjectRequest {
                name: "Garden".to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
    }
}
