//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::config::ServerConfig;
use crate::database::{create_pool, Repository};
use crate::error::Result;
use crate::services::{
    AuthService, CardNodesService, CardsService, EdgesService, IdeaMapService, MaintenanceTask,
    ProjectsService, SettingsService, TagsService,
};
use std::sync::Arc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub repo: Repository,
    pub auth: AuthService,
    pub projects: ProjectsService,
    pub cards: CardsService,
    pub card_nodes: CardNodesService,
    pub edges: EdgesService,
    pub tags: TagsService,
    pub settings: SettingsService,
    pub ideamap: IdeaMapService,
}

impl AppState {
    pub fn new(repo: Repository, config: ServerConfig) -> Self {
        let settings = SettingsService::new(repo.clone());

        Self {
            auth: AuthService::new(repo.clone(), config.session_ttl_hours),
            projects: ProjectsService::new(repo.clone()),
            cards: CardsService::new(repo.clone()),
            card_nodes: CardNodesService::new(repo.clone()),
            edges: EdgesService::new(repo.clone()),
            tags: TagsService::new(repo.clone()),
            ideamap: IdeaMapService::new(repo.clone(), settings.clone()),
            settings,
            config: Arc::new(config),
            repo,
        }
    }

    /// Database maintenance job bound to this state's repository
    pub fn maintenance_task(&self) -> MaintenanceTask {
        MaintenanceTask::new(self.repo.clone(), self.config.project_retention_days)
    }
}

/// Application setup - called once on startup
pub async fn setup(config: ServerConfig) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Database path: {:?}", config.database_path);

    let pool = create_pool(&config.database_path).await?;
    let state = AppState::new(Repository::new(pool), config);

    tracing::info!("Application initialized successfully");

    Ok(state)
}
