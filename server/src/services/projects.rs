//! Projects service
//!
//! Project lifecycle, membership, and the access checks every other
//! project-scoped service goes through.

use crate::config::MAX_PROJECT_NAME_LENGTH;
use crate::database::{CreateProjectRequest, Project, Repository, UpdateProjectRequest, User};
use crate::error::{AppError, Result};

/// A live project the user owns or belongs to
pub(crate) async fn require_project_access(
    repo: &Repository,
    project_id: &str,
    user_id: &str,
) -> Result<Project> {
    let project = repo
        .find_project(project_id)
        .await?
        .filter(|p| !p.is_deleted)
        .ok_or_else(|| AppError::not_found("Project", project_id))?;

    if project.owner_id == user_id || repo.is_project_member(project_id, user_id).await? {
        Ok(project)
    } else {
        tracing::warn!("User {} denied access to project {}", user_id, project_id);
        Err(AppError::Forbidden(
            "You do not have access to this project".to_string(),
        ))
    }
}

/// A project owned by the user; soft-deleted projects included
async fn require_project_owner(
    repo: &Repository,
    project_id: &str,
    user_id: &str,
) -> Result<Project> {
    let project = repo
        .find_project(project_id)
        .await?
        .ok_or_else(|| AppError::not_found("Project", project_id))?;

    if project.owner_id != user_id {
        return Err(AppError::Forbidden(
            "Only the project owner can do this".to_string(),
        ));
    }

    Ok(project)
}

fn validate_project_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Project name is required".to_string()));
    }
    if name.chars().count() > MAX_PROJECT_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Project name must be at most {} characters",
            MAX_PROJECT_NAME_LENGTH
        )));
    }
    Ok(name.to_string())
}

/// Service for managing projects
#[derive(Clone)]
pub struct ProjectsService {
    repo: Repository,
}

impl ProjectsService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn create_project(&self, user_id: &str, req: CreateProjectRequest) -> Result<Project> {
        let req = CreateProjectRequest {
            name: validate_project_name(&req.name)?,
            description: req.description,
        };

        let project = self.repo.create_project(user_id, &req).await?;
        tracing::info!("Project created: {} ({})", project.name, project.id);

        Ok(project)
    }

    pub async fn list_projects(&self, user_id: &str, include_deleted: bool) -> Result<Vec<Project>> {
        let mut projects = self
            .repo
            .list_projects_for_user(user_id, include_deleted)
            .await?;

        // Members never see a project's trash, only its owner does
        projects.retain(|p| !p.is_deleted || p.owner_id == user_id);
        Ok(projects)
    }

    pub async fn get_project(&self, user_id: &str, id: &str) -> Result<Project> {
        require_project_access(&self.repo, id, user_id).await
    }

    pub async fn update_project(
        &self,
        user_id: &str,
        id: &str,
        req: UpdateProjectRequest,
    ) -> Result<Project> {
        require_project_access(&self.repo, id, user_id).await?;

        let req = UpdateProjectRequest {
            name: req.name.as_deref().map(validate_project_name).transpose()?,
            description: req.description,
        };

        let project = self.repo.update_project(id, &req).await?;
        tracing::debug!("Project updated: {}", id);

        Ok(project)
    }

    /// Move a project to the trash
    pub async fn delete_project(&self, user_id: &str, id: &str) -> Result<()> {
        require_project_owner(&self.repo, id, user_id).await?;
        self.repo.soft_delete_project(id).await?;
        tracing::info!("Project moved to trash: {}", id);
        Ok(())
    }

    pub async fn restore_project(&self, user_id: &str, id: &str) -> Result<Project> {
        let project = require_project_owner(&self.repo, id, user_id).await?;
        if !project.is_deleted {
            return Ok(project);
        }

        let project = self.repo.restore_project(id).await?;
        tracing::info!("Project restored: {}", id);
        Ok(project)
    }

    pub async fn list_members(&self, user_id: &str, id: &str) -> Result<Vec<User>> {
        require_project_access(&self.repo, id, user_id).await?;
        self.repo.list_project_members(id).await
    }

    pub async fn add_member(&self, user_id: &str, id: &str, email: &str) -> Result<User> {
        let project = require_project_owner(&self.repo, id, user_id).await?;
        if project.is_deleted {
            return Err(AppError::not_found("Project", id));
        }

        let member = self
            .repo
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No user with email: {}", email)))?;

        if member.id == project.owner_id {
            return Err(AppError::Validation(
                "The owner is already part of the project".to_string(),
            ));
        }

        self.repo.add_project_member(id, &member.id).await?;
        tracing::info!("Added member {} to project {}", member.id, id);

        Ok(member)
    }

    pub async fn remove_member(&self, user_id: &str, id: &str, member_id: &str) -> Result<()> {
        require_project_owner(&self.repo, id, user_id).await?;

        if !self.repo.remove_project_member(id, member_id).await? {
            return Err(AppError::NotFound(format!(
                "User {} is not a member of project {}",
                member_id, id
            )));
        }

        tracing::info!("Removed member {} from project {}", member_id, id);
        Ok(())
    }
}
