//! Project handlers
//!
//! GET    /api/projects                        projects the caller owns or joined
//! POST   /api/projects                        create
//! GET    /api/projects/:id                    read
//! PATCH  /api/projects/:id                    rename or describe
//! DELETE /api/projects/:id                    move to trash (owner only)
//! POST   /api/projects/:id/restore            restore from trash (owner only)
//! GET    /api/projects/:id/members            list members
//! POST   /api/projects/:id/members            add a member by email (owner only)
//! DELETE /api/projects/:id/members/:user_id   remove a member (owner only)

use super::{ApiJson, ApiQuery, CurrentUser};
use crate::app::AppState;
use crate::database::{AddMemberRequest, CreateProjectRequest, Project, UpdateProjectRequest, User};
use crate::error::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<ProjectListQuery>,
) -> Result<Json<Vec<Project>>> {
    let projects = state
        .projects
        .list_projects(current.id(), query.include_deleted)
        .await?;
    Ok(Json(projects))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>)> {
    let project = state.projects.create_project(current.id(), req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    Ok(Json(state.projects.get_project(current.id(), &id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Result<Json<Project>> {
    Ok(Json(
        state.projects.update_project(current.id(), &id, req).await?,
    ))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.projects.delete_project(current.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_project(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Project>> {
    Ok(Json(state.projects.restore_project(current.id(), &id).await?))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.projects.list_members(current.id(), &id).await?))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AddMemberRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let member = state
        .projects
        .add_member(current.id(), &id, &req.email)
        .await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    state
        .projects
        .remove_member(current.id(), &id, &user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
