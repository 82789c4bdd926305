//! Tag handlers
//!
//! GET    /api/tags
//! POST   /api/tags       {name}; empty name is 400, duplicate is 409
//! GET    /api/tags/:id
//! PATCH  /api/tags/:id   {name}
//! DELETE /api/tags/:id

use super::ApiJson;
use crate::app::AppState;
use crate::database::{Tag, TagRequest};
use crate::error::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(state.tags.list_tags().await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TagRequest>,
) -> Result<(StatusCode, Json<Tag>)> {
    let tag = state.tags.create_tag(&req.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Tag>> {
    Ok(Json(state.tags.get_tag(&id).await?))
}

pub async fn rename_tag(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TagRequest>,
) -> Result<Json<Tag>> {
    Ok(Json(state.tags.rename_tag(&id, &req.name).await?))
}

pub async fn delete_tag(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    state.tags.delete_tag(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
