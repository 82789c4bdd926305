//! Idea-map handlers
//!
//! GET  /api/projects/:id/ideamap          {nodes, edges} for the canvas
//! POST /api/projects/:id/ideamap/layout   {direction?}; lays out and saves positions

use super::{ApiJson, CurrentUser};
use crate::app::AppState;
use crate::error::Result;
use crate::ideamap::IdeaMap;
use crate::services::LayoutRequest;
use axum::extract::{Path, State};
use axum::{Extension, Json};

pub async fn load_ideamap(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(project_id): Path<String>,
) -> Result<Json<IdeaMap>> {
    Ok(Json(state.ideamap.load(current.id(), &project_id).await?))
}

pub async fn auto_layout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(project_id): Path<String>,
    ApiJson(req): ApiJson<LayoutRequest>,
) -> Result<Json<IdeaMap>> {
    Ok(Json(
        state
            .ideamap
            .auto_layout(current.id(), &project_id, req)
            .await?,
    ))
}
