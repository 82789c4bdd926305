//! Edge handlers
//!
//! GET    /api/edges?projectId=&source=&target=
//! POST   /api/edges
//! POST   /api/edges/batch-delete
//! GET    /api/edges/:id
//! PATCH  /api/edges/:id
//! DELETE /api/edges/:id

use super::{ApiJson, ApiQuery, CurrentUser};
use crate::app::AppState;
use crate::database::{
    BatchDeleteRequest, BatchDeleteResponse, Edge, EdgeFilter, EdgeInput, UpdateEdgeRequest,
};
use crate::error::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

pub async fn list_edges(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiQuery(filter): ApiQuery<EdgeFilter>,
) -> Result<Json<Vec<Edge>>> {
    Ok(Json(state.edges.list_edges(current.id(), &filter).await?))
}

pub async fn create_edge(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(input): ApiJson<EdgeInput>,
) -> Result<(StatusCode, Json<Edge>)> {
    let edge = state.edges.create_edge(current.id(), input).await?;
    Ok((StatusCode::CREATED, Json(edge)))
}

pub async fn get_edge(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Edge>> {
    Ok(Json(state.edges.get_edge(current.id(), &id).await?))
}

pub async fn update_edge(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateEdgeRequest>,
) -> Result<Json<Edge>> {
    Ok(Json(state.edges.update_edge(current.id(), &id, req).await?))
}

pub async fn delete_edge(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.edges.delete_edge(current.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn batch_delete_edges(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<BatchDeleteRequest>,
) -> Result<Json<BatchDeleteResponse>> {
    let deleted = state.edges.delete_edges(current.id(), &req.ids).await?;
    Ok(Json(BatchDeleteResponse { deleted }))
}
