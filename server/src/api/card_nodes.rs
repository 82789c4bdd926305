//! Card placement handlers
//!
//! GET    /api/cardnodes?projectId=
//! POST   /api/cardnodes
//! GET    /api/cardnodes/:id
//! PATCH  /api/cardnodes/:id
//! DELETE /api/cardnodes/:id   removes the placement only

use super::{ApiJson, ApiQuery, CurrentUser};
use crate::app::AppState;
use crate::database::{CardNode, CardNodeFilter, CreateCardNodeRequest, UpdateCardNodeRequest};
use crate::error::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

pub async fn list_card_nodes(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiQuery(filter): ApiQuery<CardNodeFilter>,
) -> Result<Json<Vec<CardNode>>> {
    Ok(Json(
        state.card_nodes.list_card_nodes(current.id(), &filter).await?,
    ))
}

pub async fn create_card_node(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateCardNodeRequest>,
) -> Result<(StatusCode, Json<CardNode>)> {
    let node = state.card_nodes.create_card_node(current.id(), req).await?;
    Ok((StatusCode::CREATED, Json(node)))
}

pub async fn get_card_node(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<CardNode>> {
    Ok(Json(state.card_nodes.get_card_node(current.id(), &id).await?))
}

pub async fn update_card_node(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCardNodeRequest>,
) -> Result<Json<CardNode>> {
    Ok(Json(
        state
            .card_nodes
            .update_card_node(current.id(), &id, req)
            .await?,
    ))
}

pub async fn delete_card_node(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.card_nodes.delete_card_node(current.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
