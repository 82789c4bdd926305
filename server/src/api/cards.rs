//! Card handlers
//!
//! GET    /api/cards?projectId=&tag=&q=
//! POST   /api/cards
//! GET    /api/cards/:id
//! PATCH  /api/cards/:id
//! DELETE /api/cards/:id

use super::{ApiJson, ApiQuery, CurrentUser};
use crate::app::AppState;
use crate::database::{Card, CardFilter, CreateCardRequest, UpdateCardRequest};
use crate::error::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

pub async fn list_cards(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiQuery(filter): ApiQuery<CardFilter>,
) -> Result<Json<Vec<Card>>> {
    Ok(Json(state.cards.list_cards(current.id(), &filter).await?))
}

pub async fn create_card(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>)> {
    let card = state.cards.create_card(current.id(), req).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn get_card(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<Card>> {
    Ok(Json(state.cards.get_card(current.id(), &id).await?))
}

pub async fn update_card(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateCardRequest>,
) -> Result<Json<Card>> {
    Ok(Json(state.cards.update_card(current.id(), &id, req).await?))
}

pub async fn delete_card(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.cards.delete_card(current.id(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
