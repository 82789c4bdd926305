//! Settings handlers
//!
//! GET   /api/settings         stored settings; defaults are persisted on first read
//! PATCH /api/settings         {"section": "...", "values": {...}}
//! POST  /api/settings/reset

use super::{ApiJson, CurrentUser};
use crate::app::AppState;
use crate::error::Result;
use crate::services::settings::{Settings, SettingsUpdate};
use axum::extract::State;
use axum::{Extension, Json};

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Settings>> {
    Ok(Json(state.settings.get(current.id()).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(update): ApiJson<SettingsUpdate>,
) -> Result<Json<Settings>> {
    Ok(Json(state.settings.update(current.id(), &update).await?))
}

pub async fn reset_settings(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Settings>> {
    Ok(Json(state.settings.reset(current.id()).await?))
}
