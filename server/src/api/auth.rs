//! Session middleware and authentication handlers
//!
//! POST /api/auth/signup   create an account and sign in
//! POST /api/auth/signin   exchange credentials for a session token
//! POST /api/auth/signout  close the current session
//! GET  /api/auth/me       the signed-in user

use super::ApiJson;
use crate::app::AppState;
use crate::config::SESSION_COOKIE;
use crate::database::{AuthResponse, SignInRequest, SignUpRequest, User};
use crate::error::{AppError, Result};
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};

/// The authenticated caller, inserted by `require_session`
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

/// Session token from a bearer header, or failing that the session cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
}

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Sign-in required".to_string()))?;

    let user = state.auth.authenticate(&token).await?;
    request
        .extensions_mut()
        .insert(CurrentUser { user, token });

    Ok(next.run(request).await)
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

pub async fn sign_up(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignUpRequest>,
) -> Result<impl IntoResponse> {
    let auth = state.auth.sign_up(req).await?;
    let cookie = session_cookie(&auth.token, state.config.session_ttl_hours * 3600);
    Ok((StatusCode::CREATED, [(SET_COOKIE, cookie)], Json(auth)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignInRequest>,
) -> Result<impl IntoResponse> {
    let auth: AuthResponse = state.auth.sign_in(req).await?;
    let cookie = session_cookie(&auth.token, state.config.session_ttl_hours * 3600);
    Ok(([(SET_COOKIE, cookie)], Json(auth)))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse> {
    state.auth.sign_out(&current.token).await?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, session_cookie("", 0))]))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}
