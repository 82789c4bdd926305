//! HTTP API
//!
//! JSON routes under `/api`. Everything except sign-up, sign-in and the
//! health check sits behind the session middleware.

pub mod auth;
pub mod card_nodes;
pub mod cards;
pub mod edges;
pub mod ideamap;
pub mod projects;
pub mod settings;
pub mod tags;

use crate::app::AppState;
use crate::error::AppError;
use axum::extract::{FromRequest, FromRequestParts, OriginalUri};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use auth::CurrentUser;

/// JSON body whose rejections render as `AppError`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections render as `AppError`
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Build the full router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // Routes that require a signed-in session
    let protected = Router::new()
        .route("/auth/signout", post(auth::sign_out))
        .route("/auth/me", get(auth::me))
        // Projects
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:id/restore", post(projects::restore_project))
        .route(
            "/projects/:id/members",
            get(projects::list_members).post(projects::add_member),
        )
        .route(
            "/projects/:id/members/:user_id",
            axum::routing::delete(projects::remove_member),
        )
        .route("/projects/:id/ideamap", get(ideamap::load_ideamap))
        .route("/projects/:id/ideamap/layout", post(ideamap::auto_layout))
        // Cards
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route(
            "/cards/:id",
            get(cards::get_card)
                .patch(cards::update_card)
                .delete(cards::delete_card),
        )
        // Card placements
        .route(
            "/cardnodes",
            get(card_nodes::list_card_nodes).post(card_nodes::create_card_node),
        )
        .route(
            "/cardnodes/:id",
            get(card_nodes::get_card_node)
                .patch(card_nodes::update_card_node)
                .delete(card_nodes::delete_card_node),
        )
        // Edges
        .route("/edges", get(edges::list_edges).post(edges::create_edge))
        .route("/edges/batch-delete", post(edges::batch_delete_edges))
        .route(
            "/edges/:id",
            get(edges::get_edge)
                .patch(edges::update_edge)
                .delete(edges::delete_edge),
        )
        // Tags
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/tags/:id",
            get(tags::get_tag)
                .patch(tags::rename_tag)
                .delete(tags::delete_tag),
        )
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).patch(settings::update_settings),
        )
        .route("/settings/reset", post(settings::reset_settings))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    // Public routes (no auth)
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in));

    Router::new()
        .nest("/api", public.merge(protected))
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(middleware::map_response(method_not_allowed_as_json)),
        )
        .with_state(state)
}

async fn route_not_found(method: Method, OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("No route for {} {}", method, uri.path()))
}

/// Give the router's bare 405s the same `{ "error" }` body as everything else
async fn method_not_allowed_as_json(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json = AppError::MethodNotAllowed("Method not allowed".to_string()).into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
