//! HTTP route table.
//!
//! Each submodule contributes `public_routes` and/or `protected_routes`;
//! [`crate::server::build_router`] puts the protected ones behind
//! [`crate::auth::auth_middleware`].

pub mod admin;
pub mod auth;
pub mod extract;
pub mod users;

use axum::{Json, Router, routing::get};
use serde::Serialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::identity::User;

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::public_routes())
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .merge(auth::protected_routes())
        .merge(users::protected_routes())
        .merge(admin::protected_routes())
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
