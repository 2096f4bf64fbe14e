//! `/users` routes for the caller's own profile.

use axum::{Json, Router, extract::State, routing::get};
use serde_json::json;

use super::{UserEnvelope, extract::AppJson};
use crate::AppState;
use crate::auth::{AuditAction, ClientInfo, UserContext};
use crate::error::AppError;
use crate::identity::ProfileUpdate;

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/users/profile", get(get_profile).put(update_profile))
}

async fn get_profile(ctx: UserContext) -> Json<UserEnvelope> {
    Json(UserEnvelope { user: ctx.user })
}

async fn update_profile(
    State(state): State<AppState>,
    ctx: UserContext,
    client: ClientInfo,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<Json<UserEnvelope>, AppError> {
    if update.first_name.is_none() && update.last_name.is_none() {
        return Err(AppError::Validation(
            "Nothing to update: provide firstName or lastName".to_string(),
        ));
    }

    let user = state
        .directory
        .update_profile(ctx.user_id(), &update)
        .await?;
    state.audit.record(
        &user.id,
        AuditAction::ProfileUpdated,
        &client,
        json!({
            "firstName": update.first_name.is_some(),
            "lastName": update.last_name.is_some(),
        }),
    );
    Ok(Json(UserEnvelope { user }))
}
