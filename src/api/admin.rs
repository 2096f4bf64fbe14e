//! `/admin` routes: account moderation.
//!
//! Reading an account needs `moderator`; everything that changes one needs
//! `admin`.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{UserEnvelope, extract::AppJson};
use crate::AppState;
use crate::auth::{AuditAction, AuditEntry, ClientInfo, UserContext};
use crate::error::AppError;
use crate::identity::{Role, User};

const MAX_BULK_USERS: usize = 100;
const DEFAULT_AUDIT_LIMIT: usize = 100;
const MAX_AUDIT_LIMIT: usize = 1000;

#[derive(Deserialize)]
struct RoleRequest {
    role: Role,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum BulkAction {
    Disable,
    Enable,
    Delete,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BulkRequest {
    user_ids: Vec<String>,
    action: BulkAction,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkResult {
    user_id: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize)]
struct BulkResponse {
    results: Vec<BulkResult>,
}

#[derive(Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct AuditResponse {
    entries: Vec<AuditEntry>,
}

#[derive(Serialize)]
struct DeletedResponse {
    message: String,
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users/bulk-action", post(bulk_action))
        .route("/admin/users/{id}", get(get_user).delete(delete_user))
        .route("/admin/users/{id}/role", put(set_role))
        .route("/admin/users/{id}/disable", post(disable_user))
        .route("/admin/users/{id}/enable", post(enable_user))
        .route("/admin/users/{id}/audit", get(user_audit))
}

/// GET /admin/users/{id}
async fn get_user(
    State(state): State<AppState>,
    ctx: UserContext,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, AppError> {
    ctx.require_role(Role::Moderator)?;
    let user = state.directory.get_user_by_id(&id).await?;
    Ok(Json(UserEnvelope { user }))
}

/// PUT /admin/users/{id}/role
async fn set_role(
    State(state): State<AppState>,
    ctx: UserContext,
    client: ClientInfo,
    Path(id): Path<String>,
    AppJson(req): AppJson<RoleRequest>,
) -> Result<Json<UserEnvelope>, AppError> {
    ctx.require_role(Role::Admin)?;
    state.directory.set_role(&id, req.role).await?;
    let user = state.directory.get_user_by_id(&id).await?;

    state.audit.record(
        &id,
        AuditAction::RoleChanged,
        &client,
        json!({ "role": req.role, "by": ctx.user_id() }),
    );
    Ok(Json(UserEnvelope { user }))
}

/// POST /admin/users/{id}/disable
async fn disable_user(
    State(state): State<AppState>,
    ctx: UserContext,
    client: ClientInfo,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, AppError> {
    ctx.require_role(Role::Admin)?;
    let user = apply(&state, &ctx, &client, &id, BulkAction::Disable).await?;
    Ok(Json(UserEnvelope {
        user: user.ok_or_else(|| AppError::Internal("disabled user vanished".into()))?,
    }))
}

/// POST /admin/users/{id}/enable
async fn enable_user(
    State(state): State<AppState>,
    ctx: UserContext,
    client: ClientInfo,
    Path(id): Path<String>,
) -> Result<Json<UserEnvelope>, AppError> {
    ctx.require_role(Role::Admin)?;
    let user = apply(&state, &ctx, &client, &id, BulkAction::Enable).await?;
    Ok(Json(UserEnvelope {
        user: user.ok_or_else(|| AppError::Internal("enabled user vanished".into()))?,
    }))
}

/// DELETE /admin/users/{id}
async fn delete_user(
    State(state): State<AppState>,
    ctx: UserContext,
    client: ClientInfo,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    ctx.require_role(Role::Admin)?;
    apply(&state, &ctx, &client, &id, BulkAction::Delete).await?;
    Ok(Json(DeletedResponse {
        message: format!("User {id} deleted"),
    }))
}

/// POST /admin/users/bulk-action - Per-user failures are reported, not raised.
async fn bulk_action(
    State(state): State<AppState>,
    ctx: UserContext,
    client: ClientInfo,
    AppJson(req): AppJson<BulkRequest>,
) -> Result<Json<BulkResponse>, AppError> {
    ctx.require_role(Role::Admin)?;
    if req.user_ids.is_empty() || req.user_ids.len() > MAX_BULK_USERS {
        return Err(AppError::Validation(format!(
            "userIds must contain between 1 and {MAX_BULK_USERS} ids"
        )));
    }

    let mut results = Vec::with_capacity(req.user_ids.len());
    for id in req.user_ids {
        let result = match apply(&state, &ctx, &client, &id, req.action).await {
            Ok(_) => BulkResult {
                user_id: id,
                status: match req.action {
                    BulkAction::Disable => "disabled",
                    BulkAction::Enable => "enabled",
                    BulkAction::Delete => "deleted",
                },
                message: None,
            },
            Err(err) => BulkResult {
                user_id: id,
                status: "error",
                message: Some(err.public_message()),
            },
        };
        results.push(result);
    }
    Ok(Json(BulkResponse { results }))
}

/// GET /admin/users/{id}/audit?limit=N
async fn user_audit(
    State(state): State<AppState>,
    ctx: UserContext,
    Path(id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<AuditResponse>, AppError> {
    ctx.require_role(Role::Admin)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    Ok(Json(AuditResponse {
        entries: state.audit.for_user(&id, limit),
    }))
}

/// Run one moderation action and audit it. Returns the account afterwards,
/// or `None` once deleted.
async fn apply(
    state: &AppState,
    ctx: &UserContext,
    client: &ClientInfo,
    id: &str,
    action: BulkAction,
) -> Result<Option<User>, AppError> {
    let audit_action = match action {
        BulkAction::Disable => {
            state.directory.disable_user(id).await?;
            AuditAction::UserDisabled
        }
        BulkAction::Enable => {
            state.directory.enable_user(id).await?;
            AuditAction::UserEnabled
        }
        BulkAction::Delete => {
            state.directory.delete_user(id).await?;
            AuditAction::UserDeleted
        }
    };
    state
        .audit
        .record(id, audit_action, client, json!({ "by": ctx.user_id() }));

    if action == BulkAction::Delete {
        return Ok(None);
    }
    Ok(Some(state.directory.get_user_by_id(id).await?))
}
