//! `/auth` routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{UserEnvelope, extract::AppJson};
use crate::AppState;
use crate::auth::{AccessGrant, AuditAction, ClientInfo, Session, UserContext};
use crate::error::AppError;
use crate::identity::{NewUser, Role, validation};
use crate::token::TokenType;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    email: String,
    password: String,
    first_name: String,
    last_name: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Deserialize)]
struct PasswordStrengthRequest {
    password: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

#[derive(Serialize)]
struct VerifiedUser {
    id: String,
    email: String,
    role: Role,
}

#[derive(Serialize)]
struct VerifyResponse {
    valid: bool,
    user: VerifiedUser,
}

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/password-strength", post(password_strength))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/verify", get(verify))
}

/// POST /auth/signup - Create an account and start a session.
async fn signup(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<Session>), AppError> {
    let new_user = NewUser {
        email: req.email,
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
    };
    let session = state.auth.signup(&new_user).await?;

    state.audit.record(
        &session.user.id,
        AuditAction::Signup,
        &client,
        json!({ "email": session.user.email }),
    );
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<Session>, AppError> {
    match state.auth.login(&req.email, &req.password).await {
        Ok(session) => {
            state
                .audit
                .record(&session.user.id, AuditAction::Login, &client, json!({}));
            Ok(Json(session))
        }
        Err(err) => {
            if matches!(err, AppError::Authentication(_)) {
                state.audit.record(
                    &validation::normalize_email(&req.email),
                    AuditAction::LoginFailed,
                    &client,
                    json!({}),
                );
            }
            Err(err)
        }
    }
}

/// POST /auth/refresh
async fn refresh(
    State(state): State<AppState>,
    client: ClientInfo,
    AppJson(req): AppJson<RefreshRequest>,
) -> Result<Json<AccessGrant>, AppError> {
    let (user, grant) = state.auth.refresh(&req.refresh_token).await?;
    state
        .audit
        .record(&user.id, AuditAction::TokenRefreshed, &client, json!({}));
    Ok(Json(grant))
}

/// POST /auth/logout - Tokens are stateless; the client discards them.
async fn logout(
    State(state): State<AppState>,
    client: ClientInfo,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Json<MessageResponse> {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        if let Ok(claims) = state.tokens.validate(bearer.token(), TokenType::Access) {
            state
                .audit
                .record(&claims.sub, AuditAction::Logout, &client, json!({}));
        }
    }
    Json(MessageResponse {
        message: "Successfully logged out",
    })
}

/// POST /auth/password-strength - Score a candidate password.
async fn password_strength(
    AppJson(req): AppJson<PasswordStrengthRequest>,
) -> Json<validation::PasswordReport> {
    Json(validation::password_strength(&req.password))
}

/// GET /auth/me
async fn me(ctx: UserContext) -> Json<UserEnvelope> {
    Json(UserEnvelope { user: ctx.user })
}

/// GET /auth/verify
async fn verify(ctx: UserContext) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user: VerifiedUser {
            id: ctx.user.id,
            email: ctx.user.email,
            role: ctx.user.role,
        },
    })
}
