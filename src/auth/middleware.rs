use crate::AppState;
use crate::error::AppError;
use crate::identity::DirectoryError;
use crate::token::TokenType;
use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use tracing::debug;

use super::context::UserContext;

/// Stage a request was rejected at, for logging.
#[derive(Debug, Clone, Copy)]
enum Rejected {
    /// Missing or malformed `Authorization` header.
    Extract,
    /// Bad signature, expired, or not an access token.
    Validate,
    /// Subject no longer exists or is disabled.
    Resolve,
}

fn reject(stage: Rejected, err: AppError) -> AppError {
    debug!(name: "auth.rejected", stage = ?stage, reason = %err, "Request rejected");
    err
}

/// Bearer authentication for protected routes.
///
/// Extract the token, validate it as an access token, re-read the subject from
/// the directory, then attach a [`UserContext`]. Any failure short-circuits
/// with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    // 1. Extract
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &state)
            .await
            .map_err(|rejection| {
                debug!(name: "auth.header.invalid", %rejection, "Bearer header unusable");
                reject(Rejected::Extract, AppError::unauthenticated())
            })?;

    // 2. Validate
    let claims = state
        .tokens
        .validate(bearer.token(), TokenType::Access)
        .map_err(|e| reject(Rejected::Validate, e.into()))?;

    // 3. Resolve
    let user = match state.directory.get_user_by_id(&claims.sub).await {
        Ok(user) => user,
        Err(DirectoryError::NotFound) => {
            return Err(reject(Rejected::Resolve, AppError::unauthenticated()));
        }
        Err(e) => return Err(e.into()),
    };
    if !user.is_active {
        return Err(reject(
            Rejected::Resolve,
            AppError::Authentication("Account is disabled".to_string()),
        ));
    }

    // 4. Inject Context
    parts.extensions.insert(UserContext { user, claims });
    Ok(next.run(Request::from_parts(parts, body)).await)
}
