use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::identity::{Role, User};
use crate::token::Claims;

/// The caller resolved by [`auth_middleware`](super::auth_middleware).
///
/// `user` is re-read from the directory on every request, so role and active
/// flag are current even when the token is older than a role change.
#[derive(Clone, Debug)]
pub struct UserContext {
    pub user: User,
    pub claims: Claims,
}

impl UserContext {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn require_role(&self, required: Role) -> Result<(), AppError> {
        if self.user.role.satisfies(required) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Access denied. Required role: {required}"
            )))
        }
    }
}

impl<S> FromRequestParts<S> for UserContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserContext>()
            .cloned()
            .ok_or_else(AppError::unauthenticated)
    }
}
