use std::sync::Arc;

use serde::Serialize;

use crate::error::AppError;
use crate::identity::{DirectoryError, IdentityProvider, NewUser, User};
use crate::token::{TokenPair, TokenService, TokenType};

/// Result of a successful signup or login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Session issuance built from the directory and the token service.
#[derive(Debug, Clone)]
pub struct AuthService {
    directory: Arc<dyn IdentityProvider>,
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(directory: Arc<dyn IdentityProvider>, tokens: Arc<TokenService>) -> Self {
        Self { directory, tokens }
    }

    pub async fn signup(&self, new_user: &NewUser) -> Result<Session, AppError> {
        let user = self.directory.create_user(new_user).await?;
        let tokens = self.tokens.issue_pair(&user.id, &user.email)?;
        Ok(Session { tokens, user })
    }

    /// Unknown email, wrong password and disabled account all look the same.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let user = match self.directory.verify_credentials(email, password).await {
            Ok(user) => user,
            Err(
                DirectoryError::InvalidCredentials
                | DirectoryError::Disabled
                | DirectoryError::NotFound
                | DirectoryError::Validation(_),
            ) => {
                return Err(AppError::Authentication(
                    "Invalid email or password".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let tokens = self.tokens.issue_pair(&user.id, &user.email)?;
        Ok(Session { tokens, user })
    }

    /// Exchange a refresh token for a new access token for the same subject.
    ///
    /// The subject is re-read from the directory: deleted or disabled accounts
    /// can't refresh even while their refresh token is unexpired.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, AccessGrant), AppError> {
        let claims = self.tokens.validate(refresh_token, TokenType::Refresh)?;

        let user = match self.directory.get_user_by_id(&claims.sub).await {
            Ok(user) if user.is_active => user,
            Ok(_) | Err(DirectoryError::NotFound) => {
                return Err(AppError::Authentication(
                    "Invalid refresh token".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let access_token = self.tokens.issue_access_token(&claims.sub, &user.email)?;
        Ok((
            user,
            AccessGrant {
                access_token,
                token_type: "bearer",
                expires_in: self.tokens.access_ttl().num_seconds(),
            },
        ))
    }
}
