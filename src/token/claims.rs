use serde::{Deserialize, Serialize};

/// Which operation a token may be presented to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => f.write_str("access"),
            Self::Refresh => f.write_str("refresh"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // User ID (Subject)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>, // access tokens only
    pub iat: i64,
    pub exp: i64, // Expiration time (UNIX timestamp)
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Access + refresh tokens handed to a client after a credential check.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}
