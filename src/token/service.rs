use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};

use super::claims::{Claims, TokenPair, TokenType};
use crate::config::SecurityConfig;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("expected a {expected} token, got {found}")]
    WrongType {
        expected: TokenType,
        found: TokenType,
    },

    #[error("token is malformed")]
    Malformed,

    #[error("token could not be signed: {0}")]
    Signing(jsonwebtoken::errors::Error),

    #[error("token lifetime is out of range")]
    LifetimeOutOfRange,
}

/// Issues and validates HS256 access and refresh tokens.
///
/// The keys are derived once from the configured secret; swapping the secret
/// only needs a new `TokenService`.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(security: &SecurityConfig) -> Self {
        Self::new(
            security.jwt_secret.as_bytes(),
            ttl_from_secs(security.access_token_ttl_secs),
            ttl_from_secs(security.refresh_token_ttl_secs),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue_access_token(&self, subject_id: &str, email: &str) -> Result<String, TokenError> {
        self.sign(subject_id, Some(email), TokenType::Access, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, subject_id: &str) -> Result<String, TokenError> {
        self.sign(subject_id, None, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn issue_pair(&self, subject_id: &str, email: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access_token(subject_id, email)?,
            refresh_token: self.issue_refresh_token(subject_id)?,
            token_type: "bearer",
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Check signature, expiry and type. None of the three is ever skipped.
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        // decode already rejects exp < now; this also covers exp == now
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.token_type,
            });
        }
        if expected == TokenType::Access && claims.email.is_none() {
            return Err(TokenError::Malformed);
        }
        Ok(claims)
    }

    fn sign(
        &self,
        subject_id: &str,
        email: Option<&str>,
        token_type: TokenType,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject_id.to_string(),
            email: email.map(str::to_string),
            iat: now.timestamp(),
            exp: now
                .checked_add_signed(ttl)
                .ok_or(TokenError::LifetimeOutOfRange)?
                .timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(TokenError::Signing)
    }
}

/// Out-of-range lifetimes clamp to `Duration::MAX`; `sign` then refuses them.
fn ttl_from_secs(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret-that-is-long-enough!!";

    fn service() -> TokenService {
        TokenService::new(SECRET, Duration::hours(1), Duration::days(7))
    }

    #[test]
    fn test_access_token_round_trip() {
        let tokens = service();
        let token = tokens.issue_access_token("user-1", "a@example.com").unwrap();
        let claims = tokens.validate(&token, TokenType::Access).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email.as_deref(), Some("a@example.com"));
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_type_mismatch_rejected_both_ways() {
        let tokens = service();
        let access = tokens.issue_access_token("u", "u@example.com").unwrap();
        let refresh = tokens.issue_refresh_token("u").unwrap();

        assert!(matches!(
            tokens.validate(&access, TokenType::Refresh),
            Err(TokenError::WrongType {
                expected: TokenType::Refresh,
                found: TokenType::Access
            })
        ));
        assert!(matches!(
            tokens.validate(&refresh, TokenType::Access),
            Err(TokenError::WrongType { .. })
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new(SECRET, Duration::seconds(-30), Duration::days(7));
        let token = tokens.issue_access_token("u", "u@example.com").unwrap();
        assert!(matches!(
            tokens.validate(&token, TokenType::Access),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_expiry_enforced_with_zero_leeway() {
        // inside jsonwebtoken's default 60s leeway, must still fail
        let tokens = TokenService::new(SECRET, Duration::seconds(-5), Duration::days(7));
        let token = tokens.issue_refresh_token("u").unwrap();
        assert!(matches!(
            tokens.validate(&token, TokenType::Refresh),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenService::new(
            b"a-completely-different-secret-value!!",
            Duration::hours(1),
            Duration::days(7),
        );
        let token = other.issue_access_token("u", "u@example.com").unwrap();
        assert!(matches!(
            service().validate(&token, TokenType::Access),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            service().validate("not-a-jwt", TokenType::Access),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = service();
        let a = tokens.issue_access_token("u", "u@example.com").unwrap();
        let b = tokens.issue_access_token("u", "u@example.com").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_oversized_lifetime_is_an_error() {
        let security = SecurityConfig {
            jwt_secret: String::from_utf8(SECRET.to_vec()).unwrap(),
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 1_000_000_000_000_000,
            allowed_origins: vec![],
        };
        let tokens = TokenService::from_config(&security);
        assert!(matches!(
            tokens.issue_pair("u", "u@example.com"),
            Err(TokenError::LifetimeOutOfRange)
        ));
        assert!(tokens.issue_access_token("u", "u@example.com").is_ok());
    }

    #[test]
    fn test_ttl_beyond_i64_clamps() {
        assert_eq!(ttl_from_secs(u64::MAX), Duration::MAX);
        assert_eq!(ttl_from_secs(90), Duration::seconds(90));
    }

    #[test]
    fn test_debug_hides_keys() {
        let rendered = format!("{:?}", service());
        assert!(!rendered.contains("unit-test-secret"));
    }
}
