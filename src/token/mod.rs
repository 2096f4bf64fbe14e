//! Access and refresh token issuance.
//!
//! Tokens are stateless HS256 JWTs. An access token carries `{sub, email, iat,
//! exp, jti, type=access}`, a refresh token `{sub, iat, exp, jti,
//! type=refresh}`.

mod claims;
mod service;

pub use claims::{Claims, TokenPair, TokenType};
pub use service::{TokenError, TokenService};
