//! authgate
//!
//! Authentication gateway: account signup and login against an identity
//! directory, stateless JWT access/refresh tokens, bearer-token request
//! authentication and role-gated account administration.
//!
//! # Architecture
//!
//! - **identity**: the [`identity::IdentityProvider`] seam, with an in-process
//!   directory and a Firebase Identity Toolkit REST client
//! - **token**: HS256 issuing and validation of access and refresh tokens
//! - **auth**: signup/login/refresh workflows, bearer middleware, rate limiting
//!   and the audit log
//! - **api**: the HTTP route table
//! - **server**: state construction, middleware stack and the listener

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod server;
pub mod telemetry;
pub mod token;

use std::sync::Arc;

use auth::{AuditLog, AuthService, KeyedRateLimiter};
use config::AppConfig;
use identity::IdentityProvider;
use token::TokenService;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Startup configuration.
    pub config: Arc<AppConfig>,
    /// Account directory.
    pub directory: Arc<dyn IdentityProvider>,
    /// Token issuing and validation.
    pub tokens: Arc<TokenService>,
    /// Signup, login and refresh.
    pub auth: Arc<AuthService>,
    /// Security event history.
    pub audit: Arc<AuditLog>,
    /// Per-client request budget.
    pub rate_limiter: Arc<KeyedRateLimiter>,
}

impl AppState {
    /// Wire the services around an already-built directory.
    pub fn new(config: Arc<AppConfig>, directory: Arc<dyn IdentityProvider>) -> Self {
        let tokens = Arc::new(TokenService::from_config(&config.security));
        let auth = Arc::new(AuthService::new(
            Arc::clone(&directory),
            Arc::clone(&tokens),
        ));
        let rate_limiter = Arc::new(KeyedRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        ));

        Self {
            config,
            directory,
            tokens,
            auth,
            audit: Arc::new(AuditLog::default()),
            rate_limiter,
        }
    }
}
