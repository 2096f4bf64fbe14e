//! Authentication pipeline.
//!
//! - [`AuthService`]: signup, login and refresh flows
//! - [`auth_middleware`]: bearer token → [`UserContext`] for protected routes
//! - [`AuditLog`]: security event trail
//! - [`KeyedRateLimiter`]: per-client token buckets

pub mod audit;
mod context;
mod middleware;
pub mod rate_limit;
mod service;

pub use audit::{AuditAction, AuditEntry, AuditLog, ClientInfo};
pub use context::UserContext;
pub use middleware::auth_middleware;
pub use rate_limit::{KeyedRateLimiter, rate_limit_middleware};
pub use service::{AccessGrant, AuthService, Session};
