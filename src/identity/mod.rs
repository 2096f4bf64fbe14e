//! Identity directory adapter.
//!
//! The directory is the system of record for accounts. This module only
//! defines the contract the rest of the service talks to and the two
//! implementations of it:
//!
//! - [`MemoryDirectory`]: in-process directory for development and tests
//! - [`IdentityToolkitDirectory`]: Firebase Identity Toolkit REST client
//!
//! Passwords are handed to the directory and never compared here.

mod memory;
mod toolkit;
pub mod validation;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryDirectory;
pub use toolkit::IdentityToolkitDirectory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    #[default]
    User,
}

impl Role {
    /// `admin` satisfies every requirement; other roles only their own.
    pub fn satisfies(self, required: Role) -> bool {
        self == required || self == Role::Admin
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An account as the directory reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Validation(String),

    #[error("email already registered")]
    Conflict,

    #[error("user not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account disabled")]
    Disabled,

    #[error("directory unavailable: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Register a new account with role `user`.
    async fn create_user(&self, new_user: &NewUser) -> Result<User, DirectoryError>;

    /// Check an email/password pair. Unknown email and wrong password are
    /// indistinguishable (`InvalidCredentials`).
    async fn verify_credentials(&self, email: &str, password: &str)
    -> Result<User, DirectoryError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, DirectoryError>;
    async fn get_user_by_id(&self, id: &str) -> Result<User, DirectoryError>;

    async fn update_profile(&self, id: &str, update: &ProfileUpdate)
    -> Result<User, DirectoryError>;

    async fn set_role(&self, id: &str, role: Role) -> Result<(), DirectoryError>;

    async fn disable_user(&self, id: &str) -> Result<(), DirectoryError>;
    async fn enable_user(&self, id: &str) -> Result<(), DirectoryError>;

    /// Irreversible.
    async fn delete_user(&self, id: &str) -> Result<(), DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_satisfies() {
        assert!(Role::Admin.satisfies(Role::Moderator));
        assert!(Role::Admin.satisfies(Role::User));
        assert!(Role::Moderator.satisfies(Role::Moderator));
        assert!(!Role::Moderator.satisfies(Role::Admin));
        assert!(!Role::User.satisfies(Role::Moderator));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Moderator).unwrap(), "\"moderator\"");
    }

    #[test]
    fn test_new_user_debug_omits_password() {
        let new_user = NewUser {
            email: "a@example.com".into(),
            password: "Sup3r$ecret".into(),
            first_name: "A".into(),
            last_name: "B".into(),
        };
        assert!(!format!("{new_user:?}").contains("Sup3r"));
    }
}
