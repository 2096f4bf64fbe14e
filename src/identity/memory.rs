//! In-process identity directory.
//!
//! Stands in for the remote directory in development and tests. Passwords are
//! stored as Argon2id PHC strings; verification happens here, behind the
//! [`IdentityProvider`] boundary, exactly as a remote directory would do it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::Utc;
use password_hash::{PasswordHash, SaltString};

use super::validation::{normalize_email, validate_new_user, validate_profile_update};
use super::{DirectoryError, IdentityProvider, NewUser, ProfileUpdate, Role, User};

const DECOY_SALT: &str = "ZGVjb3ktc2FsdC12YWx1ZQ";
const DECOY_PASSWORD: &str = "decoy-password-never-assigned";

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<String, Account>,
    /// normalized email -> id
    by_email: HashMap<String, String>,
}

pub struct MemoryDirectory {
    accounts: RwLock<Accounts>,
    hasher: Argon2<'static>,
    /// Verified against for unknown emails so a miss costs the same as a hit.
    decoy_hash: String,
}

impl std::fmt::Debug for MemoryDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDirectory")
            .field("accounts", &self.len())
            .finish()
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::with_hasher(Argon2::default())
    }

    /// Use explicit Argon2 parameters (tests use cheap ones).
    pub fn with_hasher(hasher: Argon2<'static>) -> Self {
        let decoy_hash = match SaltString::from_b64(DECOY_SALT) {
            Ok(salt) => hasher
                .hash_password(DECOY_PASSWORD.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        };
        Self {
            accounts: RwLock::new(Accounts::default()),
            hasher,
            decoy_hash,
        }
    }

    pub fn len(&self) -> usize {
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn hash_password(&self, password: &str) -> Result<String, DirectoryError> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|e| DirectoryError::Upstream(format!("salt generation failed: {e}")))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| DirectoryError::Upstream(format!("salt encoding failed: {e}")))?;
        let phc = self
            .hasher
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| DirectoryError::Upstream(format!("password hashing failed: {e}")))?
            .to_string();
        Ok(phc)
    }

    fn password_matches(&self, hash: &str, password: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .hasher
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn with_account<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Account) -> T,
    ) -> Result<T, DirectoryError> {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let account = accounts.by_id.get_mut(id).ok_or(DirectoryError::NotFound)?;
        Ok(f(account))
    }
}

#[async_trait]
impl IdentityProvider for MemoryDirectory {
    async fn create_user(&self, new_user: &NewUser) -> Result<User, DirectoryError> {
        validate_new_user(new_user)?;
        let key = normalize_email(&new_user.email);

        // hash outside the lock
        let password_hash = self.hash_password(&new_user.password)?;

        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if accounts.by_email.contains_key(&key) {
            return Err(DirectoryError::Conflict);
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: key.clone(),
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            is_active: true,
            role: Role::User,
            created_at: Utc::now(),
        };
        accounts.by_email.insert(key, user.id.clone());
        accounts.by_id.insert(
            user.id.clone(),
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        Ok(user)
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, DirectoryError> {
        let account = {
            let accounts = self
                .accounts
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            accounts
                .by_email
                .get(&normalize_email(email))
                .and_then(|id| accounts.by_id.get(id))
                .cloned()
        };

        let Some(account) = account else {
            let _ = self.password_matches(&self.decoy_hash, password);
            return Err(DirectoryError::InvalidCredentials);
        };
        if !self.password_matches(&account.password_hash, password) {
            return Err(DirectoryError::InvalidCredentials);
        }
        if !account.user.is_active {
            return Err(DirectoryError::Disabled);
        }
        Ok(account.user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        accounts
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| accounts.by_id.get(id))
            .map(|account| account.user.clone())
            .ok_or(DirectoryError::NotFound)
    }

    async fn get_user_by_id(&self, id: &str) -> Result<User, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        accounts
            .by_id
            .get(id)
            .map(|account| account.user.clone())
            .ok_or(DirectoryError::NotFound)
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, DirectoryError> {
        validate_profile_update(update)?;
        self.with_account(id, |account| {
            if let Some(first) = &update.first_name {
                account.user.first_name = first.trim().to_string();
            }
            if let Some(last) = &update.last_name {
                account.user.last_name = last.trim().to_string();
            }
            account.user.clone()
        })
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<(), DirectoryError> {
        self.with_account(id, |account| account.user.role = role)
    }

    async fn disable_user(&self, id: &str) -> Result<(), DirectoryError> {
        self.with_account(id, |account| account.user.is_active = false)
    }

    async fn enable_user(&self, id: &str) -> Result<(), DirectoryError> {
        self.with_account(id, |account| account.user.is_active = true)
    }

    async fn delete_user(&self, id: &str) -> Result<(), DirectoryError> {
        let mut accounts = self
            .accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let account = accounts.by_id.remove(id).ok_or(DirectoryError::NotFound)?;
        accounts.by_email.remove(&account.user.email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{Algorithm, Params, Version};

    fn directory() -> MemoryDirectory {
        let params = Params::new(1024, 1, 1, None).unwrap();
        MemoryDirectory::with_hasher(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn jane() -> NewUser {
        NewUser {
            email: "Jane@Example.com".into(),
            password: "Str0ng!Pass".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
        }
    }

    #[tokio::test]
    async fn test_unknown_email_pays_for_a_hash() {
        let dir = directory();
        let decoy = PasswordHash::new(&dir.decoy_hash).unwrap();
        assert_eq!(decoy.params.get_decimal("m"), Some(1024));

        assert!(matches!(
            dir.verify_credentials("ghost@example.com", DECOY_PASSWORD).await,
            Err(DirectoryError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let dir = directory();
        let user = dir.create_user(&jane()).await.unwrap();

        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.role, Role::User);
        assert!(user.is_active);

        assert_eq!(dir.get_user_by_id(&user.id).await.unwrap(), user);
        assert_eq!(dir.get_user_by_email("JANE@example.com").await.unwrap(), user);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let dir = directory();
        let first = dir.create_user(&jane()).await.unwrap();
        let mut again = jane();
        again.email = "jane@example.com".into();

        assert!(matches!(
            dir.create_user(&again).await,
            Err(DirectoryError::Conflict)
        ));
        assert_eq!(dir.len(), 1);
        assert_eq!(dir.get_user_by_id(&first.id).await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_password_never_stored_raw() {
        let dir = directory();
        let user = dir.create_user(&jane()).await.unwrap();
        let accounts = dir.accounts.read().unwrap();
        let stored = &accounts.by_id[&user.id].password_hash;
        assert!(stored.starts_with("$argon2id$"));
        assert!(!stored.contains("Str0ng!Pass"));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let dir = directory();
        let user = dir.create_user(&jane()).await.unwrap();

        assert_eq!(
            dir.verify_credentials("jane@example.com", "Str0ng!Pass")
                .await
                .unwrap()
                .id,
            user.id
        );
        assert!(matches!(
            dir.verify_credentials("jane@example.com", "wrong").await,
            Err(DirectoryError::InvalidCredentials)
        ));
        assert!(matches!(
            dir.verify_credentials("nobody@example.com", "Str0ng!Pass").await,
            Err(DirectoryError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_disable_enable_delete() {
        let dir = directory();
        let user = dir.create_user(&jane()).await.unwrap();

        dir.disable_user(&user.id).await.unwrap();
        assert!(matches!(
            dir.verify_credentials("jane@example.com", "Str0ng!Pass").await,
            Err(DirectoryError::Disabled)
        ));

        dir.enable_user(&user.id).await.unwrap();
        assert!(dir.get_user_by_id(&user.id).await.unwrap().is_active);

        dir.delete_user(&user.id).await.unwrap();
        assert!(matches!(
            dir.get_user_by_id(&user.id).await,
            Err(DirectoryError::NotFound)
        ));
        assert!(matches!(
            dir.delete_user(&user.id).await,
            Err(DirectoryError::NotFound)
        ));
        // email is free again
        assert!(dir.create_user(&jane()).await.is_ok());
    }

    #[tokio::test]
    async fn test_role_and_profile_updates_visible() {
        let dir = directory();
        let user = dir.create_user(&jane()).await.unwrap();

        dir.set_role(&user.id, Role::Moderator).await.unwrap();
        let updated = dir
            .update_profile(
                &user.id,
                &ProfileUpdate {
                    first_name: Some(" Janet ".into()),
                    last_name: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Moderator);
        assert_eq!(updated.first_name, "Janet");
        assert_eq!(updated.last_name, "Doe");
        assert!(matches!(
            dir.set_role("missing", Role::Admin).await,
            Err(DirectoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_malformed_input_rejected() {
        let dir = directory();
        let mut bad = jane();
        bad.password = "short".into();
        assert!(matches!(
            dir.create_user(&bad).await,
            Err(DirectoryError::Validation(_))
        ));
        assert!(dir.is_empty());
    }
}
