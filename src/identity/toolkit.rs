//! Firebase Identity Toolkit REST client.
//!
//! Public endpoints (`accounts:signUp`, `accounts:signInWithPassword`) are
//! called with the web API key in the `x-goog-api-key` header; admin endpoints (`accounts:lookup`,
//! `accounts:update`, `accounts:delete`) are project-scoped and carry the
//! service bearer token. Names and role live in the account's
//! `customAttributes` JSON.

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::validation::{normalize_email, validate_new_user, validate_profile_update};
use super::{DirectoryError, IdentityProvider, NewUser, ProfileUpdate, Role, User};
use crate::config::DirectoryConfig;

/// Cap on the exponential backoff multiplier (2^6).
const MAX_BACKOFF_SHIFT: u32 = 6;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Which failures a call may be retried after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    /// Repeating the call is harmless: connection failures, timeouts and
    /// 429/502/503/504 are all retried.
    Idempotent,
    /// A repeat could apply the call twice, so only failures showing the
    /// directory never processed it (no connection, 429) are retried.
    Unprocessed,
}

impl Retry {
    fn on_status(self, status: StatusCode) -> bool {
        match self {
            Self::Idempotent => is_transient(status),
            Self::Unprocessed => status == StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn on_error(self, err: &reqwest::Error) -> bool {
        match self {
            Self::Idempotent => err.is_connect() || err.is_timeout(),
            Self::Unprocessed => err.is_connect(),
        }
    }
}

/// Which credentials a call carries.
#[derive(Debug, Clone, Copy)]
enum Caller {
    /// Web API key.
    Public,
    /// Service bearer token.
    Admin,
}

#[derive(Debug, Deserialize, Default)]
struct ToolkitErrorBody {
    #[serde(default)]
    error: ToolkitErrorDetail,
}

#[derive(Debug, Deserialize, Default)]
struct ToolkitErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
}

#[derive(Debug, Deserialize, Default)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    disabled: bool,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    custom_attributes: Option<String>,
}

/// Stored in `customAttributes`; key names match existing accounts.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
struct ProfileAttributes {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    role: Role,
}

impl AccountRecord {
    fn attributes(&self) -> ProfileAttributes {
        let mut attrs: ProfileAttributes = self
            .custom_attributes
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        if attrs.first_name.is_empty() && attrs.last_name.is_empty() {
            if let Some(display) = &self.display_name {
                let mut parts = display.splitn(2, ' ');
                attrs.first_name = parts.next().unwrap_or_default().to_string();
                attrs.last_name = parts.next().unwrap_or_default().to_string();
            }
        }
        attrs
    }

    fn into_user(self) -> User {
        let attrs = self.attributes();
        let created_at = self
            .created_at
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_default();

        User {
            id: self.local_id,
            email: self.email,
            first_name: attrs.first_name,
            last_name: attrs.last_name,
            is_active: !self.disabled,
            role: attrs.role,
            created_at,
        }
    }
}

/// Map an Identity Toolkit error code (e.g. `WEAK_PASSWORD : Password should
/// be at least 6 characters`) onto the directory taxonomy.
fn map_error(status: StatusCode, message: &str) -> DirectoryError {
    let code = message
        .split([' ', ':'])
        .next()
        .unwrap_or_default()
        .trim();

    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => DirectoryError::Conflict,
        "INVALID_EMAIL" | "MISSING_EMAIL" => {
            DirectoryError::Validation("Email address is not valid".to_string())
        }
        "WEAK_PASSWORD" | "MISSING_PASSWORD" => {
            DirectoryError::Validation("Password does not meet the directory policy".to_string())
        }
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            DirectoryError::InvalidCredentials
        }
        "USER_DISABLED" => DirectoryError::Disabled,
        "USER_NOT_FOUND" => DirectoryError::NotFound,
        _ => DirectoryError::Upstream(format!("directory returned {status}: {message}")),
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

pub struct IdentityToolkitDirectory {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    project_id: String,
    service_token: Option<String>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl std::fmt::Debug for IdentityToolkitDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToolkitDirectory")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl IdentityToolkitDirectory {
    pub fn from_config(config: &DirectoryConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("directory.api_key is required for identity_toolkit"))?;
        let project_id = config
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| anyhow!("directory.project_id is required for identity_toolkit"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build directory HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            project_id,
            service_token: config.service_token.clone(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    fn public_url(&self, method: &str) -> String {
        format!("{}/v1/accounts:{method}", self.base_url)
    }

    fn admin_url(&self, method: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts:{method}",
            self.base_url, self.project_id
        )
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(1 << attempt.min(MAX_BACKOFF_SHIFT))
    }

    /// POST a JSON body, retrying the failures `retry` allows.
    ///
    /// Transport errors are logged and returned without their URL.
    async fn post<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &Value,
        caller: Caller,
        retry: Retry,
    ) -> Result<T, DirectoryError> {
        let mut attempt = 0;
        loop {
            let mut request = self.client.post(url).json(body);
            request = match (caller, &self.service_token) {
                (Caller::Public, _) => request.header(API_KEY_HEADER, &self.api_key),
                (Caller::Admin, Some(token)) => request.bearer_auth(token),
                (Caller::Admin, None) => request,
            };

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json::<T>().await.map_err(|e| {
                            DirectoryError::Upstream(format!(
                                "invalid directory response: {}",
                                e.without_url()
                            ))
                        });
                    }
                    if retry.on_status(status) && attempt < self.max_retries {
                        warn!(
                            name: "directory.retry",
                            status = %status,
                            attempt,
                            "Transient directory failure, retrying"
                        );
                        tokio::time::sleep(self.backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    let err: ToolkitErrorBody = response.json().await.unwrap_or_default();
                    return Err(map_error(status, &err.error.message));
                }
                Err(e) if retry.on_error(&e) && attempt < self.max_retries => {
                    warn!(
                        name: "directory.retry",
                        error = %e.without_url(),
                        attempt,
                        "Directory unreachable, retrying"
                    );
                    tokio::time::sleep(self.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(DirectoryError::Upstream(e.without_url().to_string())),
            }
        }
    }

    async fn lookup(&self, query: Value) -> Result<AccountRecord, DirectoryError> {
        let response: LookupResponse = self
            .post(
                &self.admin_url("lookup"),
                &query,
                Caller::Admin,
                Retry::Idempotent,
            )
            .await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or(DirectoryError::NotFound)
    }

    async fn lookup_id(&self, id: &str) -> Result<AccountRecord, DirectoryError> {
        self.lookup(json!({ "localId": [id] })).await
    }

    async fn write_attributes(
        &self,
        id: &str,
        attrs: &ProfileAttributes,
    ) -> Result<(), DirectoryError> {
        let encoded = serde_json::to_string(attrs)
            .map_err(|e| DirectoryError::Upstream(format!("attribute encoding failed: {e}")))?;
        let body = json!({
            "localId": id,
            "displayName": format!("{} {}", attrs.first_name, attrs.last_name),
            "customAttributes": encoded,
        });
        let _: Value = self
            .post(
                &self.admin_url("update"),
                &body,
                Caller::Admin,
                Retry::Idempotent,
            )
            .await?;
        Ok(())
    }

    async fn set_disabled(&self, id: &str, disabled: bool) -> Result<(), DirectoryError> {
        let body = json!({ "localId": id, "disableUser": disabled });
        let _: Value = self
            .post(
                &self.admin_url("update"),
                &body,
                Caller::Admin,
                Retry::Idempotent,
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for IdentityToolkitDirectory {
    async fn create_user(&self, new_user: &NewUser) -> Result<User, DirectoryError> {
        validate_new_user(new_user)?;
        let attrs = ProfileAttributes {
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            role: Role::User,
        };
        let email = normalize_email(&new_user.email);

        let body = json!({
            "email": email,
            "password": new_user.password,
            "displayName": format!("{} {}", attrs.first_name, attrs.last_name),
            "returnSecureToken": false,
        });
        let created: SignUpResponse = self
            .post(
                &self.public_url("signUp"),
                &body,
                Caller::Public,
                Retry::Unprocessed,
            )
            .await?;

        if let Err(e) = self.write_attributes(&created.local_id, &attrs).await {
            // don't leave an account without role metadata behind
            if let Err(cleanup) = self.delete_user(&created.local_id).await {
                warn!(
                    name: "directory.cleanup_failed",
                    user_id = %created.local_id,
                    error = %cleanup,
                    "Could not remove partially created account"
                );
            }
            return Err(e);
        }

        debug!(name: "directory.user.created", user_id = %created.local_id, "Account created");
        Ok(User {
            id: created.local_id,
            email,
            first_name: attrs.first_name,
            last_name: attrs.last_name,
            is_active: true,
            role: attrs.role,
            created_at: Utc::now(),
        })
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, DirectoryError> {
        let body = json!({
            "email": normalize_email(email),
            "password": password,
            "returnSecureToken": true,
        });
        let signed_in: SignInResponse = self
            .post(
                &self.public_url("signInWithPassword"),
                &body,
                Caller::Public,
                Retry::Idempotent,
            )
            .await?;

        let user = self.lookup_id(&signed_in.local_id).await?.into_user();
        if !user.is_active {
            return Err(DirectoryError::Disabled);
        }
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        Ok(self
            .lookup(json!({ "email": [normalize_email(email)] }))
            .await?
            .into_user())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<User, DirectoryError> {
        Ok(self.lookup_id(id).await?.into_user())
    }

    async fn update_profile(
        &self,
        id: &str,
        update: &ProfileUpdate,
    ) -> Result<User, DirectoryError> {
        validate_profile_update(update)?;
        let mut user = self.lookup_id(id).await?.into_user();
        if let Some(first) = &update.first_name {
            user.first_name = first.trim().to_string();
        }
        if let Some(last) = &update.last_name {
            user.last_name = last.trim().to_string();
        }

        let attrs = ProfileAttributes {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        };
        self.write_attributes(id, &attrs).await?;
        Ok(user)
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<(), DirectoryError> {
        let mut attrs = self.lookup_id(id).await?.attributes();
        attrs.role = role;
        self.write_attributes(id, &attrs).await
    }

    async fn disable_user(&self, id: &str) -> Result<(), DirectoryError> {
        self.set_disabled(id, true).await
    }

    async fn enable_user(&self, id: &str) -> Result<(), DirectoryError> {
        self.set_disabled(id, false).await
    }

    async fn delete_user(&self, id: &str) -> Result<(), DirectoryError> {
        let body = json!({ "localId": id });
        let _: Value = self
            .post(
                &self.admin_url("delete"),
                &body,
                Caller::Admin,
                Retry::Unprocessed,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DirectoryProvider;
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::post,
    };
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn config_for(base_url: String, max_retries: u32) -> DirectoryConfig {
        DirectoryConfig {
            provider: DirectoryProvider::IdentityToolkit,
            base_url,
            api_key: Some("test-key".into()),
            project_id: Some("demo-project".into()),
            service_token: Some("owner".into()),
            max_retries,
            retry_backoff_ms: 1,
            request_timeout_secs: 5,
        }
    }

    async fn spawn_mock(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn admin_record() -> Value {
        json!({
            "users": [{
                "localId": "uid-1",
                "email": "root@example.com",
                "displayName": "Root User",
                "disabled": false,
                "createdAt": "1700000000000",
                "customAttributes": "{\"first_name\":\"Root\",\"last_name\":\"User\",\"role\":\"admin\"}"
            }]
        })
    }

    #[test]
    fn test_error_code_mapping() {
        assert!(matches!(
            map_error(StatusCode::BAD_REQUEST, "EMAIL_EXISTS"),
            DirectoryError::Conflict
        ));
        assert!(matches!(
            map_error(
                StatusCode::BAD_REQUEST,
                "WEAK_PASSWORD : Password should be at least 6 characters"
            ),
            DirectoryError::Validation(_)
        ));
        assert!(matches!(
            map_error(StatusCode::BAD_REQUEST, "INVALID_LOGIN_CREDENTIALS"),
            DirectoryError::InvalidCredentials
        ));
        assert!(matches!(
            map_error(StatusCode::BAD_REQUEST, "USER_DISABLED"),
            DirectoryError::Disabled
        ));
        assert!(matches!(
            map_error(StatusCode::INTERNAL_SERVER_ERROR, "BOOM"),
            DirectoryError::Upstream(_)
        ));
    }

    #[test]
    fn test_attributes_fall_back_to_display_name() {
        let record = AccountRecord {
            local_id: "x".into(),
            email: "x@example.com".into(),
            display_name: Some("Ada Lovelace".into()),
            disabled: true,
            created_at: None,
            custom_attributes: None,
        };
        let user = record.into_user();
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.last_name, "Lovelace");
        assert_eq!(user.role, Role::User);
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn test_lookup_parses_custom_attributes() {
        let router = Router::new().route(
            "/v1/projects/demo-project/accounts:lookup",
            post(|| async { Json(admin_record()) }),
        );
        let base = spawn_mock(router).await;
        let dir = IdentityToolkitDirectory::from_config(&config_for(base, 0)).unwrap();

        let user = dir.get_user_by_id("uid-1").await.unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.first_name, "Root");
        assert_eq!(user.created_at.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_empty_lookup_is_not_found() {
        let router = Router::new().route(
            "/v1/projects/demo-project/accounts:lookup",
            post(|| async { Json(json!({ "kind": "identitytoolkit#GetAccountInfoResponse" })) }),
        );
        let base = spawn_mock(router).await;
        let dir = IdentityToolkitDirectory::from_config(&config_for(base, 0)).unwrap();

        assert!(matches!(
            dir.get_user_by_email("ghost@example.com").await,
            Err(DirectoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/v1/projects/demo-project/accounts:lookup",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(AxumStatus::SERVICE_UNAVAILABLE)
                    } else {
                        Ok(Json(admin_record()))
                    }
                }),
            )
            .with_state(calls.clone());
        let base = spawn_mock(router).await;
        let dir = IdentityToolkitDirectory::from_config(&config_for(base, 3)).unwrap();

        assert!(dir.get_user_by_id("uid-1").await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/v1/projects/demo-project/accounts:lookup",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::BAD_GATEWAY
                }),
            )
            .with_state(calls.clone());
        let base = spawn_mock(router).await;
        let dir = IdentityToolkitDirectory::from_config(&config_for(base, 2)).unwrap();

        assert!(matches!(
            dir.get_user_by_id("uid-1").await,
            Err(DirectoryError::Upstream(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_sign_up_conflict() {
        let router = Router::new().route(
            "/v1/accounts:signUp",
            post(|| async {
                (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({ "error": { "code": 400, "message": "EMAIL_EXISTS" } })),
                )
            }),
        );
        let base = spawn_mock(router).await;
        let dir = IdentityToolkitDirectory::from_config(&config_for(base, 0)).unwrap();

        let new_user = NewUser {
            email: "taken@example.com".into(),
            password: "Str0ng!Pass".into(),
            first_name: "Taken".into(),
            last_name: "Already".into(),
        };
        assert!(matches!(
            dir.create_user(&new_user).await,
            Err(DirectoryError::Conflict)
        ));
    }

    fn sign_up_payload() -> NewUser {
        NewUser {
            email: "fresh@example.com".into(),
            password: "Str0ng!Pass".into(),
            first_name: "Fresh".into(),
            last_name: "Account".into(),
        }
    }

    #[tokio::test]
    async fn test_sign_up_not_repeated_after_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/v1/accounts:signUp",
                post(|State(calls): State<Arc<AtomicU32>>| async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        // Account is created, but the reply misses the client timeout
                        tokio::time::sleep(Duration::from_millis(1500)).await;
                        (AxumStatus::OK, Json(json!({ "localId": "uid-new" })))
                    } else {
                        (
                            AxumStatus::BAD_REQUEST,
                            Json(json!({ "error": { "message": "EMAIL_EXISTS" } })),
                        )
                    }
                }),
            )
            .with_state(calls.clone());
        let base = spawn_mock(router).await;
        let mut config = config_for(base, 2);
        config.request_timeout_secs = 1;
        let dir = IdentityToolkitDirectory::from_config(&config).unwrap();

        let result = dir.create_user(&sign_up_payload()).await;
        assert!(matches!(result, Err(DirectoryError::Upstream(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sign_up_retried_when_throttled() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/v1/accounts:signUp",
                post(
                    |State(calls): State<Arc<AtomicU32>>, headers: HeaderMap| async move {
                        let keyed = headers
                            .get(API_KEY_HEADER)
                            .is_some_and(|v| v == "test-key");
                        if !keyed {
                            return (
                                AxumStatus::BAD_REQUEST,
                                Json(json!({ "error": { "message": "API_KEY_INVALID" } })),
                            );
                        }
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            (AxumStatus::TOO_MANY_REQUESTS, Json(json!({})))
                        } else {
                            (AxumStatus::OK, Json(json!({ "localId": "uid-new" })))
                        }
                    },
                ),
            )
            .route(
                "/v1/projects/demo-project/accounts:update",
                post(|| async { Json(json!({ "localId": "uid-new" })) }),
            )
            .with_state(calls.clone());
        let base = spawn_mock(router).await;
        let dir = IdentityToolkitDirectory::from_config(&config_for(base, 2)).unwrap();

        let user = dir.create_user(&sign_up_payload()).await.unwrap();
        assert_eq!(user.id, "uid-new");
        assert_eq!(user.role, Role::User);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_upstream_errors_omit_api_key() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = config_for(format!("http://{addr}"), 0);
        config.api_key = Some("SECRET-API-KEY-123".into());
        let dir = IdentityToolkitDirectory::from_config(&config).unwrap();

        match dir.verify_credentials("a@example.com", "Str0ng!Pass").await {
            Err(DirectoryError::Upstream(detail)) => {
                assert!(!detail.contains("SECRET-API-KEY-123"), "{detail}");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_upstream() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir =
            IdentityToolkitDirectory::from_config(&config_for(format!("http://{addr}"), 1))
                .unwrap();
        assert!(matches!(
            dir.get_user_by_id("uid-1").await,
            Err(DirectoryError::Upstream(_))
        ));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let mut config = config_for("http://localhost".into(), 0);
        config.api_key = None;
        assert!(IdentityToolkitDirectory::from_config(&config).is_err());
    }
}
