use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Shortest signing secret accepted at startup.
pub const MIN_SECRET_LEN: usize = 32;

/// Longest token lifetime accepted at startup (10 years).
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const ENV_PREFIX: &str = "AUTHGATE";
const CWD_CONFIG: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Host to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Token signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED")]
    pub rate_limit_enabled: Option<bool>,

    /// Disable timeout middleware
    #[arg(long, env = "TIMEOUT_DISABLED")]
    pub timeout_disabled: Option<bool>,

    /// Identity directory backend (memory | identity_toolkit)
    #[arg(long, env = "DIRECTORY_PROVIDER")]
    pub directory_provider: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub resilience: ResilienceConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Deserialize, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
    pub requests_per_second: f32,
    pub burst_size: f32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryProvider {
    Memory,
    IdentityToolkit,
}

#[derive(Deserialize, Clone)]
pub struct DirectoryConfig {
    pub provider: DirectoryProvider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub service_token: Option<String>,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("project_id", &self.project_id)
            .field(
                "service_token",
                &self.service_token.as_ref().map(|_| "<redacted>"),
            )
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Priority: CLI flag > CLI env var > `AUTHGATE_*` env > config file > defaults.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("security.access_token_ttl_secs", 60 * 60)?
            .set_default("security.refresh_token_ttl_secs", 7 * 24 * 60 * 60)?
            .set_default("security.allowed_origins", Vec::<String>::new())?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 30)?
            .set_default("resilience.requests_per_second", 5.0)?
            .set_default("resilience.burst_size", 10.0)?
            .set_default("directory.provider", "memory")?
            .set_default(
                "directory.base_url",
                "https://identitytoolkit.googleapis.com",
            )?
            .set_default("directory.max_retries", 2)?
            .set_default("directory.retry_backoff_ms", 200)?
            .set_default("directory.request_timeout_secs", 10)?;

        // Config file: explicit path, else ./config.yaml when present
        if let Some(path) = &cli.config {
            builder = builder.add_source(File::with_name(path).required(true));
        } else if Path::new(CWD_CONFIG).exists() {
            builder = builder.add_source(File::with_name(CWD_CONFIG).required(false));
        }

        // AUTHGATE_SERVER__PORT=9000, AUTHGATE_SECURITY__ALLOWED_ORIGINS=a,b
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("security.allowed_origins")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(secret) = cli.jwt_secret {
            builder = builder.set_override("security.jwt_secret", secret)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(td) = cli.timeout_disabled {
            builder = builder.set_override("resilience.timeout_disabled", td)?;
        }
        if let Some(provider) = cli.directory_provider {
            builder = builder.set_override("directory.provider", provider)?;
        }

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.security.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(config::ConfigError::Message(format!(
                "security.jwt_secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.security.access_token_ttl_secs == 0 || self.security.refresh_token_ttl_secs == 0
        {
            return Err(config::ConfigError::Message(
                "token lifetimes must be positive".to_string(),
            ));
        }
        if self.security.refresh_token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(config::ConfigError::Message(format!(
                "token lifetimes must not exceed {MAX_TOKEN_TTL_SECS} seconds"
            )));
        }
        if self.security.access_token_ttl_secs >= self.security.refresh_token_ttl_secs {
            return Err(config::ConfigError::Message(
                "access tokens must expire before refresh tokens".to_string(),
            ));
        }
        if self.resilience.rate_limit_enabled
            && (self.resilience.requests_per_second <= 0.0 || self.resilience.burst_size < 1.0)
        {
            return Err(config::ConfigError::Message(
                "rate limit needs requests_per_second > 0 and burst_size >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
