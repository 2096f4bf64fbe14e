//! authgate server entry point.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use authgate::{config::AppConfig, server, telemetry};
use dotenvy::dotenv;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before config reads the environment
    let _ = dotenv();

    telemetry::init();

    let config = match AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    info!(
        name: "config.loaded",
        host = %config.server.host,
        port = config.server.port,
        directory = ?config.directory.provider,
        rate_limit = config.resilience.rate_limit_enabled,
        "Configuration loaded"
    );

    server::start_server(config).await
}
