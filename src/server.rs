use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::IntoResponse,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::api;
use crate::auth::{auth_middleware, rate_limit_middleware};
use crate::config::{AppConfig, DirectoryProvider};
use crate::error::AppError;
use crate::identity::{IdentityProvider, IdentityToolkitDirectory, MemoryDirectory};

/// Request bodies are small JSON documents.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

const SECURITY_HEADERS: [(HeaderName, &str); 6] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (
        header::STRICT_TRANSPORT_SECURITY,
        "max-age=31536000; includeSubDomains",
    ),
    (header::CONTENT_SECURITY_POLICY, "default-src 'none'"),
    (header::CACHE_CONTROL, "no-store"),
];

/// Build the shared state, picking the directory named in the config.
pub fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let directory: Arc<dyn IdentityProvider> = match config.directory.provider {
        DirectoryProvider::Memory => {
            warn!(
                name: "directory.memory",
                "Using the in-memory directory; accounts are lost on restart"
            );
            Arc::new(MemoryDirectory::new())
        }
        DirectoryProvider::IdentityToolkit => {
            Arc::new(IdentityToolkitDirectory::from_config(&config.directory)?)
        }
    };
    info!(
        name: "directory.ready",
        provider = ?config.directory.provider,
        "Identity directory configured"
    );

    Ok(AppState::new(Arc::new(config), directory))
}

/// Assemble the route table and middleware stack.
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let protected = api::protected_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    // A disabled timeout is a very long one, so the layer stack keeps one type.
    let timeout_duration = if config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(config.resilience.request_timeout_secs)
    };

    let mut app = api::public_routes()
        .merge(protected)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            let duration = timeout_duration;
            async move {
                match tokio::time::timeout(duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => AppError::Timeout.into_response(),
                }
            }
        }))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors_layer(&config.security.allowed_origins))
        .with_state(state);

    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::overriding(
            name,
            HeaderValue::from_static(value),
        ));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Only the configured origins may make cross-origin calls.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if value != "*" => Some(value),
            _ => {
                warn!(name: "cors.origin.invalid", origin = %origin, "Ignoring invalid origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(600))
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(name: "server.signal.failed", error = %err, "Could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
