use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize application logging.
///
/// - `tracing-subscriber::fmt` compact layer for structured logging.
/// - `EnvFilter` for dynamic log levels (`RUST_LOG`), defaulting to
///   `info,authgate=debug`.
///
/// Audit events are emitted on the `audit` target, so `RUST_LOG=audit=info`
/// isolates them.
pub fn init() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .compact();

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,authgate=debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
