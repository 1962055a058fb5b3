//! Park Dashboard: binary entrypoint.
//! Boots the Axum HTTP server serving the dashboard render model.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use park_dashboard::metrics::Metrics;

/// Compact logs by default, JSON lines with DASHBOARD_LOG_JSON=1.
/// Filter from RUST_LOG, falling back to `park_dashboard=info,warn`.
/// No-op when the runtime already installed a subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("park_dashboard=info,dashboard=info,warn"));

    let json = std::env::var("DASHBOARD_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already set");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let metrics = Metrics::init()?;
    let router = park_dashboard::app().await?.merge(metrics.router());

    Ok(router.into())
}
