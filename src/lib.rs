// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod api;
pub mod config;
pub mod metrics;

// Render-model core: feed shapes, scoring, sticky selection, crowd coercion, assembly.
pub mod builder;
pub mod crowd;
pub mod feed;
pub mod model;
pub mod scoring;
pub mod sticky;

// Caller-side cache around the builder
pub mod refresh;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::builder::{build_render_model, Ranking};
pub use crate::config::DashboardConfig;
pub use crate::model::RenderModel;
pub use crate::refresh::{DashboardState, FeedSource, FileFeedSource};

use std::sync::Arc;

/// Build the full application router from config on disk/env.
/// Does not install the metrics recorder; the binary does that once.
pub async fn app() -> anyhow::Result<axum::Router> {
    let cfg = DashboardConfig::load()?;
    let source = Arc::new(FileFeedSource::from_config(&cfg.sources));
    tracing::info!(
        target: "dashboard",
        newsletter = %cfg.sources.newsletter_path.display(),
        crowds = %cfg.sources.crowds_path.display(),
        ttl_secs = cfg.cache.ttl_secs,
        "dashboard configured"
    );
    let state = AppState {
        dashboard: Arc::new(DashboardState::from_config(source, &cfg)),
    };
    Ok(create_router(state))
}
