// src/refresh.rs
//! Caller-side refresh loop around the pure builder.
//!
//! Keeps the last raw snapshots (reused while younger than the cache TTL)
//! and the last render model, which becomes `previous` for the next build.
//! The slot is behind one async mutex so concurrent refreshes are
//! serialized and never race on `previous`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::sync::Mutex;

use crate::builder::{build_render_model, Ranking};
use crate::config::{DashboardConfig, SourcesConfig};
use crate::feed::{parse_crowds, parse_newsletter, CrowdsFeed, NewsletterFeed};
use crate::model::RenderModel;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("dashboard_refresh_total", "Render models built.");
        describe_counter!(
            "dashboard_fetch_errors_total",
            "Feed fetch/parse failures."
        );
        describe_counter!(
            "dashboard_stale_served_total",
            "Refreshes answered with the previous model after a fetch failure."
        );
        describe_histogram!("dashboard_build_ms", "Render model build time in milliseconds.");
        describe_gauge!("dashboard_cache_ttl_secs", "Raw snapshot freshness window.");
    });
}

// chrono::Duration holds at most i64::MAX milliseconds.
const MAX_TTL_SECS: u64 = (i64::MAX / 1_000) as u64;

/// Where the two upstream snapshots come from.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_newsletter(&self) -> Result<NewsletterFeed>;
    async fn fetch_crowds(&self) -> Result<CrowdsFeed>;
    fn name(&self) -> &'static str;
}

/// Reads both snapshots from JSON files on each fetch.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    newsletter_path: PathBuf,
    crowds_path: PathBuf,
}

impl FileFeedSource {
    pub fn new(newsletter_path: impl Into<PathBuf>, crowds_path: impl Into<PathBuf>) -> Self {
        Self {
            newsletter_path: newsletter_path.into(),
            crowds_path: crowds_path.into(),
        }
    }

    pub fn from_config(cfg: &SourcesConfig) -> Self {
        Self::new(&cfg.newsletter_path, &cfg.crowds_path)
    }

    async fn read(path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading feed snapshot {}", path.display()))
    }
}

#[async_trait::async_trait]
impl FeedSource for FileFeedSource {
    async fn fetch_newsletter(&self) -> Result<NewsletterFeed> {
        let s = Self::read(&self.newsletter_path).await?;
        parse_newsletter(&s).with_context(|| format!("in {}", self.newsletter_path.display()))
    }

    async fn fetch_crowds(&self) -> Result<CrowdsFeed> {
        let s = Self::read(&self.crowds_path).await?;
        parse_crowds(&s).with_context(|| format!("in {}", self.crowds_path.display()))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

#[derive(Debug, Clone)]
struct RawSnapshot {
    newsletter: NewsletterFeed,
    crowds: CrowdsFeed,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Slot {
    raw: Option<RawSnapshot>,
    previous: Option<RenderModel>,
}

/// Result of one refresh.
#[derive(Debug, Clone)]
pub struct Refreshed {
    pub model: RenderModel,
    /// True when `model` is the previous one, served because fetching failed.
    pub stale: bool,
    pub error: Option<String>,
}

pub struct DashboardState {
    source: Arc<dyn FeedSource>,
    ranking: Ranking,
    ttl: Duration,
    slot: Mutex<Slot>,
}

impl DashboardState {
    pub fn new(source: Arc<dyn FeedSource>, ranking: Ranking, ttl_secs: u64) -> Self {
        ensure_metrics_described();
        gauge!("dashboard_cache_ttl_secs").set(ttl_secs as f64);
        Self {
            source,
            ranking,
            ttl: Duration::seconds(ttl_secs.min(MAX_TTL_SECS) as i64),
            slot: Mutex::new(Slot::default()),
        }
    }

    pub fn from_config(source: Arc<dyn FeedSource>, cfg: &DashboardConfig) -> Self {
        let ranking = Ranking {
            weights: cfg.scoring,
            selection: cfg.selection,
        };
        Self::new(source, ranking, cfg.cache.ttl_secs)
    }

    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    /// Last built model, if any.
    pub async fn previous(&self) -> Option<RenderModel> {
        self.slot.lock().await.previous.clone()
    }

    async fn fetch(&self) -> Result<(NewsletterFeed, CrowdsFeed)> {
        tokio::try_join!(self.source.fetch_newsletter(), self.source.fetch_crowds())
    }

    /// Build a new model at `now`.
    ///
    /// Cached snapshots are reused while fresh unless `force` is set. When a
    /// fetch fails the previous model is returned as stale; with no previous
    /// model the error is returned.
    pub async fn refresh(&self, force: bool, now: DateTime<Utc>) -> Result<Refreshed> {
        let mut slot = self.slot.lock().await;

        let cache_fresh = !force
            && slot
                .raw
                .as_ref()
                .is_some_and(|r| now.signed_duration_since(r.fetched_at) < self.ttl);

        if !cache_fresh {
            match self.fetch().await {
                Ok((newsletter, crowds)) => {
                    slot.raw = Some(RawSnapshot {
                        newsletter,
                        crowds,
                        fetched_at: now,
                    });
                }
                Err(e) => {
                    counter!("dashboard_fetch_errors_total").increment(1);
                    tracing::warn!(
                        target: "dashboard",
                        source = self.source.name(),
                        "feed fetch failed: {e:#}"
                    );
                    return match slot.previous.clone() {
                        Some(model) => {
                            counter!("dashboard_stale_served_total").increment(1);
                            Ok(Refreshed {
                                model,
                                stale: true,
                                error: Some(format!("{e:#}")),
                            })
                        }
                        None => Err(e.context("no dashboard available yet")),
                    };
                }
            }
        }

        let Slot { raw, previous } = &mut *slot;
        let raw = raw.as_ref().context("raw snapshot missing after fetch")?;

        let started = Instant::now();
        let model = build_render_model(
            &raw.newsletter,
            &raw.crowds,
            previous.as_ref(),
            now,
            &self.ranking,
        );
        histogram!("dashboard_build_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        counter!("dashboard_refresh_total").increment(1);

        tracing::info!(
            target: "dashboard",
            cached = cache_fresh,
            fingerprint = %model.fingerprint(),
            "dashboard refreshed"
        );

        *previous = Some(model.clone());
        Ok(Refreshed {
            model,
            stale: false,
            error: None,
        })
    }
}
