// src/config.rs
//! Dashboard configuration (TOML) with env overrides.
//!
//! Resolution:
//! 1) `$DASHBOARD_CONFIG_PATH` (must exist when set)
//! 2) `config/dashboard.toml`
//! 3) built-in defaults
//!
//! Env overrides applied on top: `DASHBOARD_CACHE_TTL_SECS`,
//! `DASHBOARD_NEWSLETTER_PATH`, `DASHBOARD_CROWDS_PATH`.
//!
//! ```toml
//! [scoring]
//! event_alert = 6.0
//! recency_hours_per_point = 6.0
//!
//! [selection]
//! promotion_margin = 2.0
//!
//! [cache]
//! ttl_secs = 300
//!
//! [sources]
//! newsletter_path = "data/newsletter-latest.json"
//! crowds_path = "data/crowds-latest.json"
//! ```

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scoring::ScoringWeights;

pub const DEFAULT_DASHBOARD_CONFIG_PATH: &str = "config/dashboard.toml";
pub const ENV_DASHBOARD_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "DASHBOARD_CACHE_TTL_SECS";
pub const ENV_NEWSLETTER_PATH: &str = "DASHBOARD_NEWSLETTER_PATH";
pub const ENV_CROWDS_PATH: &str = "DASHBOARD_CROWDS_PATH";

pub const DEFAULT_PROMOTION_MARGIN: f64 = 2.0;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Score lead a fresh item needs over the current leader to take its place.
    pub promotion_margin: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            promotion_margin: DEFAULT_PROMOTION_MARGIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Freshness window of a fetched raw snapshot.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub newsletter_path: PathBuf,
    pub crowds_path: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            newsletter_path: PathBuf::from("data/newsletter-latest.json"),
            crowds_path: PathBuf::from("data/crowds-latest.json"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub scoring: ScoringWeights,
    pub selection: SelectionConfig,
    pub cache: CacheConfig,
    pub sources: SourcesConfig,
}

impl DashboardConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: DashboardConfig = toml::from_str(s).context("parsing dashboard config")?;
        // harden: a NaN/negative margin would make every fresh item promotable
        if !cfg.selection.promotion_margin.is_finite() || cfg.selection.promotion_margin < 0.0 {
            cfg.selection.promotion_margin = DEFAULT_PROMOTION_MARGIN;
        }
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolve file + env as described in the module docs.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_DASHBOARD_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_DASHBOARD_CONFIG_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            Self::from_path(&pb)?
        } else {
            let default_path = PathBuf::from(DEFAULT_DASHBOARD_CONFIG_PATH);
            if default_path.exists() {
                Self::from_path(&default_path)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(ttl) = std::env::var(ENV_CACHE_TTL_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.cache.ttl_secs = ttl;
        }
        if let Ok(p) = std::env::var(ENV_NEWSLETTER_PATH) {
            self.sources.newsletter_path = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var(ENV_CROWDS_PATH) {
            self.sources.crowds_path = PathBuf::from(p);
        }
    }
}
