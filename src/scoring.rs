//! Item scoring and per-pool sanitation.
//!
//! score = category weight + must-see boost + confidence term + recency boost
//!
//! The recency boost decays linearly from `recency_max_boost` to zero over
//! `recency_max_boost * recency_hours_per_point` hours (2 * 6 = 12h by default).

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::feed::{Category, Confidence, FeedItem, Urgency};

/// Tunable scoring constants. Defaults reproduce the production ranking.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub event_alert: f64,
    pub limited_merch: f64,
    pub crowds: f64,
    pub entertainment: f64,
    pub food: f64,
    pub other: f64,
    pub must_see_boost: f64,
    pub confidence_high: f64,
    pub confidence_med: f64,
    pub confidence_low: f64,
    pub recency_max_boost: f64,
    pub recency_hours_per_point: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            event_alert: 6.0,
            limited_merch: 5.0,
            crowds: 4.0,
            entertainment: 3.0,
            food: 2.0,
            other: 1.0,
            must_see_boost: 4.0,
            confidence_high: 1.0,
            confidence_med: 0.0,
            confidence_low: -10.0,
            recency_max_boost: 2.0,
            recency_hours_per_point: 6.0,
        }
    }
}

impl ScoringWeights {
    pub fn category_weight(&self, c: Category) -> f64 {
        match c {
            Category::EventAlert => self.event_alert,
            Category::LimitedMerch => self.limited_merch,
            Category::Crowds => self.crowds,
            Category::Entertainment => self.entertainment,
            Category::Food => self.food,
            Category::Other => self.other,
            Category::Unknown => 0.0,
        }
    }

    /// Absent confidence scores as `med`.
    pub fn confidence_term(&self, c: Option<Confidence>) -> f64 {
        match c.unwrap_or(Confidence::Med) {
            Confidence::High => self.confidence_high,
            Confidence::Med => self.confidence_med,
            Confidence::Low => self.confidence_low,
        }
    }
}

/// Parse an RFC 3339 timestamp, `None` when malformed or empty.
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Expired when `expires_at` is present, parseable and not after `now`.
pub fn is_expired(item: &FeedItem, now: DateTime<Utc>) -> bool {
    item.expires_at
        .as_deref()
        .and_then(parse_ts)
        .is_some_and(|exp| exp <= now)
}

pub fn is_low_confidence(item: &FeedItem) -> bool {
    item.confidence == Some(Confidence::Low)
}

/// Keep only displayable items: non-empty id, not expired, not low confidence.
pub fn sanitize<'a, I>(items: I, now: DateTime<Utc>) -> Vec<FeedItem>
where
    I: IntoIterator<Item = &'a FeedItem>,
{
    items
        .into_iter()
        .filter(|it| !it.id.is_empty() && !is_expired(it, now) && !is_low_confidence(it))
        .cloned()
        .collect()
}

/// Hours since `updated_at`, never negative. `None` when the timestamp is unusable.
fn age_hours(item: &FeedItem, now: DateTime<Utc>) -> Option<f64> {
    let updated = parse_ts(&item.updated_at)?;
    let millis = (now - updated).num_milliseconds() as f64;
    Some((millis / 3_600_000.0).max(0.0))
}

pub fn recency_boost(item: &FeedItem, now: DateTime<Utc>, w: &ScoringWeights) -> f64 {
    match age_hours(item, now) {
        Some(h) if w.recency_hours_per_point > 0.0 => {
            (w.recency_max_boost - h / w.recency_hours_per_point).max(0.0)
        }
        _ => 0.0,
    }
}

/// Ranking score of a single item at `now`.
pub fn score_item(item: &FeedItem, now: DateTime<Utc>, w: &ScoringWeights) -> f64 {
    let base = w.category_weight(item.category);
    let urgency = if item.urgency == Urgency::MustSeeToday {
        w.must_see_boost
    } else {
        0.0
    };
    base + urgency + w.confidence_term(item.confidence) + recency_boost(item, now, w)
}
