//! Crowd readings: coercion with carry-forward fallback, and the
//! synthesized "Crowds" hot tile.

use crate::feed::{Category, CrowdEntry, CrowdsFeed, DataQuality, Park};
use crate::model::{HotTile, RenderCrowd};

pub const DATA_LIMITED: &str = "Data limited";
pub const DEFAULT_LABEL: &str = "Moderate";
const DEFAULT_SCORE: f64 = 5.0;
const RISING_THRESHOLD: f64 = 8.0;

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.is_empty())
}

/// Turn a raw reading into an accepted one.
///
/// Missing or `bad` input with a previous reading carries the previous
/// reading forward, flagged as limited. Anything else builds a fresh
/// reading, filling gaps from the previous one and then from defaults.
pub fn coerce_crowd(
    park: Park,
    raw: Option<&CrowdEntry>,
    previous: Option<&RenderCrowd>,
    fallback_ts: &str,
) -> RenderCrowd {
    let quality = raw
        .and_then(|c| c.data_quality)
        .unwrap_or(DataQuality::Limited);
    let unusable = raw.is_none() || quality == DataQuality::Bad;

    if unusable {
        if let Some(prev) = previous {
            tracing::debug!(
                target: "dashboard",
                park = park.code(),
                missing = raw.is_none(),
                "crowd reading unusable, carrying previous"
            );
            return RenderCrowd {
                note: Some(DATA_LIMITED.to_string()),
                data_quality: DataQuality::Limited,
                ..prev.clone()
            };
        }
    }

    // A zero score reads as "no score", same as absent.
    let score = raw
        .and_then(|c| c.score)
        .filter(|s| s.is_finite() && *s != 0.0)
        .or_else(|| previous.map(|p| p.score))
        .unwrap_or(DEFAULT_SCORE)
        .clamp(1.0, 10.0);

    let label = non_empty(raw.and_then(|c| c.label.as_deref()))
        .or_else(|| non_empty(previous.map(|p| p.label.as_str())))
        .unwrap_or(DEFAULT_LABEL)
        .to_string();

    let avg_wait_min = raw
        .and_then(|c| c.avg_wait_min)
        .or_else(|| previous.map(|p| p.avg_wait_min))
        .unwrap_or(0.0);

    let generated_at = non_empty(raw.and_then(|c| c.generated_at.as_deref()))
        .or_else(|| non_empty(previous.map(|p| p.generated_at.as_str())))
        .unwrap_or(fallback_ts)
        .to_string();

    RenderCrowd {
        park,
        score,
        label,
        avg_wait_min,
        data_quality: quality,
        generated_at,
        note: (quality != DataQuality::Good).then(|| DATA_LIMITED.to_string()),
    }
}

/// The busiest park in the feed; ties go to the earlier park in display order.
fn busiest(crowds: &CrowdsFeed) -> Option<(Park, &CrowdEntry)> {
    let mut best: Option<(Park, &CrowdEntry)> = None;
    for (park, entry) in crowds.parks.iter() {
        let s = entry.score.unwrap_or(0.0);
        match best {
            Some((_, b)) if b.score.unwrap_or(0.0) >= s => {}
            _ => best = Some((park, entry)),
        }
    }
    best
}

/// Synthesized fresh every refresh from the crowd feed; never sticky.
pub fn build_crowd_tile(crowds: &CrowdsFeed, fallback_ts: &str) -> HotTile {
    let top = busiest(crowds);

    let long = match top {
        Some((park, e)) if e.score.unwrap_or(0.0) >= RISING_THRESHOLD => {
            format!("Crowds rising at {}", park.display_name())
        }
        _ => "Crowds steady".to_string(),
    };
    let short = match top {
        Some((_, e)) => format!(
            "{} ({}/10)",
            non_empty(e.label.as_deref()).unwrap_or(DEFAULT_LABEL),
            e.score.unwrap_or(0.0)
        ),
        None => DATA_LIMITED.to_string(),
    };
    let updated_at = if crowds.generated_at.is_empty() {
        fallback_ts.to_string()
    } else {
        crowds.generated_at.clone()
    };

    HotTile {
        id: "hot-crowds".to_string(),
        category: Category::Crowds,
        title: HotTile::title_for(Category::Crowds).to_string(),
        short,
        long,
        updated_at,
    }
}
