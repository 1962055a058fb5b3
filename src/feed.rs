//! # Feed snapshots
//! Wire shapes of the two upstream feeds (newsletter + crowds) and the
//! caller-side structural validation run before a snapshot reaches the
//! builder.
//!
//! Item-level fields are lenient: anything optional defaults, unknown
//! enum strings fall back to a neutral variant. Top-level structure is
//! strict and checked by [`parse_newsletter`] / [`parse_crowds`].

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Editorial category of a feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    EventAlert,
    LimitedMerch,
    Crowds,
    Entertainment,
    Food,
    Other,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    MustSeeToday,
    #[default]
    #[serde(other)]
    Normal,
}

/// Park tag carried by feed items (includes the non-park buckets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParkCode {
    Mk,
    Epcot,
    Dhs,
    Ak,
    Resorts,
    #[default]
    #[serde(other)]
    Home,
}

/// One of the four theme parks that get their own dashboard section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Park {
    Mk,
    Epcot,
    Dhs,
    Ak,
}

impl Park {
    /// Fixed display order.
    pub const ALL: [Park; 4] = [Park::Mk, Park::Epcot, Park::Dhs, Park::Ak];

    pub fn code(self) -> &'static str {
        match self {
            Park::Mk => "MK",
            Park::Epcot => "EPCOT",
            Park::Dhs => "DHS",
            Park::Ak => "AK",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Park::Mk => "Magic Kingdom",
            Park::Epcot => "EPCOT",
            Park::Dhs => "Hollywood Studios",
            Park::Ak => "Animal Kingdom",
        }
    }

    pub fn color(self) -> ParkColor {
        match self {
            Park::Mk => ParkColor::Blue,
            Park::Epcot => ParkColor::Purple,
            Park::Dhs => ParkColor::Red,
            Park::Ak => ParkColor::Green,
        }
    }
}

impl From<Park> for ParkCode {
    fn from(p: Park) -> Self {
        match p {
            Park::Mk => ParkCode::Mk,
            Park::Epcot => ParkCode::Epcot,
            Park::Dhs => ParkCode::Dhs,
            Park::Ak => ParkCode::Ak,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkColor {
    Blue,
    Purple,
    Red,
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
    #[serde(other)]
    Med,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Good,
    Bad,
    #[serde(other)]
    Limited,
}

/// `null` reads as the field's default.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Editorial content unit. Immutable within a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedItem {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: Category,
    #[serde(deserialize_with = "null_as_default")]
    pub urgency: Urgency,
    #[serde(deserialize_with = "null_as_default")]
    pub park: ParkCode,
    #[serde(deserialize_with = "null_as_default")]
    pub short: String,
    #[serde(deserialize_with = "null_as_default")]
    pub long: String,
    #[serde(alias = "updatedAt", deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    #[serde(alias = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Per-park map with a fixed key set. Keys other than MK/EPCOT/DHS/AK are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerPark<T> {
    #[serde(rename = "MK", default, skip_serializing_if = "Option::is_none")]
    pub mk: Option<T>,
    #[serde(rename = "EPCOT", default, skip_serializing_if = "Option::is_none")]
    pub epcot: Option<T>,
    #[serde(rename = "DHS", default, skip_serializing_if = "Option::is_none")]
    pub dhs: Option<T>,
    #[serde(rename = "AK", default, skip_serializing_if = "Option::is_none")]
    pub ak: Option<T>,
}

impl<T> Default for PerPark<T> {
    fn default() -> Self {
        Self {
            mk: None,
            epcot: None,
            dhs: None,
            ak: None,
        }
    }
}

impl<T> PerPark<T> {
    pub fn get(&self, park: Park) -> Option<&T> {
        match park {
            Park::Mk => self.mk.as_ref(),
            Park::Epcot => self.epcot.as_ref(),
            Park::Dhs => self.dhs.as_ref(),
            Park::Ak => self.ak.as_ref(),
        }
    }

    pub fn set(&mut self, park: Park, value: T) {
        let slot = match park {
            Park::Mk => &mut self.mk,
            Park::Epcot => &mut self.epcot,
            Park::Dhs => &mut self.dhs,
            Park::Ak => &mut self.ak,
        };
        *slot = Some(value);
    }

    /// Present entries in fixed park order.
    pub fn iter(&self) -> impl Iterator<Item = (Park, &T)> {
        Park::ALL
            .into_iter()
            .filter_map(move |p| self.get(p).map(|v| (p, v)))
    }
}

/* ----------------------------
Newsletter feed
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsletterFeed {
    pub generated_at: String,
    pub home: HomeFeed,
    pub parks: PerPark<ParkFeed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomeFeed {
    pub must_see: Vec<FeedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_tiles: Option<Vec<FeedItem>>,
    pub top_stories: Vec<FeedItem>,
    pub parks_summary: Vec<ParkSummary>,
    pub resorts_blurb: Vec<FeedItem>,
}

/// Only used as a headline fallback for the home park snapshots.
/// Entries tagged with anything but one of the four parks never match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParkSummary {
    #[serde(deserialize_with = "null_as_default")]
    pub park: ParkCode,
    #[serde(deserialize_with = "null_as_default")]
    pub headline: String,
    #[serde(alias = "updatedAt", deserialize_with = "null_as_default")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParkFeed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub today_vibe: Option<String>,
    pub must_see: Vec<FeedItem>,
    pub hot: Vec<FeedItem>,
    pub headlines: Vec<FeedItem>,
    pub resort_blurbs: Vec<FeedItem>,
}

/* ----------------------------
Crowds feed
---------------------------- */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdsFeed {
    pub generated_at: String,
    pub parks: PerPark<CrowdEntry>,
}

/// Raw crowd reading for one park. Every field may be absent upstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrowdEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_wait_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_quality: Option<DataQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/* ----------------------------
Structural validation (caller side)
---------------------------- */

const HOME_ARRAYS: [&str; 4] = ["mustSee", "topStories", "parksSummary", "resortsBlurb"];
const PARK_ARRAYS: [&str; 4] = ["mustSee", "hot", "headlines", "resortBlurbs"];

/// Check the top-level shape of a newsletter snapshot.
pub fn validate_newsletter_json(v: &Value) -> Result<()> {
    let root = v.as_object().context("newsletter: top level is not an object")?;
    if !root.get("generated_at").is_some_and(Value::is_string) {
        bail!("newsletter: missing `generated_at`");
    }

    let home = root
        .get("home")
        .and_then(Value::as_object)
        .context("newsletter: missing `home` object")?;
    for key in HOME_ARRAYS {
        if !home.get(key).is_some_and(Value::is_array) {
            bail!("newsletter: `home.{key}` must be an array");
        }
    }
    if let Some(hot) = home.get("hotTiles") {
        if !hot.is_array() && !hot.is_null() {
            bail!("newsletter: `home.hotTiles` must be an array when present");
        }
    }

    let parks = root
        .get("parks")
        .and_then(Value::as_object)
        .context("newsletter: missing `parks` object")?;
    for park in Park::ALL {
        let Some(entry) = parks.get(park.code()) else {
            continue;
        };
        let entry = entry
            .as_object()
            .with_context(|| format!("newsletter: `parks.{}` is not an object", park.code()))?;
        for key in PARK_ARRAYS {
            if !entry.get(key).is_some_and(Value::is_array) {
                bail!("newsletter: `parks.{}.{key}` must be an array", park.code());
            }
        }
    }
    Ok(())
}

/// Check the top-level shape of a crowds snapshot.
pub fn validate_crowds_json(v: &Value) -> Result<()> {
    let root = v.as_object().context("crowds: top level is not an object")?;
    if !root.get("generated_at").is_some_and(Value::is_string) {
        bail!("crowds: missing `generated_at`");
    }
    let parks = root
        .get("parks")
        .and_then(Value::as_object)
        .context("crowds: missing `parks` object")?;
    for park in Park::ALL {
        let Some(entry) = parks.get(park.code()) else {
            continue;
        };
        let entry = entry
            .as_object()
            .with_context(|| format!("crowds: `parks.{}` is not an object", park.code()))?;
        if let Some(score) = entry.get("score") {
            if !score.is_number() && !score.is_null() {
                bail!("crowds: `parks.{}.score` must be a number", park.code());
            }
        }
    }
    Ok(())
}

pub fn newsletter_from_value(v: Value) -> Result<NewsletterFeed> {
    validate_newsletter_json(&v)?;
    serde_json::from_value(v).context("newsletter: typed parse failed")
}

pub fn crowds_from_value(v: Value) -> Result<CrowdsFeed> {
    validate_crowds_json(&v)?;
    serde_json::from_value(v).context("crowds: typed parse failed")
}

/// Parse + validate a newsletter snapshot from raw JSON text.
pub fn parse_newsletter(s: &str) -> Result<NewsletterFeed> {
    let v: Value = serde_json::from_str(s).context("newsletter: invalid JSON")?;
    newsletter_from_value(v)
}

/// Parse + validate a crowds snapshot from raw JSON text.
pub fn parse_crowds(s: &str) -> Result<CrowdsFeed> {
    let v: Value = serde_json::from_str(s).context("crowds: invalid JSON")?;
    crowds_from_value(v)
}
