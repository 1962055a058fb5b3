//! # Render model
//! Output of the builder and, on the next refresh, its "previous" input.
//! Serialized camelCase for the display layer.
//!
//! Fixed-shape parts are fixed in the types: the three hot tiles are a
//! struct (serialized as a 3-element array in event/merch/crowds order),
//! park snapshots are a `[ParkSnapshot; 4]`, and per-park sections have one
//! field per park.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::feed::{Category, DataQuality, FeedItem, Park, ParkCode, ParkColor};
use crate::sticky::Keyed;

pub const HOME_MUST_SEE_CAP: usize = 1;
pub const TOP_STORIES_CAP: usize = 5;
pub const RESORT_SPOTLIGHT_CAP: usize = 2;
pub const PARK_MUST_SEE_CAP: usize = 1;
pub const PARK_HOT_CAP: usize = 3;
pub const HEADLINES_CAP: usize = 6;
pub const RESORT_TIE_INS_CAP: usize = 3;

const HOT_TILE_PREFIX: &str = "hot-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderItem {
    pub id: String,
    pub category: Category,
    pub park: ParkCode,
    pub short: String,
    pub long: String,
    pub updated_at: String,
}

impl From<&FeedItem> for RenderItem {
    fn from(it: &FeedItem) -> Self {
        Self {
            id: it.id.clone(),
            category: it.category,
            park: it.park,
            short: it.short.clone(),
            long: it.long.clone(),
            updated_at: it.updated_at.clone(),
        }
    }
}

impl Keyed for RenderItem {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for FeedItem {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotTile {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub short: String,
    pub long: String,
    pub updated_at: String,
}

impl HotTile {
    pub fn title_for(category: Category) -> &'static str {
        match category {
            Category::EventAlert => "Events & Alerts",
            Category::LimitedMerch => "Limited Merch",
            _ => "Crowds",
        }
    }

    /// Tile backed by a feed item; id is the item id with a `hot-` prefix.
    pub fn from_item(it: &FeedItem) -> Self {
        Self {
            id: format!("{HOT_TILE_PREFIX}{}", it.id),
            category: it.category,
            title: Self::title_for(it.category).to_string(),
            short: it.short.clone(),
            long: it.long.clone(),
            updated_at: it.updated_at.clone(),
        }
    }
}

/// Hot tiles are matched against feed items by the id they were built from.
impl Keyed for HotTile {
    fn key(&self) -> &str {
        self.id.strip_prefix(HOT_TILE_PREFIX).unwrap_or(&self.id)
    }
}

/// Always exactly three tiles, in this order.
#[derive(Debug, Clone, PartialEq)]
pub struct HotTiles {
    pub event_alert: HotTile,
    pub limited_merch: HotTile,
    pub crowds: HotTile,
}

impl HotTiles {
    pub fn as_array(&self) -> [&HotTile; 3] {
        [&self.event_alert, &self.limited_merch, &self.crowds]
    }
}

impl Serialize for HotTiles {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.as_array().serialize(s)
    }
}

impl<'de> Deserialize<'de> for HotTiles {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let [event_alert, limited_merch, crowds] = <[HotTile; 3]>::deserialize(d)?;
        Ok(Self {
            event_alert,
            limited_merch,
            crowds,
        })
    }
}

/// Accepted crowd reading for one park (possibly carried from the last refresh).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderCrowd {
    pub park: Park,
    pub score: f64,
    pub label: String,
    pub avg_wait_min: f64,
    pub data_quality: DataQuality,
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkSnapshot {
    pub park: Park,
    pub name: String,
    pub color: ParkColor,
    pub crowd: RenderCrowd,
    pub headline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeSection {
    pub must_see: Vec<RenderItem>,
    pub hot_tiles: HotTiles,
    pub top_stories: Vec<RenderItem>,
    pub park_snapshots: [ParkSnapshot; 4],
    pub resort_spotlight: Vec<RenderItem>,
}

impl HomeSection {
    pub fn snapshot(&self, park: Park) -> Option<&ParkSnapshot> {
        self.park_snapshots.iter().find(|s| s.park == park)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkSection {
    pub park: Park,
    pub crowd: RenderCrowd,
    pub today_vibe: String,
    pub must_see: Vec<RenderItem>,
    pub hot: Vec<RenderItem>,
    pub headlines: Vec<RenderItem>,
    pub resort_tie_ins: Vec<RenderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkSections {
    #[serde(rename = "MK")]
    pub mk: ParkSection,
    #[serde(rename = "EPCOT")]
    pub epcot: ParkSection,
    #[serde(rename = "DHS")]
    pub dhs: ParkSection,
    #[serde(rename = "AK")]
    pub ak: ParkSection,
}

impl ParkSections {
    pub fn get(&self, park: Park) -> &ParkSection {
        match park {
            Park::Mk => &self.mk,
            Park::Epcot => &self.epcot,
            Park::Dhs => &self.dhs,
            Park::Ak => &self.ak,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParkSection> {
        Park::ALL.into_iter().map(move |p| self.get(p))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderModel {
    pub generated_at: String,
    pub crowd_generated_at: String,
    pub home: HomeSection,
    pub parks: ParkSections,
}

impl RenderModel {
    /// Short content digest of the serialized model (hex, 16 chars).
    /// Equal models always produce equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        let mut out = String::with_capacity(16);
        for b in digest.iter().take(8) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}
