//! # Render-model builder
//! Pure, deterministic merge of a newsletter snapshot and a crowds snapshot
//! into a bounded [`RenderModel`], keeping list order continuous with the
//! previous model. No I/O; `now` is supplied by the caller.
//!
//! Every pool is sanitized on its own before selection; every list goes
//! through [`sticky_select`] with its own cap.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::SelectionConfig;
use crate::crowd::{build_crowd_tile, coerce_crowd};
use crate::feed::{
    Category, CrowdsFeed, FeedItem, NewsletterFeed, Park, ParkCode, ParkFeed, Urgency,
};
use crate::model::{
    HomeSection, HotTile, HotTiles, ParkSection, ParkSections, ParkSnapshot, RenderItem,
    RenderModel, HEADLINES_CAP, HOME_MUST_SEE_CAP, PARK_HOT_CAP, PARK_MUST_SEE_CAP,
    RESORT_SPOTLIGHT_CAP, RESORT_TIE_INS_CAP, TOP_STORIES_CAP,
};
use crate::scoring::{sanitize, score_item, ScoringWeights};
use crate::sticky::{sticky_select, Keyed};

/// Ranking knobs used by the builder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Ranking {
    pub weights: ScoringWeights,
    pub selection: SelectionConfig,
}

const NO_MAJOR_UPDATES: &str = "No major updates";

/// Per-call context: clock + knobs.
struct Ctx<'a> {
    now: DateTime<Utc>,
    rank: &'a Ranking,
}

impl Ctx<'_> {
    fn score(&self, it: &FeedItem) -> f64 {
        score_item(it, self.now, &self.rank.weights)
    }

    fn sanitize(&self, items: &[FeedItem]) -> Vec<FeedItem> {
        sanitize(items, self.now)
    }

    fn select<'p, P: Keyed>(
        &self,
        pool: &'p [FeedItem],
        previous: &[P],
        limit: usize,
    ) -> Vec<&'p FeedItem> {
        sticky_select(
            pool,
            previous,
            limit,
            self.rank.selection.promotion_margin,
            |it| self.score(it),
        )
    }

    fn select_render<P: Keyed>(
        &self,
        pool: &[FeedItem],
        previous: &[P],
        limit: usize,
    ) -> Vec<RenderItem> {
        self.select(pool, previous, limit)
            .into_iter()
            .map(RenderItem::from)
            .collect()
    }

    /// Sticky cap-1 pick of one category, carrying only previous entries of that category.
    fn pick_category<'p, P>(
        &self,
        pool: &'p [FeedItem],
        category: Category,
        previous: &[P],
    ) -> Option<&'p FeedItem>
    where
        P: Keyed + HasCategory,
    {
        let candidates: Vec<&FeedItem> = pool.iter().filter(|it| it.category == category).collect();
        let prev: Vec<&P> = previous.iter().filter(|p| p.category() == category).collect();
        self.select_refs(&candidates, &prev)
    }

    fn select_refs<'p, P: Keyed>(
        &self,
        candidates: &[&'p FeedItem],
        previous: &[P],
    ) -> Option<&'p FeedItem> {
        sticky_select(
            candidates,
            previous,
            1,
            self.rank.selection.promotion_margin,
            |it| self.score(it),
        )
        .first()
        .map(|it| **it)
    }
}

/// Category accessor for previous-cycle entries.
trait HasCategory {
    fn category(&self) -> Category;
}

impl HasCategory for RenderItem {
    fn category(&self) -> Category {
        self.category
    }
}

impl HasCategory for HotTile {
    fn category(&self) -> Category {
        self.category
    }
}

impl<T: HasCategory> HasCategory for &T {
    fn category(&self) -> Category {
        (**self).category()
    }
}

fn must_see_candidates(ctx: &Ctx<'_>, items: &[FeedItem]) -> Vec<FeedItem> {
    ctx.sanitize(items)
        .into_iter()
        .filter(|it| it.urgency == Urgency::MustSeeToday)
        .collect()
}

fn fallback_tile(category: Category, ts: &str) -> HotTile {
    let (id, short, long) = match category {
        Category::EventAlert => (
            "hot-event-fallback",
            "No urgent alerts",
            "No urgent alerts right now.",
        ),
        _ => (
            "hot-merch-fallback",
            "No merch alerts",
            "No limited merch alert right now.",
        ),
    };
    HotTile {
        id: id.to_string(),
        category,
        title: HotTile::title_for(category).to_string(),
        short: short.to_string(),
        long: long.to_string(),
        updated_at: ts.to_string(),
    }
}

fn or_fallback(s: &str, fallback: &str) -> String {
    if s.is_empty() {
        fallback.to_string()
    } else {
        s.to_string()
    }
}

fn build_home(
    ctx: &Ctx<'_>,
    newsletter: &NewsletterFeed,
    crowds: &CrowdsFeed,
    previous: Option<&RenderModel>,
    generated_at: &str,
    crowd_generated_at: &str,
) -> HomeSection {
    let home = &newsletter.home;
    let prev_home = previous.map(|p| &p.home);
    let no_items: &[RenderItem] = &[];

    let must_pool = must_see_candidates(ctx, &home.must_see);
    let must_see = ctx.select_render(
        &must_pool,
        prev_home.map_or(no_items, |h| h.must_see.as_slice()),
        HOME_MUST_SEE_CAP,
    );

    let hot_tiles_raw = home.hot_tiles.as_deref().unwrap_or_default();
    let home_pool = ctx.sanitize(
        &[home.must_see.as_slice(), home.top_stories.as_slice(), hot_tiles_raw].concat(),
    );
    let prev_tiles: Vec<&HotTile> = prev_home
        .map(|h| h.hot_tiles.as_array().to_vec())
        .unwrap_or_default();
    let event_alert = ctx
        .pick_category(&home_pool, Category::EventAlert, &prev_tiles)
        .map(HotTile::from_item)
        .unwrap_or_else(|| fallback_tile(Category::EventAlert, generated_at));
    let limited_merch = ctx
        .pick_category(&home_pool, Category::LimitedMerch, &prev_tiles)
        .map(HotTile::from_item)
        .unwrap_or_else(|| fallback_tile(Category::LimitedMerch, generated_at));
    let hot_tiles = HotTiles {
        event_alert,
        limited_merch,
        crowds: build_crowd_tile(crowds, crowd_generated_at),
    };

    let stories_pool = ctx.sanitize(&home.top_stories);
    let top_stories = ctx.select_render(
        &stories_pool,
        prev_home.map_or(no_items, |h| h.top_stories.as_slice()),
        TOP_STORIES_CAP,
    );

    let resort_pool = ctx.sanitize(&home.resorts_blurb);
    let resort_spotlight = ctx.select_render(
        &resort_pool,
        prev_home.map_or(no_items, |h| h.resort_spotlight.as_slice()),
        RESORT_SPOTLIGHT_CAP,
    );

    let park_snapshots = Park::ALL.map(|park| {
        let prev_crowd = prev_home.and_then(|h| h.snapshot(park)).map(|s| &s.crowd);
        let crowd = coerce_crowd(park, crowds.parks.get(park), prev_crowd, crowd_generated_at);

        let summary = home
            .parks_summary
            .iter()
            .find(|s| s.park == ParkCode::from(park))
            .map(|s| s.headline.as_str())
            .filter(|h| !h.is_empty());
        let first_headline = newsletter
            .parks
            .get(park)
            .map(|src| ctx.sanitize(&src.headlines))
            .and_then(|v| v.into_iter().next())
            .map(|it| it.short)
            .filter(|s| !s.is_empty());
        let headline = summary
            .map(str::to_string)
            .or(first_headline)
            .unwrap_or_else(|| NO_MAJOR_UPDATES.to_string());

        ParkSnapshot {
            park,
            name: park.display_name().to_string(),
            color: park.color(),
            crowd,
            headline,
        }
    });

    HomeSection {
        must_see,
        hot_tiles,
        top_stories,
        park_snapshots,
        resort_spotlight,
    }
}

fn build_park(
    ctx: &Ctx<'_>,
    park: Park,
    source: &ParkFeed,
    crowds: &CrowdsFeed,
    previous: Option<&ParkSection>,
    crowd_generated_at: &str,
) -> ParkSection {
    let no_items: &[RenderItem] = &[];

    let must_pool = must_see_candidates(ctx, &source.must_see);
    let must_see = ctx.select_render(
        &must_pool,
        previous.map_or(no_items, |p| p.must_see.as_slice()),
        PARK_MUST_SEE_CAP,
    );

    let pool = ctx.sanitize(
        &[
            source.hot.as_slice(),
            source.headlines.as_slice(),
            source.must_see.as_slice(),
        ]
        .concat(),
    );
    let prev_hot = previous.map_or(no_items, |p| p.hot.as_slice());
    let mut hot: Vec<RenderItem> = [
        Category::EventAlert,
        Category::LimitedMerch,
        Category::Crowds,
    ]
    .into_iter()
    .filter_map(|cat| ctx.pick_category(&pool, cat, prev_hot))
    .map(RenderItem::from)
    .collect();
    hot.truncate(PARK_HOT_CAP);

    let headlines_pool = ctx.sanitize(&source.headlines);
    let headlines = ctx.select_render(
        &headlines_pool,
        previous.map_or(no_items, |p| p.headlines.as_slice()),
        HEADLINES_CAP,
    );

    let resort_pool = ctx.sanitize(&source.resort_blurbs);
    let resort_tie_ins = ctx.select_render(
        &resort_pool,
        previous.map_or(no_items, |p| p.resort_tie_ins.as_slice()),
        RESORT_TIE_INS_CAP,
    );

    let crowd = coerce_crowd(
        park,
        crowds.parks.get(park),
        previous.map(|p| &p.crowd),
        crowd_generated_at,
    );

    let today_vibe = match source.today_vibe.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => format!(
            "{} feels {} today.",
            park.display_name(),
            crowd.label.to_lowercase()
        ),
    };

    ParkSection {
        park,
        crowd,
        today_vibe,
        must_see,
        hot,
        headlines,
        resort_tie_ins,
    }
}

/// Build the next render model.
///
/// Same inputs (including `previous` and `now`) always yield an equal model.
/// Malformed items degrade to defaults; top-level shape checks belong to the
/// caller (see [`crate::feed::parse_newsletter`]).
pub fn build_render_model(
    newsletter: &NewsletterFeed,
    crowds: &CrowdsFeed,
    previous: Option<&RenderModel>,
    now: DateTime<Utc>,
    rank: &Ranking,
) -> RenderModel {
    let ctx = Ctx { now, rank };
    let now_iso = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let generated_at = or_fallback(&newsletter.generated_at, &now_iso);
    let crowd_generated_at = or_fallback(&crowds.generated_at, &now_iso);

    let home = build_home(
        &ctx,
        newsletter,
        crowds,
        previous,
        &generated_at,
        &crowd_generated_at,
    );

    let empty = ParkFeed::default();
    let [mk, epcot, dhs, ak] = Park::ALL.map(|park| {
        build_park(
            &ctx,
            park,
            newsletter.parks.get(park).unwrap_or(&empty),
            crowds,
            previous.map(|p| p.parks.get(park)),
            &crowd_generated_at,
        )
    });

    tracing::debug!(
        target: "dashboard",
        cold_start = previous.is_none(),
        must_see = home.must_see.len(),
        top_stories = home.top_stories.len(),
        resort_spotlight = home.resort_spotlight.len(),
        "render model built"
    );

    RenderModel {
        generated_at,
        crowd_generated_at,
        home,
        parks: ParkSections { mk, epcot, dhs, ak },
    }
}
