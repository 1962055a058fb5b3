// tests/render_model.rs
//
// End-to-end properties of the render-model builder against the JSON
// fixtures in tests/fixtures (feed generated 08:00Z, built at 09:00Z).

use chrono::{DateTime, TimeZone, Utc};
use park_dashboard::feed::{
    parse_crowds, parse_newsletter, Category, Confidence, CrowdsFeed, DataQuality, FeedItem,
    NewsletterFeed, Park, ParkCode, Urgency,
};
use park_dashboard::model::RenderItem;
use park_dashboard::{build_render_model, Ranking, RenderModel};

const NEWSLETTER: &str = include_str!("fixtures/newsletter-latest.json");
const CROWDS: &str = include_str!("fixtures/crowds-latest.json");

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap()
}

fn newsletter() -> NewsletterFeed {
    parse_newsletter(NEWSLETTER).expect("newsletter fixture parses")
}

fn crowds() -> CrowdsFeed {
    parse_crowds(CROWDS).expect("crowds fixture parses")
}

fn build(n: &NewsletterFeed, c: &CrowdsFeed, prev: Option<&RenderModel>) -> RenderModel {
    build_render_model(n, c, prev, now(), &Ranking::default())
}

fn ids(v: &[RenderItem]) -> Vec<&str> {
    v.iter().map(|x| x.id.as_str()).collect()
}

#[test]
fn enforces_list_limits() {
    let m = build(&newsletter(), &crowds(), None);
    assert!(m.home.must_see.len() <= 1);
    assert_eq!(m.home.hot_tiles.as_array().len(), 3);
    assert_eq!(m.home.top_stories.len(), 5);
    assert_eq!(m.home.resort_spotlight.len(), 2);
    assert_eq!(m.home.park_snapshots.len(), 4);
    for p in m.parks.iter() {
        assert!(p.headlines.len() <= 6, "{:?}", p.park);
        assert!(p.resort_tie_ins.len() <= 3, "{:?}", p.park);
        assert!(p.must_see.len() <= 1, "{:?}", p.park);
        assert!(p.hot.len() <= 3, "{:?}", p.park);
    }
    assert_eq!(m.parks.mk.headlines.len(), 6);
    assert_eq!(m.parks.mk.resort_tie_ins.len(), 3);

    let v = serde_json::to_value(&m).unwrap();
    assert_eq!(v["home"]["hotTiles"].as_array().unwrap().len(), 3);
    assert_eq!(v["home"]["parkSnapshots"].as_array().unwrap().len(), 4);
}

#[test]
fn cold_start_ranks_by_score() {
    let m = build(&newsletter(), &crowds(), None);
    assert_eq!(
        ids(&m.home.top_stories),
        vec!["story-4", "story-2", "story-6", "story-1", "story-7"]
    );
    assert_eq!(ids(&m.home.resort_spotlight), vec!["resort-2", "resort-3"]);
    assert_eq!(
        ids(&m.parks.mk.headlines),
        vec!["mk-head-7", "mk-head-5", "mk-head-3", "mk-head-1", "mk-head-6", "mk-head-4"]
    );
}

#[test]
fn sticky_ordering_survives_reordered_pool() {
    let first = build(&newsletter(), &crowds(), None);
    let mut modified = newsletter();
    modified.home.top_stories.reverse();
    if let Some(mk) = modified.parks.mk.as_mut() {
        mk.headlines.reverse();
    }
    let second = build(&modified, &crowds(), Some(&first));
    assert_eq!(ids(&second.home.top_stories), ids(&first.home.top_stories));
    assert_eq!(ids(&second.parks.mk.headlines), ids(&first.parks.mk.headlines));
}

#[test]
fn must_see_prefers_must_see_today() {
    let m = build(&newsletter(), &crowds(), None);
    assert_eq!(ids(&m.home.must_see), vec!["home-must-1"]);
    assert_eq!(ids(&m.parks.mk.must_see), vec!["mk-must-1"]);
    // EPCOT only has a normal-urgency item in its must-see pool
    assert!(m.parks.epcot.must_see.is_empty());
}

#[test]
fn crowds_tile_reflects_rising_crowds() {
    let m = build(&newsletter(), &crowds(), None);
    let tile = &m.home.hot_tiles.crowds;
    assert_eq!(tile.category, Category::Crowds);
    assert_eq!(tile.long, "Crowds rising at Hollywood Studios");
    assert_eq!(tile.short, "Very Busy (8.6/10)");

    let mut calm = crowds();
    if let Some(dhs) = calm.parks.dhs.as_mut() {
        dhs.score = Some(6.0);
    }
    let m = build(&newsletter(), &calm, None);
    assert_eq!(m.home.hot_tiles.crowds.long, "Crowds steady");
}

#[test]
fn hot_tiles_are_fixed_categories() {
    let m = build(&newsletter(), &crowds(), None);
    let t = &m.home.hot_tiles;
    assert_eq!(t.event_alert.id, "hot-home-must-1");
    assert_eq!(t.limited_merch.id, "hot-merch-pins");
    assert_eq!(t.limited_merch.title, "Limited Merch");

    let mut bare = newsletter();
    bare.home.hot_tiles = None;
    bare.home.top_stories.retain(|i| i.category != Category::LimitedMerch);
    let m = build(&bare, &crowds(), None);
    assert_eq!(m.home.hot_tiles.limited_merch.id, "hot-merch-fallback");
    assert_eq!(m.home.hot_tiles.limited_merch.short, "No merch alerts");
    assert_eq!(m.home.hot_tiles.limited_merch.updated_at, "2025-09-06T08:00:00Z");
}

#[test]
fn expired_and_low_confidence_items_never_surface() {
    let m = build(&newsletter(), &crowds(), None);
    let json = serde_json::to_string(&m).unwrap();
    for banned in ["story-expired", "story-low", "epcot-head-low"] {
        assert!(!json.contains(banned), "{banned} leaked into output");
    }

    // Even as the only must-see candidate
    let mut n = newsletter();
    n.home.must_see = n
        .home
        .top_stories
        .iter()
        .filter(|i| i.id == "story-expired" || i.id == "story-low")
        .cloned()
        .collect();
    let m = build(&n, &crowds(), None);
    assert!(m.home.must_see.is_empty());
}

#[test]
fn crowd_fallback_carries_previous_reading() {
    let first = build(&newsletter(), &crowds(), None);
    assert_eq!(first.parks.epcot.crowd.note, None);

    let mut degraded = crowds();
    if let Some(epcot) = degraded.parks.epcot.as_mut() {
        epcot.data_quality = Some(DataQuality::Bad);
        epcot.score = Some(9.5);
        epcot.label = Some("Packed".into());
    }
    degraded.parks.ak = None;

    let second = build(&newsletter(), &degraded, Some(&first));
    for park in [Park::Epcot, Park::Ak] {
        let prev = &first.parks.get(park).crowd;
        let now = &second.parks.get(park).crowd;
        assert_eq!(now.score, prev.score, "{park:?}");
        assert_eq!(now.label, prev.label, "{park:?}");
        assert_eq!(now.avg_wait_min, prev.avg_wait_min, "{park:?}");
        assert_eq!(now.note.as_deref(), Some("Data limited"), "{park:?}");
        assert_eq!(now.data_quality, DataQuality::Limited, "{park:?}");

        let snap = second.home.snapshot(park).unwrap();
        assert_eq!(snap.crowd.score, prev.score, "{park:?}");
    }
    // Untouched parks are rebuilt from the fresh reading
    assert_eq!(second.parks.dhs.crowd.note, None);
    assert_eq!(second.parks.dhs.crowd.score, 8.6);
}

#[test]
fn identical_inputs_give_byte_identical_output() {
    let first = build(&newsletter(), &crowds(), None);
    let a = build(&newsletter(), &crowds(), Some(&first));
    let b = build(&newsletter(), &crowds(), Some(&first));
    assert_eq!(
        serde_json::to_vec(&a).unwrap(),
        serde_json::to_vec(&b).unwrap()
    );
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn previous_model_survives_json_round_trip() {
    let first = build(&newsletter(), &crowds(), None);
    let stored = serde_json::to_string(&first).unwrap();
    let restored: RenderModel = serde_json::from_str(&stored).unwrap();
    assert_eq!(restored, first);
}

fn scored_item(id: &str, category: Category, age_h: i64) -> FeedItem {
    FeedItem {
        id: id.into(),
        category,
        urgency: Urgency::Normal,
        park: ParkCode::Home,
        short: id.into(),
        long: id.into(),
        updated_at: (now() - chrono::Duration::hours(age_h)).to_rfc3339(),
        confidence: Some(Confidence::High),
        expires_at: None,
    }
}

#[test]
fn marginal_newcomer_does_not_take_the_lead() {
    // A ≈ 5, B ≈ 7, C ≈ 7.5
    let a = FeedItem {
        confidence: None,
        ..scored_item("A", Category::LimitedMerch, 24)
    };
    let b = scored_item("B", Category::EventAlert, 24);
    let c = scored_item("C", Category::EventAlert, 9);

    let mut n = NewsletterFeed::default();
    n.home.top_stories = vec![a.clone(), b.clone()];
    let first = build(&n, &CrowdsFeed::default(), None);
    assert_eq!(ids(&first.home.top_stories), vec!["B", "A"]);

    n.home.top_stories = vec![a, b, c];
    let second = build(&n, &CrowdsFeed::default(), Some(&first));
    assert_eq!(ids(&second.home.top_stories), vec!["B", "A", "C"]);
}

#[test]
fn meaningful_newcomer_is_inserted_in_front() {
    let mut n = NewsletterFeed::default();
    n.home.top_stories = vec![
        scored_item("old-food", Category::Food, 24),
        scored_item("old-other", Category::Other, 24),
    ];
    let first = build(&n, &CrowdsFeed::default(), None);
    assert_eq!(ids(&first.home.top_stories), vec!["old-food", "old-other"]);

    n.home.top_stories.push(scored_item("breaking", Category::EventAlert, 0));
    let second = build(&n, &CrowdsFeed::default(), Some(&first));
    assert_eq!(
        ids(&second.home.top_stories),
        vec!["breaking", "old-food", "old-other"]
    );
}

#[test]
fn park_sections_fill_from_their_own_pools() {
    let m = build(&newsletter(), &crowds(), None);
    assert_eq!(
        ids(&m.parks.mk.hot),
        vec!["mk-must-1", "mk-hot-merch", "mk-hot-crowds"]
    );
    assert_eq!(ids(&m.parks.epcot.hot), vec!["epcot-hot-event"]);
    assert_eq!(ids(&m.parks.dhs.hot), vec!["dhs-hot-crowds"]);
    assert!(m.parks.ak.hot.is_empty());

    assert_eq!(
        m.parks.mk.today_vibe,
        "Magic Kingdom is buzzing ahead of tonight's show."
    );
    assert_eq!(m.parks.epcot.today_vibe, "EPCOT feels moderate today.");
    assert_eq!(m.parks.ak.today_vibe, "Animal Kingdom feels light today.");
    assert_eq!(m.parks.ak.crowd.note.as_deref(), Some("Data limited"));

    let heads: Vec<&str> = m
        .home
        .park_snapshots
        .iter()
        .map(|s| s.headline.as_str())
        .collect();
    assert_eq!(
        heads,
        vec![
            "Fireworks shifted later tonight",
            "Food & Wine booth map released",
            "Fantasmic! adds a second show",
            "No major updates",
        ]
    );
    assert_eq!(m.generated_at, "2025-09-06T08:00:00Z");
    assert_eq!(m.crowd_generated_at, "2025-09-06T08:05:00Z");
}
