// Property-based tests for normalization, arbitration and matching.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rentradar_dedupe::normalize::normalize_street;
use rentradar_dedupe::{choose_preferred, DedupeEngine, ListingCandidate, Source, TrustRanking};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const POSTCODES: &[&str] = &["LN1 2AB", "CH41 4AB", "M1 1AE", "SW1A 1AA", "B33 8TH"];
const STREETS: &[&str] = &["Oak Road", "Mill Lane", "Elm Close", "High Street", "Station Avenue"];

fn arb_source() -> impl Strategy<Value = Source> {
    prop::sample::select(Source::ALL.to_vec())
}

/// Address-like text: words, numbers, punctuation and listing boilerplate.
fn arb_address_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            3 => r"[A-Za-z]{1,10}",
            2 => r"[0-9]{1,3}[a-c]?",
            1 => prop::sample::select(vec!["To Let", "to-rent", "Road", "terr.", "Available now", ",", "-"])
                .prop_map(str::to_string),
        ],
        0..8,
    )
    .prop_map(|words| words.join(" "))
}

fn arb_candidate() -> impl Strategy<Value = ListingCandidate> {
    (
        arb_source(),
        "[a-z0-9]{1,6}",
        prop::option::of(400u32..4000),
        prop::option::of(0u32..6),
        prop::sample::select(STREETS.to_vec()),
    )
        .prop_map(|(source, id, rent, beds, street)| ListingCandidate {
            source,
            area: "Lincoln".into(),
            address: format!("3 {street}, LN1 2AB"),
            rent_per_month: rent,
            bedrooms: beds,
            bathrooms: None,
            url: format!("https://listings.test/{id}"),
            source_listing_id: id,
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn normalize_street_is_idempotent(text in arb_address_text()) {
        let once = normalize_street(&text);
        prop_assert_eq!(normalize_street(&once), once);
    }

    #[test]
    fn choose_preferred_is_symmetric(a in arb_candidate(), b in arb_candidate()) {
        prop_assert_eq!(choose_preferred(&a, &b), choose_preferred(&b, &a));
    }

    #[test]
    fn representative_trust_never_decreases(
        stream in prop::collection::vec((arb_source(), "[a-z0-9]{1,6}"), 1..12),
    ) {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let trust = TrustRanking::default();
        let mut engine = DedupeEngine::default();
        let mut best_rank = 0;

        for (source, id) in stream {
            let candidate = ListingCandidate {
                source,
                area: "Wirral".into(),
                address: "4 Mill Lane, Birkenhead, CH41 4AB".into(),
                rent_per_month: Some(900),
                bedrooms: Some(2),
                bathrooms: Some(1),
                url: format!("https://listings.test/{source}/{id}"),
                source_listing_id: id,
            };
            let resolution = engine.resolve_at(&candidate, now);
            let rank = trust.rank(resolution.representative.source);
            prop_assert!(rank >= best_rank);
            best_rank = rank;
            prop_assert_eq!(engine.registry().len(), 1);
        }
    }

    #[test]
    fn shared_postcode_and_street_within_tolerance_is_duplicate(
        postcode in prop::sample::select(POSTCODES.to_vec()),
        street in prop::sample::select(STREETS.to_vec()),
        numbers in (1u32..300, 1u32..300),
        sources in prop::sample::subsequence(Source::ALL.to_vec(), 2),
        rent in 400u32..4000,
        bump in 0u32..=7,
        beds in 0u32..6,
    ) {
        let now = Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap();
        let make = |source: Source, number: u32, rent: u32| ListingCandidate {
            source,
            area: "Anywhere".into(),
            address: format!("{number} {street}, {postcode}"),
            rent_per_month: Some(rent),
            bedrooms: Some(beds),
            bathrooms: None,
            url: format!("https://listings.test/{source}/{number}"),
            source_listing_id: format!("{source}-{number}"),
        };
        let first = make(sources[0], numbers.0, rent);
        let second = make(sources[1], numbers.1, rent + rent * bump / 100);

        let mut engine = DedupeEngine::default();
        prop_assert!(engine.resolve_at(&first, now).forward);
        let r = engine.resolve_at(&second, now);
        prop_assert!(r.decision.is_duplicate(), "{:?}", r.decision);
        prop_assert_eq!(r.canonical_key.postcode, postcode.replace(' ', ""));
    }
}
