mod common;

use common::{OMNI_FIXTURE, PORTAL_FIXTURE, fixture_run, fixture_selection, load_fixture};
use price_parity::{
    Cell, CompareError, ComparisonPair, PricePolicy, Selection, Side, SourceTable, Status,
    StatusFilter, compare_tables, join::JoinMode,
};
use price_parity::status::{classify, evaluate};
use proptest::prelude::*;

fn statuses(result: &price_parity::RunResult, label: &str) -> Vec<Status> {
    result
        .pair(label)
        .expect("pair")
        .outcomes
        .iter()
        .map(|o| o.status)
        .collect()
}

#[test]
fn shopee_pair_covers_every_basic_scenario() {
    let result = fixture_run();
    assert_eq!(
        statuses(&result, "Shopee"),
        vec![
            Status::Equal,
            Status::UnequalPortalHigher { difference: 50000.0 },
            Status::EmptyPortal,
            Status::Unmatched,
            Status::Equal,
        ]
    );
    let summary = &result.pair("Shopee").unwrap().summary;
    assert_eq!(summary.total, 5);
    assert_eq!(summary.valid, 3);
    assert_eq!(summary.equal, 2);
    assert_eq!(summary.unequal, 1);
    assert_eq!(summary.empty, 1);
    assert_eq!(summary.unmatched, 1);
    assert!((summary.pct_equal - 66.666_666).abs() < 1e-3);
}

#[test]
fn other_pairs_are_classified_independently() {
    let result = fixture_run();
    assert_eq!(
        statuses(&result, "Tokopedia"),
        vec![
            Status::UnequalOmniHigher { difference: 5000.0 },
            Status::Equal,
            Status::Equal,
            Status::Unmatched,
            Status::EmptyPortal,
        ]
    );
    assert_eq!(
        statuses(&result, "Web")[1..3],
        [Status::UnequalOmniHigher { difference: 10000.0 }, Status::EmptyBoth]
    );
}

#[test]
fn left_join_keeps_portal_row_count() {
    let result = fixture_run();
    assert_eq!(result.joined().row_count(), load_fixture(PORTAL_FIXTURE).row_count());
    assert_eq!(result.joined().diagnostics().matched, 4);
}

#[test]
fn inner_join_drops_the_missing_sku() {
    let selection = Selection {
        mode: JoinMode::Inner,
        ..fixture_selection()
    };
    let result = compare_tables(
        &load_fixture(PORTAL_FIXTURE),
        &load_fixture(OMNI_FIXTURE),
        &selection,
        &PricePolicy::default(),
    )
    .expect("run");
    assert_eq!(result.joined().row_count(), 4);
    assert!(result.pairs().iter().all(|p| p.summary.unmatched == 0));
}

#[test]
fn filters_select_rows_by_status() {
    let result = fixture_run();
    assert_eq!(result.filter("Shopee", StatusFilter::PortalHigher).unwrap(), vec![1]);
    assert_eq!(result.filter("Tokopedia", StatusFilter::Unequal).unwrap(), vec![0]);
    assert_eq!(result.filter("Web", StatusFilter::Empty).unwrap(), vec![2]);
    assert_eq!(result.filter("Web", StatusFilter::Unmatched).unwrap(), vec![3]);
}

#[test]
fn flattened_records_keep_raw_and_derived_values() {
    let result = fixture_run();
    let headers = result.headers();
    let records = result.records();
    let raw = headers.iter().position(|h| h == "Harga Shopee").expect("raw column");
    let status = headers
        .iter()
        .position(|h| h == "[Shopee] Status")
        .expect("status column");
    assert_eq!(records[0][raw], "Rp 100,000");
    assert_eq!(records[0][status], "Equal");
    assert_eq!(records[3][status], "Not Found on Omni");
    assert_eq!(headers.iter().filter(|h| h.starts_with("SKU")).count(), 2);
    assert!(headers.contains(&"SKU_Portal".to_string()));
    assert!(headers.contains(&"SKU_Omni".to_string()));
}

#[test]
fn zero_prices_can_count_as_listed() {
    let policy = PricePolicy {
        zero_is_empty: false,
        ..PricePolicy::default()
    };
    let result = compare_tables(
        &load_fixture(PORTAL_FIXTURE),
        &load_fixture(OMNI_FIXTURE),
        &fixture_selection(),
        &policy,
    )
    .expect("run");
    assert_eq!(
        statuses(&result, "Shopee")[2],
        Status::UnequalOmniHigher { difference: 80000.0 }
    );
    assert_eq!(statuses(&result, "Web")[2], Status::EmptyPortal);
}

#[test]
fn missing_pair_column_is_skipped_not_fatal() {
    let mut selection = fixture_selection();
    selection
        .pairs
        .push(ComparisonPair::new("Lazada", "Harga Lazada", "Lazada"));
    let result = compare_tables(
        &load_fixture(PORTAL_FIXTURE),
        &load_fixture(OMNI_FIXTURE),
        &selection,
        &PricePolicy::default(),
    )
    .expect("run");
    assert_eq!(result.pairs().len(), 3);
    assert!(result.warnings().iter().any(|w| w.contains("Lazada")));
}

#[test]
fn missing_identifier_stops_the_run() {
    let selection = Selection {
        portal_id: None,
        ..fixture_selection()
    };
    let err = compare_tables(
        &load_fixture(PORTAL_FIXTURE),
        &load_fixture(OMNI_FIXTURE),
        &selection,
        &PricePolicy::default(),
    )
    .unwrap_err();
    assert_eq!(err, CompareError::MissingIdentifier(Side::Portal));
    assert_eq!(err.to_string(), "No identifier column selected for the Portal table");
}

fn table(name: &str, rows: &[(u8, Option<u32>)]) -> SourceTable {
    let cells = rows
        .iter()
        .map(|(id, price)| {
            vec![
                Cell::Text(format!("P{id}")),
                price.map_or(Cell::Empty, |p| Cell::Text(p.to_string())),
            ]
        })
        .collect();
    SourceTable::new(name, vec!["id".into(), "price".into()], cells)
}

fn pair_selection(mode: JoinMode) -> Selection {
    Selection {
        portal_id: Some("id".into()),
        omni_id: Some("id".into()),
        pairs: vec![ComparisonPair::new("P", "price", "price")],
        mode,
        ..Selection::default()
    }
}

fn rows_strategy() -> impl Strategy<Value = Vec<(u8, Option<u32>)>> {
    prop::collection::vec((0u8..12, prop::option::of(0u32..5)), 1..40)
}

fn unique_rows_strategy() -> impl Strategy<Value = Vec<(u8, Option<u32>)>> {
    prop::collection::btree_map(0u8..12, prop::option::of(0u32..5), 1..12)
        .prop_map(|rows| rows.into_iter().collect())
}

fn raw_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        Just(Cell::Empty),
        "[0-9Rp ,.-]{0,10}".prop_map(Cell::Text),
        any::<f64>().prop_map(Cell::Number),
    ]
}

proptest! {
    #[test]
    fn statuses_partition_the_joined_rows(portal in rows_strategy(), omni in rows_strategy()) {
        let portal = table("portal", &portal);
        let omni = table("omni", &omni);
        let result = compare_tables(&portal, &omni, &pair_selection(JoinMode::Left), &PricePolicy::default())
            .expect("left run");
        prop_assert_eq!(result.joined().row_count(), portal.row_count());
        let pair = &result.pairs()[0];
        prop_assert_eq!(pair.outcomes.len(), portal.row_count());
        let s = &pair.summary;
        prop_assert_eq!(s.equal + s.unequal + s.empty + s.unmatched, s.total);
        prop_assert_eq!(s.total, portal.row_count());
        if s.valid > 0 {
            prop_assert!((s.pct_equal + s.pct_unequal - 100.0).abs() < 1e-9);
        } else {
            prop_assert_eq!(s.pct_equal, 0.0);
            prop_assert_eq!(s.pct_unequal, 0.0);
        }
    }

    #[test]
    fn inner_join_never_grows_the_portal_table(portal in rows_strategy(), omni in rows_strategy()) {
        let portal = table("portal", &portal);
        let omni = table("omni", &omni);
        match compare_tables(&portal, &omni, &pair_selection(JoinMode::Inner), &PricePolicy::default()) {
            Ok(result) => {
                prop_assert!(result.joined().row_count() <= portal.row_count());
                prop_assert!(result.joined().row_count() > 0);
                prop_assert_eq!(result.pairs()[0].summary.unmatched, 0);
            }
            Err(err) => prop_assert_eq!(err, CompareError::EmptyJoin),
        }
    }

    #[test]
    fn inner_join_is_bounded_by_both_tables_for_unique_portal_ids(
        portal in unique_rows_strategy(),
        omni in rows_strategy(),
    ) {
        let portal = table("portal", &portal);
        let omni = table("omni", &omni);
        if let Ok(result) = compare_tables(&portal, &omni, &pair_selection(JoinMode::Inner), &PricePolicy::default()) {
            prop_assert!(result.joined().row_count() <= portal.row_count().min(omni.row_count()));
        }
    }

    #[test]
    fn classification_is_repeatable(
        portal in raw_cell(),
        omni in raw_cell(),
        matched in any::<bool>(),
        zero_is_empty in any::<bool>(),
    ) {
        let policy = PricePolicy {
            zero_is_empty,
            ..PricePolicy::default()
        };
        let first = evaluate(&portal, &omni, matched, &policy);
        let second = evaluate(&portal, &omni, matched, &policy);
        prop_assert_eq!(first, second);
        prop_assert_eq!(classify(&portal, &omni, matched, &policy), first.status);
    }
}
