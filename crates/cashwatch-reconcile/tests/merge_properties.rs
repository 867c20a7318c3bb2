// Reconciliation properties: idempotence, noise exclusion, timestamp
// immutability, dedup count, no loss. Plus the worked scenarios.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, HashSet};

use cashwatch_reconcile::*;
use proptest::prelude::*;

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

fn t1_clock() -> FixedClock {
    FixedClock::at_cet(2025, 1, 1, 8, 0, 0)
}

fn t2_clock() -> FixedClock {
    FixedClock::at_cet(2025, 1, 1, 8, 15, 0)
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small alphabets so batches collide with each other and with the store.
fn arb_cashtag() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None),
        1 => Just(Some(UNKNOWN_CASHTAG.to_string())),
        3 => r"\$[A-C]{1,2}".prop_map(Some),
    ]
}

fn arb_address() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        1 => Just(None),
        3 => r"0x[a-c]{1,2}".prop_map(Some),
    ]
}

fn arb_candidate() -> impl Strategy<Value = Candidate> {
    (arb_cashtag(), arb_address()).prop_map(|(cashtag, contract_address)| Candidate {
        cashtag,
        contract_address,
    })
}

fn arb_batch() -> impl Strategy<Value = Vec<Candidate>> {
    prop::collection::vec(arb_candidate(), 0..12)
}

/// A well-formed store: built by merging a filtered batch into nothing.
fn arb_store() -> impl Strategy<Value = Vec<Record>> {
    arb_batch().prop_map(|batch| {
        let clock = FixedClock::at_cet(2024, 12, 31, 23, 59, 59);
        merge(Vec::new(), &filter_invalid(batch), &clock)
    })
}

fn by_key(records: &[Record]) -> BTreeMap<IdentityKey, String> {
    records
        .iter()
        .map(|r| (r.key(), r.timestamp.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn merging_empty_batch_is_identity(store in arb_store()) {
        let out = merge(store.clone(), &[], &t1_clock());
        prop_assert_eq!(out, store);
    }

    #[test]
    fn filter_removes_exactly_the_noise(batch in arb_batch()) {
        let kept = filter_invalid(batch.clone());
        let expected: Vec<Candidate> = batch.into_iter().filter(|c| !c.is_noise()).collect();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn timestamps_never_change(
        store in arb_store(),
        b1 in arb_batch(),
        b2 in arb_batch(),
    ) {
        let after_b1 = merge(store, &filter_invalid(b1), &t1_clock());
        let after_b2 = merge(after_b1.clone(), &filter_invalid(b2), &t2_clock());

        let before = by_key(&after_b1);
        let after = by_key(&after_b2);
        for (key, ts) in &before {
            prop_assert_eq!(after.get(key), Some(ts));
        }
    }

    #[test]
    fn one_entry_per_distinct_key(store in arb_store(), batch in arb_batch()) {
        let filtered = filter_invalid(batch);
        let mut keys: HashSet<IdentityKey> = store.iter().map(Record::key).collect();
        keys.extend(filtered.iter().map(Candidate::key));

        let out = merge(store, &filtered, &t1_clock());
        prop_assert_eq!(out.len(), keys.len());

        let out_keys: HashSet<IdentityKey> = out.iter().map(Record::key).collect();
        prop_assert_eq!(out_keys, keys);
    }

    #[test]
    fn no_stored_key_is_lost(store in arb_store(), batch in arb_batch()) {
        let out = merge(store.clone(), &filter_invalid(batch), &t1_clock());
        let out_keys: HashSet<IdentityKey> = out.iter().map(Record::key).collect();
        for record in &store {
            prop_assert!(out_keys.contains(&record.key()));
        }
    }

    #[test]
    fn output_never_contains_noise(store in arb_store(), batch in arb_batch()) {
        // Unfiltered input: the engine still keeps noise out.
        let out = merge(store, &batch, &t1_clock());
        prop_assert!(out.iter().all(|r| !r.is_noise()));
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

fn record(cashtag: &str, ca: &str, ts: &str) -> Record {
    Record {
        cashtag: Some(cashtag.to_string()),
        contract_address: Some(ca.to_string()),
        timestamp: ts.to_string(),
    }
}

#[test]
fn scenario_first_observation() {
    let batch = filter_invalid(vec![Candidate::new(Some("$FOO"), Some("0xAAA"))]);
    let out = merge(Vec::new(), &batch, &t1_clock());
    assert_eq!(out, vec![record("$FOO", "0xAAA", "01/01/2025, 08:00:00")]);
}

#[test]
fn scenario_reobservation_keeps_timestamp() {
    let store = vec![record("$FOO", "0xAAA", "T1")];
    let batch = filter_invalid(vec![Candidate::new(Some("$FOO"), Some("0xAAA"))]);
    let out = merge(store.clone(), &batch, &t2_clock());
    assert_eq!(out, store);
}

#[test]
fn scenario_noise_only_batch() {
    let batch = filter_invalid(vec![Candidate::new(None, None)]);
    let out = merge(Vec::new(), &batch, &t1_clock());
    assert!(out.is_empty());
}

#[test]
fn scenario_intra_batch_duplicates() {
    let batch = filter_invalid(vec![
        Candidate::new(Some("$FOO"), Some("0xAAA")),
        Candidate::new(Some("$FOO"), Some("0xAAA")),
    ]);
    let out = merge(Vec::new(), &batch, &t1_clock());
    assert_eq!(out.len(), 1);
}

#[test]
fn scenario_cashtag_participates_in_identity() {
    let store = vec![record(UNKNOWN_CASHTAG, "0xBBB", "T1")];
    let batch = filter_invalid(vec![Candidate::new(Some("$BAR"), Some("0xBBB"))]);
    let out = merge(store, &batch, &t2_clock());

    assert_eq!(out.len(), 2);
    assert_eq!(out[0], record(UNKNOWN_CASHTAG, "0xBBB", "T1"));
    assert_eq!(out[1].cashtag.as_deref(), Some("$BAR"));
    assert_eq!(out[1].timestamp, "01/01/2025, 08:15:00");
}
