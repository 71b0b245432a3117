mod common;
use crate::common::{date, obs};
use currency_pages::exceptions::{PagesError, ValidationError};
use currency_pages::historystore::HistoricalStore;
use currency_pages::models::UpsertOutcome;
use proptest::prelude::*;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn seeded(root: &std::path::Path, dates: &[&str]) -> HistoricalStore {
    let store = HistoricalStore::open(root.to_path_buf()).unwrap();
    for (i, d) in dates.iter().enumerate() {
        store
            .upsert(obs(d, &[("USD", 1.0 + i as f64 / 100.0), ("GBP", 0.85)]))
            .unwrap();
    }
    store
}

#[test]
fn test_range_returns_inclusive_dates_ascending() {
    let temp = tempdir().unwrap();

    // GIVEN rates for 2020-01-01 through 2020-01-10, inserted out of order
    let store = seeded(
        temp.path(),
        &[
            "2020-01-10", "2020-01-05", "2020-01-01", "2020-01-08", "2020-01-03",
            "2020-01-02", "2020-01-09", "2020-01-04", "2020-01-07", "2020-01-06",
        ],
    );

    // WHEN querying 2020-01-03..=2020-01-05
    let found = store
        .range(date("2020-01-03"), date("2020-01-05"))
        .to_vec()
        .unwrap();

    // THEN exactly those three dates come back in ascending order
    let dates: Vec<String> = found.iter().map(|o| o.date.to_string()).collect();
    assert_eq!(dates, vec!["2020-01-03", "2020-01-04", "2020-01-05"]);
}

#[test]
fn test_range_is_restartable_and_spans_years() {
    let temp = tempdir().unwrap();
    let store = seeded(
        temp.path(),
        &["2019-12-30", "2019-12-31", "2020-01-02", "2021-01-04"],
    );

    // GIVEN a range that crosses two partition boundaries
    let query = store.range(date("2019-12-31"), date("2021-01-04"));

    // WHEN it is iterated twice
    let first: Vec<_> = query.iter().map(|r| r.unwrap().date).collect();
    let second: Vec<_> = query.into_iter().map(|r| r.unwrap().date).collect();

    // THEN both passes see the same ascending sequence
    assert_eq!(
        first,
        vec![date("2019-12-31"), date("2020-01-02"), date("2021-01-04")]
    );
    assert_eq!(first, second);
}

#[test]
fn test_range_with_start_after_end_is_empty() {
    let temp = tempdir().unwrap();
    let store = seeded(temp.path(), &["2020-01-01", "2020-01-02"]);

    let found = store
        .range(date("2020-01-02"), date("2020-01-01"))
        .to_vec()
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_upsert_replaces_whole_observation() {
    let temp = tempdir().unwrap();
    let store = HistoricalStore::open(temp.path().to_path_buf()).unwrap();

    // GIVEN a stored day with USD and GBP
    let outcome = store
        .upsert(obs("2025-09-29", &[("USD", 1.1234), ("GBP", 0.8567)]))
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted);

    // WHEN the same date is written again with a corrected set
    let outcome = store
        .upsert(obs("2025-09-29", &[("USD", 1.2)]))
        .unwrap();

    // THEN it replaces the day wholesale instead of merging currencies
    assert_eq!(outcome, UpsertOutcome::Replaced);
    let stored = store.get(date("2025-09-29")).unwrap().unwrap();
    assert_eq!(stored.rates.len(), 1);
    assert_eq!(stored.rates["USD"], 1.2);
    assert_eq!(store.total_records().unwrap(), 1);
}

#[test]
fn test_invalid_upsert_leaves_partition_bytes_unchanged() {
    let temp = tempdir().unwrap();
    let store = seeded(temp.path(), &["2025-09-26"]);
    let partition_file = temp.path().join("2025.json");
    let before = fs::read(&partition_file).unwrap();

    // WHEN inserting a day with a zero rate
    let err = store
        .upsert(obs("2025-09-29", &[("USD", 0.0), ("GBP", 0.85)]))
        .unwrap_err();

    // THEN it is rejected as a validation error and nothing is written
    assert!(matches!(
        err,
        PagesError::Validation(ValidationError::NonPositiveRate { ref currency, .. }) if currency == "USD"
    ));
    assert_eq!(fs::read(&partition_file).unwrap(), before);
    assert!(store.get(date("2025-09-29")).unwrap().is_none());
}

#[test]
fn test_upsert_many_is_all_or_nothing_on_validation() {
    let temp = tempdir().unwrap();
    let store = HistoricalStore::open(temp.path().to_path_buf()).unwrap();

    let batch = vec![
        obs("2024-01-02", &[("USD", 1.1)]),
        obs("2024-01-03", &[]),
    ];

    let err = store.upsert_many(batch).unwrap_err();
    assert!(matches!(
        err,
        PagesError::Validation(ValidationError::EmptyRates { .. })
    ));
    assert!(store.years().is_empty());
    assert!(!temp.path().join("2024.json").exists());
}

#[test]
fn test_store_reopens_with_one_file_per_year() {
    let temp = tempdir().unwrap();

    // GIVEN a store written across two years
    {
        let store = HistoricalStore::open(temp.path().to_path_buf()).unwrap();
        let count = store
            .upsert_many(vec![
                obs("2023-12-29", &[("USD", 1.10)]),
                obs("2024-01-02", &[("USD", 1.09), ("JPY", 160.1)]),
                obs("2024-01-03", &[("USD", 1.08)]),
            ])
            .unwrap();
        assert_eq!(count, 3);
    }

    // THEN each year has its own partition file
    assert!(temp.path().join("2023.json").is_file());
    assert!(temp.path().join("2024.json").is_file());

    // WHEN reopening from disk
    let store = HistoricalStore::open(temp.path().to_path_buf()).unwrap();

    // THEN the history is intact
    assert_eq!(store.years(), vec![2023, 2024]);
    assert_eq!(store.total_records().unwrap(), 3);
    assert_eq!(store.earliest().unwrap().unwrap().date, date("2023-12-29"));
    assert_eq!(store.latest().unwrap().unwrap().date, date("2024-01-03"));
    let jan2 = store.get(date("2024-01-02")).unwrap().unwrap();
    assert_eq!(jan2.rates["JPY"], 160.1);
    let jan3 = store.get(date("2024-01-03")).unwrap().unwrap();
    assert!(!jan3.rates.contains_key("JPY"));
    assert_eq!(
        store.currencies().unwrap().into_iter().collect::<Vec<_>>(),
        vec!["JPY", "USD"]
    );
}

#[test]
fn test_open_ignores_unrelated_files() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("notes.json"), "{}").unwrap();
    fs::write(temp.path().join(".update.lock"), "123").unwrap();
    fs::write(temp.path().join("2024.txt"), "").unwrap();

    let store = HistoricalStore::open(temp.path().to_path_buf()).unwrap();
    assert!(store.years().is_empty());
    assert!(store.is_empty().unwrap());
    assert!(store.latest().unwrap().is_none());
}

#[test]
fn test_corrupt_partition_surfaces_as_error() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("2022.json"), "not json").unwrap();

    // GIVEN an unreadable partition
    let store = HistoricalStore::open(temp.path().to_path_buf()).unwrap();

    // THEN queries touching it fail instead of returning a partial view
    assert!(store.get(date("2022-05-05")).is_err());
    let results: Vec<_> = store
        .range(date("2022-01-01"), date("2022-12-31"))
        .iter()
        .collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn test_append_year_partition_creates_empty_file_once() {
    let temp = tempdir().unwrap();
    let store = seeded(temp.path(), &["2025-12-31"]);

    // WHEN a new year starts
    let partition = store.append_year_partition(2026).unwrap();

    // THEN an empty partition exists and does not disturb the latest record
    assert!(partition.is_empty());
    assert!(temp.path().join("2026.json").is_file());
    assert_eq!(store.latest().unwrap().unwrap().date, date("2025-12-31"));

    // AND asking again returns the existing partition
    store.upsert(obs("2026-01-02", &[("USD", 1.0)])).unwrap();
    let again = store.append_year_partition(2026).unwrap();
    assert_eq!(again.len(), 1);
}

#[test]
fn test_readers_keep_their_snapshot_during_writes() {
    let temp = tempdir().unwrap();
    let store = Arc::new(seeded(temp.path(), &["2024-03-01"]));

    // GIVEN a reader holding the current partition
    let snapshot = store.partition(2024).unwrap().unwrap();

    // WHEN a writer adds a day
    store.upsert(obs("2024-03-04", &[("USD", 1.5)])).unwrap();

    // THEN the old snapshot is unchanged and new reads see the write
    assert_eq!(snapshot.len(), 1);
    assert_eq!(store.partition(2024).unwrap().unwrap().len(), 2);
}

#[test]
fn test_concurrent_readers_and_writer() {
    let temp = tempdir().unwrap();
    let store = Arc::new(seeded(temp.path(), &["2024-01-01"]));

    std::thread::scope(|s| {
        let writer = Arc::clone(&store);
        s.spawn(move || {
            for day in 2..=20 {
                let d = format!("2024-01-{:02}", day);
                writer.upsert(obs(&d, &[("USD", 1.0)])).unwrap();
            }
        });

        for _ in 0..4 {
            let reader = Arc::clone(&store);
            s.spawn(move || {
                for _ in 0..50 {
                    let seen = reader
                        .range(date("2024-01-01"), date("2024-01-31"))
                        .to_vec()
                        .unwrap();
                    // Every snapshot is sorted with unique dates.
                    assert!(seen.windows(2).all(|w| w[0].date < w[1].date));
                    assert!(!seen.is_empty());
                }
            });
        }
    });

    assert_eq!(store.total_records().unwrap(), 20);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_range_matches_filtered_history(
        offsets in proptest::collection::btree_set(0i64..900, 1..40),
        a in 0i64..900,
        b in 0i64..900,
    ) {
        let temp = tempdir().unwrap();
        let store = HistoricalStore::open(temp.path().to_path_buf()).unwrap();
        let origin = date("2019-11-01");

        let all: Vec<_> = offsets
            .iter()
            .map(|&o| origin + chrono::Duration::days(o))
            .collect();
        store
            .upsert_many(all.iter().map(|d| obs(&d.to_string(), &[("USD", 1.0)])))
            .unwrap();

        let (start, end) = (origin + chrono::Duration::days(a), origin + chrono::Duration::days(b));
        let got: Vec<_> = store
            .range(start, end)
            .iter()
            .map(|r| r.unwrap().date)
            .collect();
        let expected: Vec<_> = all
            .iter()
            .copied()
            .filter(|d| *d >= start && *d <= end)
            .collect();

        prop_assert_eq!(got, expected);
    }
}
