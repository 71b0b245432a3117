mod common;
use crate::common::{date, obs, test_config};
use currency_pages::exceptions::{PagesError, PublishError};
use currency_pages::historystore::HistoricalStore;
use currency_pages::historystore::archive::RatesArchive;
use currency_pages::models::{LatestSnapshot, PublishedMetadata};
use currency_pages::publisher::Publisher;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;
use time::macros::datetime;

fn seeded_store(root: &std::path::Path) -> HistoricalStore {
    let store = HistoricalStore::open(root.join("store")).unwrap();
    store
        .upsert_many(vec![
            obs("2024-12-31", &[("USD", 1.04), ("GBP", 0.83)]),
            obs("2025-01-02", &[("USD", 1.03), ("GBP", 0.83), ("CHF", 0.94)]),
            obs("2025-09-29", &[("USD", 1.1234), ("GBP", 0.8567)]),
        ])
        .unwrap();
    store
}

#[test]
fn test_publish_writes_three_artifacts() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let store = seeded_store(temp.path());
    let publisher = Publisher::new(&config);
    assert!(!publisher.artifacts_exist());

    // WHEN publishing
    let report = publisher
        .publish(&store, datetime!(2025-09-29 16:30 UTC))
        .unwrap();

    // THEN the report matches the store
    assert_eq!(report.total_records, 3);
    assert_eq!(report.latest_date, date("2025-09-29"));
    assert!(publisher.artifacts_exist());

    // AND latest.json holds only the newest day
    let latest: LatestSnapshot =
        serde_json::from_slice(&fs::read(config.docs_dir.join("latest.json")).unwrap()).unwrap();
    assert_eq!(latest.date, date("2025-09-29"));
    assert_eq!(latest.base_currency, "EUR");
    assert_eq!(latest.rates.len(), 2);
    assert_eq!(latest.last_updated, datetime!(2025-09-29 16:30 UTC));

    // AND metadata.json summarizes the history
    let metadata: PublishedMetadata =
        serde_json::from_slice(&fs::read(config.docs_dir.join("metadata.json")).unwrap()).unwrap();
    assert_eq!(metadata.base_currency, "EUR");
    assert_eq!(metadata.supported_currencies, vec!["EUR", "USD", "GBP", "CHF"]);
    assert_eq!(metadata.total_currencies, 4);
    assert_eq!(metadata.total_records, 3);
    assert_eq!(metadata.date_range.start, date("2024-12-31"));
    assert_eq!(metadata.date_range.end, date("2025-09-29"));
    assert_eq!(metadata.data_source, config.data_source);
}

#[test]
fn test_full_archive_is_grouped_by_year_with_aligned_rows() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let store = seeded_store(temp.path());

    Publisher::new(&config)
        .publish(&store, datetime!(2025-09-29 16:30 UTC))
        .unwrap();

    let raw: Value =
        serde_json::from_slice(&fs::read(config.docs_dir.join("currency_rates.json")).unwrap())
            .unwrap();

    // Configured currencies first, then codes only seen in the history.
    assert_eq!(raw["currencies"], serde_json::json!(["USD", "GBP", "CHF"]));
    assert_eq!(raw["metadata"]["total_records"], 3);
    assert_eq!(raw["metadata"]["latest_date"], "2025-09-29");
    assert_eq!(raw["rates_by_year"]["2024"]["12-31"], serde_json::json!([1.04, 0.83, null]));
    assert_eq!(raw["rates_by_year"]["2025"]["01-02"], serde_json::json!([1.03, 0.83, 0.94]));
}

#[test]
fn test_published_archive_supports_lookups() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let store = seeded_store(temp.path());
    Publisher::new(&config)
        .publish(&store, datetime!(2025-09-29 16:30 UTC))
        .unwrap();

    let archive: RatesArchive =
        serde_json::from_slice(&fs::read(config.docs_dir.join("currency_rates.json")).unwrap())
            .unwrap();

    // Single date
    let day = archive.observation(date("2025-01-02")).unwrap().unwrap();
    assert_eq!(day.rates["CHF"], 0.94);
    assert!(archive.observation(date("2025-01-03")).unwrap().is_none());

    // One year only
    let year = archive.year(2024).unwrap();
    assert_eq!(year.len(), 1);
    assert!(!year[0].rates.contains_key("CHF"));

    // Range across years
    let range = archive
        .range(date("2024-12-01"), date("2025-01-31"))
        .unwrap();
    let dates: Vec<_> = range.iter().map(|o| o.date).collect();
    assert_eq!(dates, vec![date("2024-12-31"), date("2025-01-02")]);

    // Everything round-trips to the store's view
    let all = archive.observations().unwrap();
    let stored = store
        .range(date("2024-01-01"), date("2025-12-31"))
        .to_vec()
        .unwrap();
    assert_eq!(all, stored);
}

#[test]
fn test_empty_store_refuses_to_publish() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let store = HistoricalStore::open(config.store_dir.clone()).unwrap();

    let err = Publisher::new(&config)
        .publish(&store, datetime!(2025-09-29 16:30 UTC))
        .unwrap_err();

    assert!(matches!(err, PagesError::Publish(PublishError::EmptyStore)));
    assert!(!config.docs_dir.join("latest.json").exists());
}

#[test]
fn test_failed_publish_keeps_previous_artifacts() {
    let temp = tempdir().unwrap();
    let config = test_config(temp.path());
    let store = seeded_store(temp.path());
    let publisher = Publisher::new(&config);

    // GIVEN a first successful publish
    publisher
        .publish(&store, datetime!(2025-09-29 16:30 UTC))
        .unwrap();
    let rates_before = fs::read(config.docs_dir.join("currency_rates.json")).unwrap();
    let latest_before = fs::read(config.docs_dir.join("latest.json")).unwrap();

    // AND metadata.json replaced by something that cannot be overwritten
    let metadata = config.docs_dir.join("metadata.json");
    fs::remove_file(&metadata).unwrap();
    fs::create_dir(&metadata).unwrap();
    fs::write(metadata.join("blocker"), "x").unwrap();

    // WHEN a new day is published
    store
        .upsert(obs("2025-09-30", &[("USD", 1.2), ("GBP", 0.9)]))
        .unwrap();
    let err = publisher
        .publish(&store, datetime!(2025-09-30 16:30 UTC))
        .unwrap_err();

    // THEN the publish fails with exit code 4
    assert!(matches!(
        err,
        PagesError::Publish(PublishError::PartialWrite {
            rolled_back: true,
            ..
        })
    ));
    assert_eq!(err.exit_code(), 4);

    // AND readers still see the previous generation, byte for byte
    assert_eq!(
        fs::read(config.docs_dir.join("currency_rates.json")).unwrap(),
        rates_before
    );
    assert_eq!(
        fs::read(config.docs_dir.join("latest.json")).unwrap(),
        latest_before
    );
}
