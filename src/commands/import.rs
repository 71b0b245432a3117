use crate::config::Config;
use crate::exceptions::PagesError;
use crate::fs::{RunLock, read_json};
use crate::historystore::HistoricalStore;
use crate::historystore::archive::RatesArchive;
use crate::publisher::Publisher;
use std::path::Path;
use time::OffsetDateTime;

/// Seeds the store from an existing `currency_rates.json`, then publishes.
pub fn run(config: &Config, archive_path: &Path) -> Result<(), PagesError> {
    let archive: RatesArchive = read_json(archive_path).map_err(|e| {
        PagesError::InvalidInput(format!(
            "Cannot read archive {}: {}",
            archive_path.display(),
            e
        ))
    })?;

    if archive.columns().is_empty() {
        return Err(PagesError::InvalidInput(format!(
            "Archive {} declares no currencies",
            archive_path.display()
        )));
    }

    let observations = archive.observations()?;
    let (Some(first), Some(last)) = (observations.first(), observations.last()) else {
        return Err(PagesError::InvalidInput(format!(
            "Archive {} contains no observations",
            archive_path.display()
        )));
    };
    let (first, last) = (first.date, last.date);

    let _lock = RunLock::acquire(&config.lock_path())?;
    let store = HistoricalStore::open(config.store_dir.clone())?;

    let count = store.upsert_many(observations)?;
    log::info!("Imported {} observations from {}", count, archive_path.display());

    let report = Publisher::new(config).publish(&store, OffsetDateTime::now_utc())?;

    println!(
        "Imported {} observations ({} to {}); published {} records",
        count, first, last, report.total_records
    );
    Ok(())
}
