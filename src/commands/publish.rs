use crate::config::Config;
use crate::exceptions::PagesError;
use crate::fs::RunLock;
use crate::historystore::HistoricalStore;
use crate::publisher::Publisher;
use time::OffsetDateTime;

/// Regenerates the published artifacts from the store without fetching.
pub fn run(config: &Config) -> Result<(), PagesError> {
    let _lock = RunLock::acquire(&config.lock_path())?;
    let store = HistoricalStore::open(config.store_dir.clone())?;

    let report = Publisher::new(config).publish(&store, OffsetDateTime::now_utc())?;

    println!(
        "Published {} records through {} to {}",
        report.total_records,
        report.latest_date,
        config.docs_dir.display()
    );
    Ok(())
}
