use crate::config::Config;
use crate::exceptions::PagesError;
use crate::fs::RunLock;
use crate::historystore::HistoricalStore;
use crate::models::PublishResult;
use crate::publisher::Publisher;
use crate::source::{CurrencyFilter, ExchangeRateApi, FileSource, RateSource};
use crate::updater::Updater;
use chrono::NaiveDate;
use std::io::Write;
use std::path::PathBuf;

pub async fn run(
    config: &Config,
    date: Option<NaiveDate>,
    rates_file: Option<PathBuf>,
    json_output: bool,
) -> Result<(), PagesError> {
    let today = date.unwrap_or_else(crate::utils::today_in_cet);
    let lock = RunLock::acquire(&config.lock_path())?;
    let store = HistoricalStore::open(config.store_dir.clone())?;
    let publisher = Publisher::new(config);

    let result = match rates_file {
        Some(path) => {
            let source = FileSource::new(path, CurrencyFilter::from_config(config));
            execute(config, &source, &store, &publisher, &lock, today).await?
        }
        None => {
            let source = ExchangeRateApi::new(config)?;
            execute(config, &source, &store, &publisher, &lock, today).await?
        }
    };

    let mut stdout = std::io::stdout().lock();
    if json_output {
        serde_json::to_writer(&mut stdout, &result)?;
        writeln!(stdout)?;
        return Ok(());
    }

    match &result.published {
        Some(report) => writeln!(
            stdout,
            "Rates for {} {}; published {} records through {}",
            result.date, result.action, report.total_records, report.latest_date
        )?,
        None => writeln!(
            stdout,
            "Rates for {} {}; published artifacts already current",
            result.date, result.action
        )?,
    }

    Ok(())
}

async fn execute<S: RateSource>(
    config: &Config,
    source: &S,
    store: &HistoricalStore,
    publisher: &Publisher,
    lock: &RunLock,
    today: NaiveDate,
) -> Result<PublishResult, PagesError> {
    Updater::new(source, store, publisher)
        .with_epsilon(config.epsilon)
        .with_fetch_timeout(config.fetch_timeout())
        .run(lock, today)
        .await
}
