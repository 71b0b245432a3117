use crate::config::Config;
use crate::consts::{BASE_CURRENCY, LATEST_FILE_NAME, METADATA_FILE_NAME, RATES_FILE_NAME};
use crate::exceptions::{PagesError, PublishError};
use crate::fs::{FileTransaction, read_json};
use crate::historystore::HistoricalStore;
use crate::historystore::archive::{ArchiveMetadata, RatesArchive};
use crate::models::{
    DateRange, FileSizes, LatestSnapshot, PublishReport, PublishedMetadata, RateObservation,
};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Renders `latest.json`, `currency_rates.json` and `metadata.json` from the
/// store and swaps them into the docs directory as one unit.
#[derive(Debug, Clone)]
pub struct Publisher {
    docs_dir: PathBuf,
    currencies: Vec<String>,
    data_source: String,
}

impl Publisher {
    pub fn new(config: &Config) -> Self {
        Self {
            docs_dir: config.docs_dir.clone(),
            currencies: config.currencies.clone(),
            data_source: config.data_source.clone(),
        }
    }

    pub fn artifacts_exist(&self) -> bool {
        [RATES_FILE_NAME, LATEST_FILE_NAME, METADATA_FILE_NAME]
            .iter()
            .all(|name| self.docs_dir.join(name).is_file())
    }

    /// True when every artifact exists and `metadata.json` describes the
    /// store's latest date and record count.
    pub fn is_current(&self, store: &HistoricalStore) -> Result<bool, PagesError> {
        if !self.artifacts_exist() {
            return Ok(false);
        }

        let path = self.docs_dir.join(METADATA_FILE_NAME);
        let published: PublishedMetadata = match read_json(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.display(), e);
                return Ok(false);
            }
        };

        let latest = store.latest()?.map(|o| o.date);
        Ok(latest == Some(published.latest_date)
            && published.total_records == store.total_records()?)
    }

    pub fn publish(
        &self,
        store: &HistoricalStore,
        now: OffsetDateTime,
    ) -> Result<PublishReport, PagesError> {
        let (Some(earliest), Some(latest)) = (store.earliest()?, store.latest()?) else {
            return Err(PublishError::EmptyStore.into());
        };
        let history = store.range(earliest.date, latest.date).to_vec()?;
        let columns = self.columns(store)?;

        let archive = RatesArchive::from_observations(
            ArchiveMetadata {
                base_currency: BASE_CURRENCY.to_string(),
                currencies: columns.clone(),
                data_source: self.data_source.clone(),
                last_updated: format_timestamp(now)?,
                total_records: history.len(),
                earliest_date: Some(earliest.date),
                latest_date: Some(latest.date),
            },
            history.iter(),
        );
        let rates_bytes = serde_json::to_vec(&archive)?;

        let latest_bytes = serde_json::to_vec_pretty(&snapshot(&latest, now))?;

        let mut supported_currencies = Vec::with_capacity(columns.len() + 1);
        supported_currencies.push(BASE_CURRENCY.to_string());
        supported_currencies.extend(columns);

        let metadata = PublishedMetadata {
            base_currency: BASE_CURRENCY.to_string(),
            total_currencies: supported_currencies.len(),
            supported_currencies,
            data_source: self.data_source.clone(),
            last_updated: now,
            total_records: history.len(),
            latest_date: latest.date,
            date_range: DateRange {
                start: earliest.date,
                end: latest.date,
            },
            file_sizes: FileSizes::from_bytes(rates_bytes.len(), latest_bytes.len()),
        };
        let metadata_bytes = serde_json::to_vec_pretty(&metadata)?;

        let mut transaction = FileTransaction::new(&self.docs_dir)?;
        transaction.stage(RATES_FILE_NAME, &rates_bytes)?;
        transaction.stage(LATEST_FILE_NAME, &latest_bytes)?;
        transaction.stage(METADATA_FILE_NAME, &metadata_bytes)?;
        transaction.commit()?;

        log::info!(
            "Published {} records up to {} to {} ({} MB full, {} KB latest)",
            history.len(),
            latest.date,
            self.docs_dir.display(),
            metadata.file_sizes.full_data_mb,
            metadata.file_sizes.latest_kb
        );

        Ok(PublishReport {
            latest_date: latest.date,
            total_records: history.len(),
            full_data_bytes: rates_bytes.len(),
            latest_bytes: latest_bytes.len(),
            last_updated: now,
        })
    }

    /// Configured currencies in their configured order, then any other code
    /// present in the history, alphabetically.
    fn columns(&self, store: &HistoricalStore) -> Result<Vec<String>, PagesError> {
        let mut columns = self.currencies.clone();
        for code in store.currencies()? {
            if !columns.contains(&code) {
                columns.push(code);
            }
        }
        Ok(columns)
    }
}

fn snapshot(observation: &RateObservation, now: OffsetDateTime) -> LatestSnapshot {
    LatestSnapshot {
        date: observation.date,
        base_currency: observation.base_currency.clone(),
        rates: observation.rates.clone(),
        last_updated: now,
    }
}

fn format_timestamp(ts: OffsetDateTime) -> Result<String, PagesError> {
    ts.format(&Rfc3339)
        .map_err(|e| PagesError::InvalidInput(format!("Cannot format timestamp {}: {}", ts, e)))
}
