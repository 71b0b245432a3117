use crate::exceptions::FetchError;
use crate::models::RateObservation;
use crate::source::{CurrencyFilter, RateSource, parse_rates_payload};
use chrono::NaiveDate;
use std::path::PathBuf;

/// Reads a rates payload from a local file, for manual corrections and backfills.
///
/// Accepts the upstream response shape as well as a previously published `latest.json`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    filter: CurrencyFilter,
}

impl FileSource {
    pub fn new(path: PathBuf, filter: CurrencyFilter) -> Self {
        Self { path, filter }
    }
}

impl RateSource for FileSource {
    async fn fetch(&self, date: NaiveDate) -> Result<RateObservation, FetchError> {
        log::info!("Reading rates for {} from {}", date, self.path.display());

        let body = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            FetchError::unavailable(format!("Cannot read {}: {}", self.path.display(), e))
        })?;

        parse_rates_payload(&body, date, &self.filter)
    }
}
