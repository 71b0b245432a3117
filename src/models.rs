use crate::consts::BASE_CURRENCY;
use crate::exceptions::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// ISO 4217 code -> units of that currency per one unit of the base currency.
pub type Rates = BTreeMap<String, f64>;

// --- Observations ---

/// One calendar date's complete set of exchange rates against EUR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateObservation {
    pub date: NaiveDate,
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    pub rates: Rates,
}

fn default_base_currency() -> String {
    BASE_CURRENCY.to_string()
}

impl RateObservation {
    pub fn new(date: NaiveDate, rates: Rates) -> Self {
        Self {
            date,
            base_currency: default_base_currency(),
            rates,
        }
    }

    /// Checks the store invariants: at least one rate, every rate finite and strictly positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.rates.is_empty() {
            return Err(ValidationError::EmptyRates { date: self.date });
        }

        for (currency, &rate) in &self.rates {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(ValidationError::NonPositiveRate {
                    date: self.date,
                    currency: currency.clone(),
                    rate,
                });
            }
        }

        Ok(())
    }

    /// True when the currency sets differ or any shared rate moved by more than `epsilon`.
    pub fn differs_from(&self, other: &RateObservation, epsilon: f64) -> bool {
        if self.base_currency != other.base_currency || self.rates.len() != other.rates.len() {
            return true;
        }

        self.rates.iter().any(|(code, rate)| match other.rates.get(code) {
            Some(prev) => (rate - prev).abs() > epsilon,
            None => true,
        })
    }
}

// --- Store mutations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateAction {
    Inserted,
    Corrected,
    Unchanged,
}

impl std::fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateAction::Inserted => write!(f, "inserted"),
            UpdateAction::Corrected => write!(f, "corrected"),
            UpdateAction::Unchanged => write!(f, "unchanged"),
        }
    }
}

// --- Published artifacts ---

/// `latest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSnapshot {
    pub date: NaiveDate,
    pub base_currency: String,
    pub rates: Rates,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedMetadata {
    pub base_currency: String,
    pub supported_currencies: Vec<String>,
    pub total_currencies: usize,
    pub data_source: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub total_records: usize,
    pub latest_date: NaiveDate,
    pub date_range: DateRange,
    pub file_sizes: FileSizes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FileSizes {
    pub full_data_mb: f64,
    pub latest_kb: f64,
}

impl FileSizes {
    pub fn from_bytes(full_data: usize, latest: usize) -> Self {
        Self {
            full_data_mb: round2(full_data as f64 / 1024.0 / 1024.0),
            latest_kb: round2(latest as f64 / 1024.0),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// --- Run results ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishReport {
    pub latest_date: NaiveDate,
    pub total_records: usize,
    pub full_data_bytes: usize,
    pub latest_bytes: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishResult {
    pub date: NaiveDate,
    pub action: UpdateAction,
    pub published: Option<PublishReport>,
}
