//! `currency_rates.json`: the full history as one document, grouped by year.
//!
//! ```json
//! {
//!   "metadata": { "base_currency": "EUR", "currencies": [...], ... },
//!   "currencies": ["AUD", "CAD", ...],
//!   "rates_by_year": { "2025": { "09-29": [1.61, 1.58, ...] } }
//! }
//! ```
//!
//! Each row lines up with `currencies`; `null` marks a currency missing that
//! day. Older exports used a top-level `data` map keyed by full dates and kept
//! the currency list only under `metadata`; both layouts decode.

use crate::exceptions::PagesError;
use crate::historystore::partition::parse_month_day;
use crate::models::{RateObservation, Rates};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type YearRows = BTreeMap<String, Vec<Option<f64>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesArchive {
    pub metadata: ArchiveMetadata,
    #[serde(default)]
    pub currencies: Vec<String>,
    #[serde(alias = "data")]
    pub rates_by_year: BTreeMap<i32, YearRows>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub base_currency: String,
    #[serde(default)]
    pub currencies: Vec<String>,
    #[serde(default)]
    pub data_source: String,
    /// Kept as text: older exports wrote local timestamps without an offset.
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub total_records: usize,
    #[serde(default)]
    pub earliest_date: Option<NaiveDate>,
    #[serde(default)]
    pub latest_date: Option<NaiveDate>,
}

impl RatesArchive {
    /// Column header for the rate rows; legacy files only carry it in the metadata.
    pub fn columns(&self) -> &[String] {
        if self.currencies.is_empty() {
            &self.metadata.currencies
        } else {
            &self.currencies
        }
    }

    /// Appends observations (ascending order expected) as rows aligned with `currencies`.
    pub fn from_observations<'a, I>(metadata: ArchiveMetadata, observations: I) -> Self
    where
        I: IntoIterator<Item = &'a RateObservation>,
    {
        let currencies = metadata.currencies.clone();
        let mut rates_by_year: BTreeMap<i32, YearRows> = BTreeMap::new();

        for observation in observations {
            let row = currencies
                .iter()
                .map(|c| observation.rates.get(c).copied())
                .collect();
            rates_by_year
                .entry(observation.date.year())
                .or_default()
                .insert(observation.date.format("%m-%d").to_string(), row);
        }

        Self {
            metadata,
            currencies,
            rates_by_year,
        }
    }

    pub fn observation(&self, date: NaiveDate) -> Result<Option<RateObservation>, PagesError> {
        let Some(rows) = self.rates_by_year.get(&date.year()) else {
            return Ok(None);
        };

        let short = date.format("%m-%d").to_string();
        let full = date.format("%Y-%m-%d").to_string();
        match rows.get(&short).or_else(|| rows.get(&full)) {
            Some(row) => Ok(Some(self.decode_row(date, row)?)),
            None => Ok(None),
        }
    }

    /// Every observation of one year, ascending, without touching other years.
    pub fn year(&self, year: i32) -> Result<Vec<RateObservation>, PagesError> {
        let Some(rows) = self.rates_by_year.get(&year) else {
            return Ok(Vec::new());
        };

        let mut observations = Vec::with_capacity(rows.len());
        for (key, row) in rows {
            let date = parse_month_day(year, key)?;
            observations.push(self.decode_row(date, row)?);
        }
        observations.sort_by_key(|o| o.date);
        Ok(observations)
    }

    pub fn range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RateObservation>, PagesError> {
        let mut out = Vec::new();
        if start > end {
            return Ok(out);
        }
        for &year in self.rates_by_year.keys() {
            if (start.year()..=end.year()).contains(&year) {
                out.extend(
                    self.year(year)?
                        .into_iter()
                        .filter(|o| o.date >= start && o.date <= end),
                );
            }
        }
        Ok(out)
    }

    /// All observations, ascending. Days whose row carries no rate at all are skipped.
    pub fn observations(&self) -> Result<Vec<RateObservation>, PagesError> {
        let mut out = Vec::new();
        for &year in self.rates_by_year.keys() {
            out.extend(self.year(year)?.into_iter().filter(|o| !o.rates.is_empty()));
        }
        Ok(out)
    }

    fn decode_row(&self, date: NaiveDate, row: &[Option<f64>]) -> Result<RateObservation, PagesError> {
        let columns = self.columns();
        if row.len() > columns.len() {
            return Err(PagesError::InvalidInput(format!(
                "Row for {} has {} rates but only {} currencies are declared",
                date,
                row.len(),
                columns.len()
            )));
        }

        // Short rows are tolerated: trailing currencies were added after that day.
        let rates: Rates = columns
            .iter()
            .zip(row)
            .filter_map(|(code, rate)| rate.map(|r| (code.clone(), r)))
            .collect();

        Ok(RateObservation {
            date,
            base_currency: self.metadata.base_currency.clone(),
            rates,
        })
    }
}
