use crate::consts::BASE_CURRENCY;
use crate::exceptions::PagesError;
use crate::models::{RateObservation, Rates, UpsertOutcome};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// All observations of one calendar year, sorted ascending by date, one per date.
#[derive(Debug, Clone, PartialEq)]
pub struct YearPartition {
    year: i32,
    observations: Vec<RateObservation>,
}

impl YearPartition {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            observations: Vec::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[RateObservation] {
        &self.observations
    }

    pub fn first(&self) -> Option<&RateObservation> {
        self.observations.first()
    }

    pub fn last(&self) -> Option<&RateObservation> {
        self.observations.last()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&RateObservation> {
        self.position(date).ok().map(|i| &self.observations[i])
    }

    /// Observations with `start <= date <= end`.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> &[RateObservation] {
        if start > end {
            return &[];
        }
        let lo = self.observations.partition_point(|o| o.date < start);
        let hi = self.observations.partition_point(|o| o.date <= end);
        &self.observations[lo..hi]
    }

    /// Inserts a new date or replaces the whole observation for an existing one.
    pub fn upsert(&mut self, observation: RateObservation) -> Result<UpsertOutcome, PagesError> {
        if observation.date.year() != self.year {
            return Err(PagesError::Store(format!(
                "Observation for {} does not belong to partition {}",
                observation.date, self.year
            )));
        }

        match self.position(observation.date) {
            Ok(i) => {
                self.observations[i] = observation;
                Ok(UpsertOutcome::Replaced)
            }
            Err(i) => {
                self.observations.insert(i, observation);
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    pub fn currencies(&self) -> BTreeSet<String> {
        self.observations
            .iter()
            .flat_map(|o| o.rates.keys().cloned())
            .collect()
    }

    fn position(&self, date: NaiveDate) -> Result<usize, usize> {
        self.observations.binary_search_by(|o| o.date.cmp(&date))
    }

    // --- On-disk encoding ---

    pub fn to_file(&self) -> PartitionFile {
        let currencies: Vec<String> = self.currencies().into_iter().collect();
        let days = self
            .observations
            .iter()
            .map(|o| {
                let row = currencies.iter().map(|c| o.rates.get(c).copied()).collect();
                (o.date.format("%m-%d").to_string(), row)
            })
            .collect();

        PartitionFile {
            year: self.year,
            base_currency: BASE_CURRENCY.to_string(),
            currencies,
            days,
        }
    }

    pub fn from_file(file: PartitionFile) -> Result<Self, PagesError> {
        let year = file.year;
        let mut observations = Vec::with_capacity(file.days.len());

        for (day, row) in file.days {
            if row.len() != file.currencies.len() {
                return Err(PagesError::Store(format!(
                    "Partition {} row {} has {} rates for {} currencies",
                    year,
                    day,
                    row.len(),
                    file.currencies.len()
                )));
            }

            let date = parse_month_day(year, &day)?;
            let rates: Rates = file
                .currencies
                .iter()
                .zip(row)
                .filter_map(|(code, rate)| rate.map(|r| (code.clone(), r)))
                .collect();

            observations.push(RateObservation {
                date,
                base_currency: file.base_currency.clone(),
                rates,
            });
        }

        observations.sort_by_key(|o| o.date);
        if let Some(pair) = observations.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(PagesError::Store(format!(
                "Partition {} contains {} more than once",
                year, pair[0].date
            )));
        }

        Ok(Self { year, observations })
    }
}

/// Compact per-year layout: one shared currency header, one rate row per day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionFile {
    pub year: i32,
    pub base_currency: String,
    pub currencies: Vec<String>,
    pub days: Vec<(String, Vec<Option<f64>>)>,
}

/// Accepts `MM-DD` keys (resolved against `year`) as well as full `YYYY-MM-DD` dates.
pub fn parse_month_day(year: i32, key: &str) -> Result<NaiveDate, PagesError> {
    let parsed = if key.len() == 5 {
        NaiveDate::parse_from_str(&format!("{}-{}", year, key), "%Y-%m-%d")
    } else {
        NaiveDate::parse_from_str(key, "%Y-%m-%d")
    };

    match parsed {
        Ok(date) if date.year() == year => Ok(date),
        Ok(date) => Err(PagesError::Store(format!(
            "Date {} filed under year {}",
            date, year
        ))),
        Err(_) => Err(PagesError::Store(format!(
            "Invalid day key '{}' in year {}",
            key, year
        ))),
    }
}
