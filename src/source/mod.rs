pub mod exchangerate_api;
pub mod file;

pub use exchangerate_api::ExchangeRateApi;
pub use file::FileSource;

use crate::consts::BASE_CURRENCY;
use crate::exceptions::FetchError;
use crate::models::{RateObservation, Rates};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::future::Future;

/// Upstream provider of one day's EUR-based rates.
///
/// Implementations make a single attempt and impose no timeout of their own;
/// both are the caller's policy.
pub trait RateSource {
    fn fetch(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<RateObservation, FetchError>> + Send;
}

/// Which of the upstream currencies to keep and how many of them must be present.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyFilter {
    pub currencies: Vec<String>,
    pub min_currencies: usize,
}

impl CurrencyFilter {
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self {
            currencies: config.currencies.clone(),
            min_currencies: config.min_currencies,
        }
    }
}

#[derive(Deserialize)]
struct RatesPayload {
    #[serde(default, alias = "base_currency", alias = "base_code")]
    base: Option<String>,
    rates: Option<BTreeMap<String, serde_json::Value>>,
}

/// Parses an `{ "base": "EUR", "rates": { ... } }` body into an observation for `date`.
pub fn parse_rates_payload(
    body: &str,
    date: NaiveDate,
    filter: &CurrencyFilter,
) -> Result<RateObservation, FetchError> {
    let payload: RatesPayload = serde_json::from_str(body)
        .map_err(|e| FetchError::malformed(format!("Response is not valid JSON: {}", e)))?;

    if let Some(base) = &payload.base
        && !base.eq_ignore_ascii_case(BASE_CURRENCY)
    {
        return Err(FetchError::malformed(format!(
            "Expected base currency {}, got {}",
            BASE_CURRENCY, base
        )));
    }

    let upstream = payload
        .rates
        .ok_or_else(|| FetchError::malformed("Response has no 'rates' object"))?;

    let mut rates = Rates::new();
    for code in &filter.currencies {
        let Some(value) = upstream.get(code) else {
            continue;
        };
        let rate = value.as_f64().ok_or_else(|| {
            FetchError::malformed(format!("Rate for {} is not a number: {}", code, value))
        })?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(FetchError::malformed(format!(
                "Rate for {} is not strictly positive: {}",
                code, rate
            )));
        }
        rates.insert(code.clone(), rate);
    }

    if rates.len() < filter.min_currencies {
        let missing: Vec<&str> = filter
            .currencies
            .iter()
            .filter(|c| !rates.contains_key(*c))
            .map(String::as_str)
            .collect();
        return Err(FetchError::partial(format!(
            "Got {} of {} required currencies (missing: {})",
            rates.len(),
            filter.min_currencies,
            missing.join(", ")
        )));
    }

    Ok(RateObservation::new(date, rates))
}
