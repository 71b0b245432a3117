use crate::config::Config;
use crate::exceptions::{FetchError, PagesError};
use crate::models::RateObservation;
use crate::source::{CurrencyFilter, RateSource, parse_rates_payload};
use chrono::NaiveDate;
use reqwest::Client as HttpClient;

/// exchangerate-api.com style endpoint returning the latest rates for EUR.
#[derive(Debug)]
pub struct ExchangeRateApi {
    http: HttpClient,
    url: String,
    filter: CurrencyFilter,
}

impl ExchangeRateApi {
    pub fn new(config: &Config) -> Result<Self, PagesError> {
        Ok(Self {
            http: crate::utils::setup_http_client()?,
            url: config.api_url.clone(),
            filter: CurrencyFilter::from_config(config),
        })
    }
}

impl RateSource for ExchangeRateApi {
    async fn fetch(&self, date: NaiveDate) -> Result<RateObservation, FetchError> {
        log::info!("Fetching rates for {} from {}", date, self.url);

        let response = self
            .http
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| FetchError::unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = if text.trim().is_empty() {
                format!("API Error (Status: {}): [Empty Body]", status)
            } else {
                format!("API Error (Status: {}): {}", status, text.trim())
            };
            return Err(FetchError::unavailable(message));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::unavailable(format!("Failed to read response: {}", e)))?;

        let observation = parse_rates_payload(&body, date, &self.filter)?;
        log::info!("Fetched {} currency rates", observation.rates.len());
        Ok(observation)
    }
}
