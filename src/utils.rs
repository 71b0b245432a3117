use crate::exceptions::PagesError;
use chrono::{NaiveDate, Utc};
#[cfg(not(target_arch = "riscv64"))]
use rustls::crypto::aws_lc_rs;
#[cfg(target_arch = "riscv64")]
use rustls::crypto::ring;

pub fn setup_crypto_provider() {
    static DONE: std::sync::OnceLock<()> = std::sync::OnceLock::new();
    DONE.get_or_init(|| {
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            #[cfg(target_arch = "riscv64")]
            let provider = ring::default_provider();

            #[cfg(not(target_arch = "riscv64"))]
            let provider = aws_lc_rs::default_provider();

            let _ = provider.install_default();
        }
    });
}

pub fn setup_http_client() -> Result<reqwest::Client, PagesError> {
    setup_crypto_provider();
    reqwest::Client::builder()
        .user_agent(concat!("currency-pages/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| PagesError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// The rate date a scheduled run publishes for: the current calendar date in CET/CEST.
pub fn today_in_cet() -> NaiveDate {
    Utc::now().with_timezone(&chrono_tz::CET).date_naive()
}

pub fn parse_date(input: &str) -> Result<NaiveDate, PagesError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        PagesError::InvalidInput(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD.",
            input
        ))
    })
}
