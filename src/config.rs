//! Pipeline configuration.
//!
//! Values come from a TOML file (explicit `--config` path, or
//! `currency-pages.toml` in the working directory when present), then
//! `CURRENCY_PAGES_*` environment variables override individual keys.

use crate::consts::*;
use crate::exceptions::PagesError;
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory the three published artifacts are written to
    pub docs_dir: PathBuf,
    /// Directory holding one partition file per year
    pub store_dir: PathBuf,
    /// Upstream endpoint returning the latest EUR rates
    pub api_url: String,
    /// Target currencies, in published column order
    pub currencies: Vec<String>,
    /// Fewer target currencies than this in a fetch is a partial response
    pub min_currencies: usize,
    /// Largest rate difference still treated as "unchanged" on a re-run
    pub epsilon: f64,
    pub fetch_timeout_secs: u64,
    /// Attribution written into the published metadata
    pub data_source: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            api_url: DEFAULT_API_URL.to_string(),
            currencies: TARGET_CURRENCIES.iter().map(|c| c.to_string()).collect(),
            min_currencies: TARGET_CURRENCIES.len(),
            epsilon: DEFAULT_EPSILON,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            data_source: DEFAULT_DATA_SOURCE.to_string(),
        }
    }
}

impl Config {
    /// Resolves the effective configuration for a CLI invocation.
    pub fn load(explicit: Option<&Path>) -> Result<Self, PagesError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.exists() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, PagesError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PagesError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse_toml(&contents)
    }

    pub fn parse_toml(s: &str) -> Result<Self, PagesError> {
        toml::from_str(s)
            .map_err(|e| PagesError::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Applies `CURRENCY_PAGES_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), PagesError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(dir) = lookup(ENV_DOCS_DIR) {
            self.docs_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_STORE_DIR) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_MIN_CURRENCIES) {
            self.min_currencies = parse_env(ENV_MIN_CURRENCIES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch_timeout_secs = parse_env(ENV_FETCH_TIMEOUT_SECS, &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), PagesError> {
        if self.currencies.is_empty() {
            return Err(PagesError::Configuration(
                "At least one target currency is required.".into(),
            ));
        }

        let mut seen = HashSet::new();
        for code in &self.currencies {
            if !is_currency_code(code) {
                return Err(PagesError::Configuration(format!(
                    "Invalid currency code '{}'. Expected three uppercase letters.",
                    code
                )));
            }
            if code == BASE_CURRENCY {
                return Err(PagesError::Configuration(format!(
                    "{} is the base currency and cannot be a target.",
                    BASE_CURRENCY
                )));
            }
            if !seen.insert(code.as_str()) {
                return Err(PagesError::Configuration(format!(
                    "Currency '{}' is listed twice.",
                    code
                )));
            }
        }

        if self.min_currencies == 0 || self.min_currencies > self.currencies.len() {
            return Err(PagesError::Configuration(format!(
                "min_currencies must be between 1 and {} (got {}).",
                self.currencies.len(),
                self.min_currencies
            )));
        }

        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(PagesError::Configuration(format!(
                "epsilon must be a non-negative number (got {}).",
                self.epsilon
            )));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(PagesError::Configuration(
                "fetch_timeout_secs must be greater than zero.".into(),
            ));
        }

        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.store_dir.join(LOCK_FILE_NAME)
    }
}

pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, PagesError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        PagesError::Configuration(format!("Invalid value '{}' for {}: {}", raw, key, e))
    })
}
