use chrono::NaiveDate;
use currency_pages::config::Config;
use currency_pages::exceptions::FetchError;
use currency_pages::models::{RateObservation, Rates};
use currency_pages::source::RateSource;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[allow(dead_code)]
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[allow(dead_code)]
pub fn obs(d: &str, rates: &[(&str, f64)]) -> RateObservation {
    RateObservation::new(
        date(d),
        rates
            .iter()
            .map(|(c, r)| (c.to_string(), *r))
            .collect::<Rates>(),
    )
}

/// Config rooted in a temp dir, tracking USD and GBP only.
#[allow(dead_code)]
pub fn test_config(root: &Path) -> Config {
    Config {
        docs_dir: root.join("docs"),
        store_dir: root.join("store"),
        currencies: vec!["USD".into(), "GBP".into()],
        min_currencies: 2,
        ..Config::default()
    }
}

/// Writes a config file usable with `--config` and returns its path.
#[allow(dead_code)]
pub fn write_config(root: &Path, api_url: &str) -> std::path::PathBuf {
    let path = root.join("currency-pages.toml");
    let body = format!(
        r#"docs_dir = '{docs}'
store_dir = '{store}'
api_url = '{api_url}'
currencies = ["USD", "GBP"]
min_currencies = 2
fetch_timeout_secs = 5
"#,
        docs = root.join("docs").display(),
        store = root.join("store").display(),
    );
    std::fs::write(&path, body).unwrap();
    path
}

/// Returns the same answer for every date, stamped with the requested date.
#[allow(dead_code)]
pub struct StaticSource {
    response: Result<RateObservation, FetchError>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StaticSource {
    pub fn ok(rates: &[(&str, f64)]) -> Self {
        Self {
            response: Ok(obs("2000-01-01", rates)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RateSource for StaticSource {
    async fn fetch(&self, date: NaiveDate) -> Result<RateObservation, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone().map(|mut o| {
            o.date = date;
            o
        })
    }
}

/// Never answers within any sensible timeout.
#[allow(dead_code)]
pub struct StalledSource;

impl RateSource for StalledSource {
    async fn fetch(&self, _date: NaiveDate) -> Result<RateObservation, FetchError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(FetchError::unavailable("unreachable"))
    }
}
