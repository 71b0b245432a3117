pub const BASE_CURRENCY: &str = "EUR";

/// Currencies tracked against EUR, in the column order used by the published archive.
pub const TARGET_CURRENCIES: [&str; 29] = [
    "AUD", "CAD", "CHF", "CZK", "DKK", "GBP", "HKD", "HUF", "JPY", "KRW", "NOK", "NZD", "PLN",
    "SEK", "SGD", "USD", "ZAR", "TRY", "IDR", "MYR", "PHP", "THB", "RON", "MXN", "CNY", "BRL",
    "INR", "ILS", "BGN",
];

pub const DEFAULT_API_URL: &str = "https://api.exchangerate-api.com/v4/latest/EUR";
pub const DEFAULT_DATA_SOURCE: &str = "European Central Bank via exchangerate-api.com";

// --- Published artifacts ---

pub const LATEST_FILE_NAME: &str = "latest.json";
pub const RATES_FILE_NAME: &str = "currency_rates.json";
pub const METADATA_FILE_NAME: &str = "metadata.json";

// --- Local state ---

pub const CONFIG_FILE_NAME: &str = "currency-pages.toml";
pub const LOCK_FILE_NAME: &str = ".update.lock";
pub const DEFAULT_DOCS_DIR: &str = "docs";
pub const DEFAULT_STORE_DIR: &str = "data/history";

pub const DEFAULT_EPSILON: f64 = 1e-9;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

// --- Environment overrides ---

pub const ENV_API_URL: &str = "CURRENCY_PAGES_API_URL";
pub const ENV_DOCS_DIR: &str = "CURRENCY_PAGES_DOCS_DIR";
pub const ENV_STORE_DIR: &str = "CURRENCY_PAGES_STORE_DIR";
pub const ENV_MIN_CURRENCIES: &str = "CURRENCY_PAGES_MIN_CURRENCIES";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "CURRENCY_PAGES_FETCH_TIMEOUT_SECS";
