use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use currency_pages::config::Config;
use currency_pages::exceptions::PagesError;
use std::path::PathBuf;

// Use jemalloc on musl x86_64 for better performance
#[cfg(all(target_env = "musl", target_arch = "x86_64"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(
    name = "currency-pages",
    about = "Fetch daily EUR exchange rates and publish them as static JSON files",
    long_about = None,
    version = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\n",
        "Build Information:\n",
        "  Timestamp:         ", env!("VERGEN_BUILD_TIMESTAMP"), "\n",
        "  Target Triple:     ", env!("VERGEN_CARGO_TARGET_TRIPLE"), "\n",
        "\n",
        "Compiler:\n",
        "  Rustc Version:     ", env!("VERGEN_RUSTC_SEMVER"), "\n",
        "  Rustc Channel:     ", env!("VERGEN_RUSTC_CHANNEL"), "\n",
        "  Host Triple:       ", env!("VERGEN_RUSTC_HOST_TRIPLE"), "\n"
    ),
    disable_help_subcommand = true
)]
struct Cli {
    /// Path to a TOML config file [default: ./currency-pages.toml if present]
    #[arg(long, short, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one publish cycle: fetch, merge into the history, publish.
    ///
    /// Safe to repeat for the same date: unchanged rates leave the history as is,
    /// changed rates replace the stored day as a correction.
    Run {
        /// Rate date to record [default: today in CET]
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
        /// Read rates from a local JSON file instead of the upstream API
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        rates_file: Option<PathBuf>,
        /// Print the run result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Regenerate the published files from the stored history.
    Publish,

    /// Seed the history from an existing currency_rates.json, then publish.
    Import {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        path: PathBuf,
    },

    /// Print the stored rates for one date.
    Show {
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },

    /// Print the stored rates between two dates (inclusive) as a JSON array.
    Range {
        #[arg(value_parser = parse_date_arg)]
        start: NaiveDate,
        #[arg(value_parser = parse_date_arg)]
        end: NaiveDate,
    },

    /// Summarize the stored history and published files.
    Status {
        #[arg(long)]
        json: bool,
    },
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    currency_pages::utils::parse_date(s).map_err(|e| e.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match Config::load(cli.config.as_deref()) {
        Ok(config) => dispatch(&config, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn dispatch(config: &Config, command: Commands) -> Result<(), PagesError> {
    match command {
        Commands::Run {
            date,
            rates_file,
            json,
        } => currency_pages::commands::run::run(config, date, rates_file, json).await,
        Commands::Publish => currency_pages::commands::publish::run(config),
        Commands::Import { path } => currency_pages::commands::import::run(config, &path),
        Commands::Show { date } => currency_pages::commands::query::show(config, date),
        Commands::Range { start, end } => currency_pages::commands::query::range(config, start, end),
        Commands::Status { json } => currency_pages::commands::status::run(config, json),
    }
}
