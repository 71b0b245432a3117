use crate::config::Config;
use crate::exceptions::PagesError;
use crate::historystore::HistoricalStore;
use crate::publisher::Publisher;
use chrono::NaiveDate;
use comfy_table::{Attribute, Cell, CellAlignment, Table};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

#[derive(Serialize)]
struct StatusResponse {
    store_dir: PathBuf,
    docs_dir: PathBuf,
    artifacts_present: bool,
    total_records: usize,
    earliest_date: Option<NaiveDate>,
    latest_date: Option<NaiveDate>,
    partitions: Vec<PartitionSummary>,
}

#[derive(Serialize)]
struct PartitionSummary {
    year: i32,
    records: usize,
    currencies: usize,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
}

pub fn run(config: &Config, json_output: bool) -> Result<(), PagesError> {
    let store = HistoricalStore::open(config.store_dir.clone())?;

    let mut partitions = Vec::new();
    for year in store.years() {
        if let Some(p) = store.partition(year)? {
            partitions.push(PartitionSummary {
                year,
                records: p.len(),
                currencies: p.currencies().len(),
                first_date: p.first().map(|o| o.date),
                last_date: p.last().map(|o| o.date),
            });
        }
    }

    let resp = StatusResponse {
        store_dir: config.store_dir.clone(),
        docs_dir: config.docs_dir.clone(),
        artifacts_present: Publisher::new(config).artifacts_exist(),
        total_records: partitions.iter().map(|p| p.records).sum(),
        earliest_date: partitions.iter().find_map(|p| p.first_date),
        latest_date: partitions.iter().rev().find_map(|p| p.last_date),
        partitions,
    };

    let mut stdout = std::io::stdout().lock();

    if json_output {
        serde_json::to_writer(&mut stdout, &resp)?;
        writeln!(stdout)?;
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::NOTHING)
        .set_style(comfy_table::TableComponent::HeaderLines, '─')
        .set_style(comfy_table::TableComponent::MiddleHeaderIntersections, ' ');

    table.set_header(vec![
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("Records").add_attribute(Attribute::Bold),
        Cell::new("Currencies").add_attribute(Attribute::Bold),
        Cell::new("First").add_attribute(Attribute::Bold),
        Cell::new("Last").add_attribute(Attribute::Bold),
    ]);

    for p in &resp.partitions {
        table.add_row(vec![
            Cell::new(p.year),
            Cell::new(p.records).set_alignment(CellAlignment::Right),
            Cell::new(p.currencies).set_alignment(CellAlignment::Right),
            Cell::new(fmt_date(p.first_date)),
            Cell::new(fmt_date(p.last_date)),
        ]);
    }

    writeln!(stdout, "Store: {}", resp.store_dir.display())?;
    writeln!(stdout, "{}", table)?;
    writeln!(
        stdout,
        "Total: {} records, {} to {}",
        resp.total_records,
        fmt_date(resp.earliest_date),
        fmt_date(resp.latest_date)
    )?;
    writeln!(
        stdout,
        "Artifacts in {}: {}",
        resp.docs_dir.display(),
        if resp.artifacts_present {
            "present"
        } else {
            "missing"
        }
    )?;

    Ok(())
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
}
