use crate::config::Config;
use crate::exceptions::PagesError;
use crate::historystore::HistoricalStore;
use chrono::NaiveDate;
use std::io::Write;

pub fn show(config: &Config, date: NaiveDate) -> Result<(), PagesError> {
    let store = HistoricalStore::open(config.store_dir.clone())?;
    let observation = store
        .get(date)?
        .ok_or_else(|| PagesError::InvalidInput(format!("No rates stored for {}", date)))?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &observation)?;
    writeln!(stdout)?;
    Ok(())
}

pub fn range(config: &Config, start: NaiveDate, end: NaiveDate) -> Result<(), PagesError> {
    if start > end {
        return Err(PagesError::InvalidInput(format!(
            "Range start {} is after end {}",
            start, end
        )));
    }

    let store = HistoricalStore::open(config.store_dir.clone())?;
    let observations = store.range(start, end).to_vec()?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &observations)?;
    writeln!(stdout)?;
    Ok(())
}
