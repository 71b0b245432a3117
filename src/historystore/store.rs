use crate::exceptions::PagesError;
use crate::fs::{atomic_write_json, read_json};
use crate::historystore::partition::{PartitionFile, YearPartition};
use crate::models::{RateObservation, UpsertOutcome};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Date-indexed rate history persisted as one JSON file per calendar year.
///
/// Partitions are read from disk the first time a query touches their year
/// and then shared as immutable `Arc`s. Writes build a new partition, persist
/// it with a temp-file rename and only then swap it in, so a reader holds
/// either the old or the new partition and never a partially applied one.
#[derive(Debug)]
pub struct HistoricalStore {
    root: PathBuf,
    partitions: RwLock<BTreeMap<i32, Slot>>,
    writer: Mutex<()>,
}

#[derive(Debug, Clone)]
enum Slot {
    OnDisk,
    Loaded(Arc<YearPartition>),
}

impl HistoricalStore {
    /// Opens the store rooted at `root`, indexing existing `<year>.json` partitions.
    pub fn open(root: PathBuf) -> Result<Self, PagesError> {
        let mut partitions = BTreeMap::new();

        if root.exists() {
            for entry in fs::read_dir(&root)? {
                let path = entry?.path();
                if path.extension().and_then(|s| s.to_str()) == Some("json")
                    && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                    && let Ok(year) = stem.parse::<i32>()
                {
                    partitions.insert(year, Slot::OnDisk);
                }
            }
        }

        log::debug!(
            "Opened store {} with {} partition(s)",
            root.display(),
            partitions.len()
        );

        Ok(Self {
            root,
            partitions: RwLock::new(partitions),
            writer: Mutex::new(()),
        })
    }

    /// Years with a partition, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.index().keys().copied().collect()
    }

    pub fn is_empty(&self) -> Result<bool, PagesError> {
        Ok(self.latest()?.is_none())
    }

    /// Returns the partition for `year`, loading it on first access.
    pub fn partition(&self, year: i32) -> Result<Option<Arc<YearPartition>>, PagesError> {
        match self.index().get(&year) {
            None => return Ok(None),
            Some(Slot::Loaded(p)) => return Ok(Some(Arc::clone(p))),
            Some(Slot::OnDisk) => {}
        }

        let file: PartitionFile = read_json(&self.partition_path(year))?;
        if file.year != year {
            return Err(PagesError::Store(format!(
                "Partition file for {} declares year {}",
                year, file.year
            )));
        }
        let loaded = Arc::new(YearPartition::from_file(file)?);

        // Another reader may have loaded it meanwhile; keep whichever got there first.
        let mut index = self.index_mut();
        if let Some(Slot::Loaded(existing)) = index.get(&year) {
            return Ok(Some(Arc::clone(existing)));
        }
        index.insert(year, Slot::Loaded(Arc::clone(&loaded)));
        Ok(Some(loaded))
    }

    pub fn get(&self, date: NaiveDate) -> Result<Option<RateObservation>, PagesError> {
        Ok(self
            .partition(date.year())?
            .and_then(|p| p.get(date).cloned()))
    }

    /// Inclusive date range, ascending. Nothing is loaded until the result is iterated.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> RangeQuery<'_> {
        RangeQuery {
            store: self,
            start,
            end,
        }
    }

    pub fn latest(&self) -> Result<Option<RateObservation>, PagesError> {
        for year in self.years().into_iter().rev() {
            if let Some(last) = self.partition(year)?.and_then(|p| p.last().cloned()) {
                return Ok(Some(last));
            }
        }
        Ok(None)
    }

    pub fn earliest(&self) -> Result<Option<RateObservation>, PagesError> {
        for year in self.years() {
            if let Some(first) = self.partition(year)?.and_then(|p| p.first().cloned()) {
                return Ok(Some(first));
            }
        }
        Ok(None)
    }

    pub fn total_records(&self) -> Result<usize, PagesError> {
        let mut total = 0;
        for year in self.years() {
            total += self.partition(year)?.map_or(0, |p| p.len());
        }
        Ok(total)
    }

    /// Every currency code that appears anywhere in the history.
    pub fn currencies(&self) -> Result<BTreeSet<String>, PagesError> {
        let mut all = BTreeSet::new();
        for year in self.years() {
            if let Some(p) = self.partition(year)? {
                all.extend(p.currencies());
            }
        }
        Ok(all)
    }

    /// Inserts the observation for its date, or replaces the existing one wholesale.
    ///
    /// Invalid observations fail with a validation error before anything is written.
    pub fn upsert(&self, observation: RateObservation) -> Result<UpsertOutcome, PagesError> {
        observation.validate()?;

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let year = observation.date.year();
        let date = observation.date;

        let mut next = self.partition_for_write(year)?;
        let outcome = next.upsert(observation)?;
        self.commit_partition(next)?;

        log::debug!("Store {:?} observation for {}", outcome, date);
        Ok(outcome)
    }

    /// Bulk variant of [`upsert`](Self::upsert): validates everything up front,
    /// then rewrites each touched partition once.
    pub fn upsert_many<I>(&self, observations: I) -> Result<usize, PagesError>
    where
        I: IntoIterator<Item = RateObservation>,
    {
        let mut by_year: BTreeMap<i32, Vec<RateObservation>> = BTreeMap::new();
        for observation in observations {
            observation.validate()?;
            by_year
                .entry(observation.date.year())
                .or_default()
                .push(observation);
        }

        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut count = 0;

        for (year, batch) in by_year {
            let mut next = self.partition_for_write(year)?;
            for observation in batch {
                next.upsert(observation)?;
                count += 1;
            }
            self.commit_partition(next)?;
        }

        Ok(count)
    }

    /// Ensures a (possibly empty) partition file exists for `year`.
    pub fn append_year_partition(&self, year: i32) -> Result<Arc<YearPartition>, PagesError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = self.partition(year)? {
            return Ok(existing);
        }
        self.commit_partition(YearPartition::new(year))
    }

    /// Puts back a partition captured with [`partition`](Self::partition)
    /// before a write. `None` removes the year again.
    pub fn restore_partition(
        &self,
        year: i32,
        previous: Option<Arc<YearPartition>>,
    ) -> Result<(), PagesError> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        match previous {
            Some(partition) => {
                self.commit_partition((*partition).clone())?;
            }
            None => {
                match fs::remove_file(self.partition_path(year)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                self.index_mut().remove(&year);
            }
        }

        log::debug!("Restored partition {}", year);
        Ok(())
    }

    // --- Helpers ---

    fn partition_path(&self, year: i32) -> PathBuf {
        self.root.join(format!("{}.json", year))
    }

    fn partition_for_write(&self, year: i32) -> Result<YearPartition, PagesError> {
        Ok(match self.partition(year)? {
            Some(current) => (*current).clone(),
            None => YearPartition::new(year),
        })
    }

    fn commit_partition(&self, partition: YearPartition) -> Result<Arc<YearPartition>, PagesError> {
        let year = partition.year();
        atomic_write_json(&self.partition_path(year), &partition.to_file())?;

        let shared = Arc::new(partition);
        self.index_mut()
            .insert(year, Slot::Loaded(Arc::clone(&shared)));
        Ok(shared)
    }

    fn index(&self) -> RwLockReadGuard<'_, BTreeMap<i32, Slot>> {
        self.partitions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn index_mut(&self) -> RwLockWriteGuard<'_, BTreeMap<i32, Slot>> {
        self.partitions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Range queries ---

/// A restartable, lazily evaluated inclusive date range over a store.
#[derive(Debug, Clone, Copy)]
pub struct RangeQuery<'a> {
    store: &'a HistoricalStore,
    start: NaiveDate,
    end: NaiveDate,
}

impl<'a> RangeQuery<'a> {
    pub fn iter(&self) -> RangeIter<'a> {
        let years = if self.start > self.end {
            Vec::new()
        } else {
            let span = self.start.year()..=self.end.year();
            self.store
                .years()
                .into_iter()
                .filter(|y| span.contains(y))
                .collect()
        };

        RangeIter {
            store: self.store,
            start: self.start,
            end: self.end,
            years: years.into_iter(),
            current: None,
        }
    }

    /// Drains the range into a vector, failing on the first unreadable partition.
    pub fn to_vec(&self) -> Result<Vec<RateObservation>, PagesError> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for RangeQuery<'a> {
    type Item = Result<RateObservation, PagesError>;
    type IntoIter = RangeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct RangeIter<'a> {
    store: &'a HistoricalStore,
    start: NaiveDate,
    end: NaiveDate,
    years: std::vec::IntoIter<i32>,
    current: Option<(Arc<YearPartition>, std::ops::Range<usize>)>,
}

impl Iterator for RangeIter<'_> {
    type Item = Result<RateObservation, PagesError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((partition, positions)) = &mut self.current
                && let Some(i) = positions.next()
            {
                return Some(Ok(partition.observations()[i].clone()));
            }

            let year = self.years.next()?;
            match self.store.partition(year) {
                Ok(Some(partition)) => {
                    let all = partition.observations();
                    let lo = all.partition_point(|o| o.date < self.start);
                    let hi = all.partition_point(|o| o.date <= self.end);
                    self.current = Some((partition, lo..hi));
                }
                Ok(None) => self.current = None,
                Err(e) => {
                    // Stop after reporting; a half-read range is not resumable.
                    self.years = Vec::new().into_iter();
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }
    }
}
