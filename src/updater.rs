use crate::exceptions::{FetchError, MergeError, PagesError};
use crate::fs::RunLock;
use crate::historystore::HistoricalStore;
use crate::models::{PublishResult, UpdateAction};
use crate::publisher::Publisher;
use crate::source::RateSource;
use chrono::{Datelike, NaiveDate};
use std::time::Duration;
use time::OffsetDateTime;

/// One publish cycle: fetch -> compare -> validate -> upsert -> publish.
///
/// The same entry point serves scheduled and manual triggers. Re-running for a
/// date whose rates did not change leaves the store untouched.
pub struct Updater<'a, S> {
    source: &'a S,
    store: &'a HistoricalStore,
    publisher: &'a Publisher,
    epsilon: f64,
    fetch_timeout: Duration,
}

impl<'a, S: RateSource> Updater<'a, S> {
    pub fn new(source: &'a S, store: &'a HistoricalStore, publisher: &'a Publisher) -> Self {
        Self {
            source,
            store,
            publisher,
            epsilon: crate::consts::DEFAULT_EPSILON,
            fetch_timeout: Duration::from_secs(crate::consts::DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Runs the cycle for `today`. The run lock must be held for the whole call.
    ///
    /// A failed publish puts the stored partition back, so a retry sees the
    /// day as new and publishes it.
    pub async fn run(&self, _lock: &RunLock, today: NaiveDate) -> Result<PublishResult, PagesError> {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.source.fetch(today))
            .await
            .map_err(|_| {
                FetchError::unavailable(format!(
                    "No response within {}s",
                    self.fetch_timeout.as_secs_f64()
                ))
            })??;

        fetched
            .validate()
            .map_err(MergeError::AbortedDueToValidation)?;

        let action = match self.store.get(today)? {
            None => UpdateAction::Inserted,
            Some(existing) if fetched.differs_from(&existing, self.epsilon) => {
                log::warn!("Rates for {} changed upstream, overwriting stored entry", today);
                UpdateAction::Corrected
            }
            Some(_) => UpdateAction::Unchanged,
        };

        let previous = if action == UpdateAction::Unchanged {
            None
        } else {
            let previous = self.store.partition(today.year())?;
            self.store.upsert(fetched)?;
            Some(previous)
        };
        log::info!("Rates for {}: {}", today, action);

        if action == UpdateAction::Unchanged && self.publisher.is_current(self.store)? {
            log::info!("Published artifacts already current, skipping publish");
            return Ok(PublishResult {
                date: today,
                action,
                published: None,
            });
        }

        match self.publisher.publish(self.store, OffsetDateTime::now_utc()) {
            Ok(report) => Ok(PublishResult {
                date: today,
                action,
                published: Some(report),
            }),
            Err(e) => {
                if let Some(previous) = previous {
                    match self.store.restore_partition(today.year(), previous) {
                        Ok(()) => log::warn!("Publish failed, stored rates for {} reverted", today),
                        Err(restore) => {
                            log::error!("Could not revert stored rates for {}: {}", today, restore)
                        }
                    }
                }
                Err(e)
            }
        }
    }
}
