//! The completion history store.
//!
//! Owns the persisted `{pomodoros, durations, timezones, version}` record.
//! Every read-modify-write sequence runs under one [`AsyncMutex`] so that
//! concurrent callers in the same process cannot drop each other's
//! updates. `all` and `clear` bypass the lock: one is a plain read, the
//! other an unconditional overwrite.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Offset, Utc, Weekday};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::calendar::{self, Clock, SystemClock};
use super::csv;
use super::record::{Completion, HistoryEntries, HistoryRecord, HISTORY_VERSION};
use super::stats::{self, Stats};
use crate::error::Result;
use crate::mutex::AsyncMutex;
use crate::storage::{Backend, Schema, StorageManager};

/// Schema of the persisted history record.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistorySchema;

impl Schema for HistorySchema {
    fn name(&self) -> &'static str {
        "history"
    }

    fn version(&self) -> u32 {
        HISTORY_VERSION
    }

    fn default_payload(&self) -> Value {
        json!({
            "pomodoros": [],
            "durations": [],
            "timezones": [],
            "version": HISTORY_VERSION,
        })
    }
}

/// Append-only log of completed pomodoros.
pub struct HistoryStore<C: Clock = SystemClock> {
    storage: StorageManager<HistorySchema>,
    mutex: AsyncMutex,
    clock: C,
    week_start: Weekday,
}

impl HistoryStore<SystemClock> {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<C: Clock> HistoryStore<C> {
    pub fn with_clock(backend: Arc<dyn Backend>, clock: C) -> Self {
        Self {
            storage: StorageManager::new(HistorySchema, backend),
            mutex: AsyncMutex::new(),
            clock,
            week_start: Weekday::Sun,
        }
    }

    /// Set the first day of the week used by [`HistoryStore::stats`].
    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Receive every payload the store persists.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.storage.subscribe()
    }

    /// The persisted, still-compacted payload, migrated if it was stale.
    pub async fn all(&self) -> Result<Value> {
        self.storage.get().await
    }

    /// Reset to the empty default.
    pub async fn clear(&self) -> Result<()> {
        self.storage.set(HistorySchema.default_payload()).await?;
        info!("history cleared");
        Ok(())
    }

    /// Record a completed pomodoro of `duration` seconds ending at `when`
    /// (now if `None`). Returns the number of completions today.
    pub async fn add_pomodoro(
        &self,
        duration: i64,
        when: Option<DateTime<FixedOffset>>,
    ) -> Result<usize> {
        self.mutex
            .exclusive(|| self.add_locked(duration, when))
            .await
    }

    /// Merge an exported payload into the store.
    ///
    /// Entries whose timestamp is already present are skipped. Returns the
    /// number of entries inserted. Nothing is written if either payload
    /// fails validation.
    pub async fn merge(&self, imported: &Value) -> Result<usize> {
        self.mutex.exclusive(|| self.merge_locked(imported)).await
    }

    /// Counts, averages and the daily histogram, with `since` bounding the
    /// period count and the histogram.
    pub async fn stats(&self, since: DateTime<Utc>) -> Result<Stats> {
        self.mutex.exclusive(|| self.stats_locked(since)).await
    }

    /// Completions since local midnight.
    ///
    /// Pass an already-loaded timestamp sequence to skip the backend read.
    pub async fn count_today(&self, pomodoros: Option<&[i64]>) -> Result<usize> {
        self.mutex
            .exclusive(|| self.count_today_locked(pomodoros))
            .await
    }

    /// Render the whole history as CSV.
    pub async fn to_csv(&self) -> Result<String> {
        let entries = self.load().await?.decompress()?;
        csv::render(&entries)
    }

    async fn load(&self) -> Result<HistoryRecord> {
        let payload = self.storage.get().await?;
        let record = HistoryRecord::from_value(&payload)?;
        record.validate()?;
        Ok(record)
    }

    async fn save(&self, record: &HistoryRecord) -> Result<()> {
        record.validate()?;
        self.storage.set(record.to_value()?).await
    }

    async fn add_locked(
        &self,
        duration: i64,
        when: Option<DateTime<FixedOffset>>,
    ) -> Result<usize> {
        let mut record = self.load().await?;
        let when = when.unwrap_or_else(|| self.now_fixed());
        let completion = Completion::at(&when, duration);

        if !record.insert_sorted(completion) {
            debug!(
                timestamp = completion.timestamp,
                "out-of-order completion, re-encoded history"
            );
        }

        self.save(&record).await?;
        Ok(self.count_today_in(&record.pomodoros))
    }

    async fn merge_locked(&self, imported: &Value) -> Result<usize> {
        let existing = self.load().await?;
        let mut entries = existing.decompress()?;
        let importing = HistoryEntries::from_value(imported)?;

        let count = entries.merge(&importing);
        let merged = entries.compress(existing.version)?;
        self.save(&merged).await?;

        info!(
            inserted = count,
            skipped = importing.len() - count,
            "history merged"
        );
        Ok(count)
    }

    async fn stats_locked(&self, since: DateTime<Utc>) -> Result<Stats> {
        let record = self.load().await?;
        Ok(stats::compute(
            &record.pomodoros,
            &self.clock.now(),
            &since,
            self.week_start,
        )?)
    }

    async fn count_today_locked(&self, pomodoros: Option<&[i64]>) -> Result<usize> {
        match pomodoros {
            Some(pomodoros) => Ok(self.count_today_in(pomodoros)),
            None => {
                let record = self.load().await?;
                if record.is_empty() {
                    return Ok(0);
                }
                Ok(self.count_today_in(&record.pomodoros))
            }
        }
    }

    fn count_today_in(&self, pomodoros: &[i64]) -> usize {
        stats::count_since(pomodoros, &calendar::start_of_day(&self.clock.now()))
    }

    fn now_fixed(&self) -> DateTime<FixedOffset> {
        let now = self.clock.now();
        now.with_timezone(&now.offset().fix())
    }
}
