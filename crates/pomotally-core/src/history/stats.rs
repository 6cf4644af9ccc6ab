//! Derived statistics over the completion timestamps.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

use super::calendar::{self, start_of_date};
use super::search::search;
use crate::error::{Field, HistoryError};

/// Average days per month used for the monthly average.
const DAYS_PER_MONTH: f64 = 365.25 / 12.0;

/// Completion counts and averages as of one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub day: usize,
    pub day_average: f64,
    pub week: usize,
    pub week_average: f64,
    pub month: usize,
    pub month_average: f64,
    /// Completions since the caller-supplied start of the period.
    pub period: usize,
    pub total: usize,
    /// Completions per local calendar day; days without any are absent.
    pub daily: BTreeMap<NaiveDate, usize>,
    pub pomodoros: Vec<DateTime<Utc>>,
}

/// Number of timestamps at or after `date`.
pub fn count_since<Tz: TimeZone>(pomodoros: &[i64], date: &DateTime<Tz>) -> usize {
    pomodoros.len() - search(pomodoros, &calendar::minutes(date))
}

/// Per-day completion counts from today back to `since`.
///
/// Walks backwards one local day at a time, turning the cumulative
/// `count_since(day)` into per-day deltas with one search per day.
pub fn daily_groups<Tz: TimeZone>(
    pomodoros: &[i64],
    now: &DateTime<Tz>,
    since: &DateTime<Utc>,
) -> BTreeMap<NaiveDate, usize> {
    let tz = now.timezone();
    let mut daily = BTreeMap::new();
    let mut base = 0;
    let mut date = now.date_naive();

    loop {
        let start = start_of_date(&tz, date);
        if start.with_timezone(&Utc) < *since {
            break;
        }

        let count = count_since(pomodoros, &start);
        if count > base {
            daily.insert(date, count - base);
            base = count;
        }

        match date.pred_opt() {
            Some(previous) => date = previous,
            None => break,
        }
    }

    daily
}

/// Compute [`Stats`] for an ascending timestamp sequence.
///
/// # Errors
/// `InvalidElement` naming the first timestamp that falls outside the
/// representable date range.
pub fn compute<Tz: TimeZone>(
    pomodoros: &[i64],
    now: &DateTime<Tz>,
    since: &DateTime<Utc>,
    week_start: Weekday,
) -> Result<Stats, HistoryError> {
    let total = pomodoros.len();
    let times = pomodoros
        .iter()
        .enumerate()
        .map(|(index, &minutes)| {
            calendar::from_minutes(minutes).ok_or(HistoryError::InvalidElement {
                field: Field::Pomodoros,
                index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let elapsed = times
        .first()
        .map(|&first| now.with_timezone(&Utc) - first)
        .unwrap_or_else(Duration::zero);
    let days = (elapsed.num_seconds() as f64 / 86_400.0).max(1.0);
    let weeks = (days / 7.0).max(1.0);
    let months = (days / DAYS_PER_MONTH).max(1.0);

    Ok(Stats {
        day: count_since(pomodoros, &calendar::start_of_day(now)),
        day_average: total as f64 / days,
        week: count_since(pomodoros, &calendar::start_of_week(now, week_start)),
        week_average: total as f64 / weeks,
        month: count_since(pomodoros, &calendar::start_of_month(now)),
        month_average: total as f64 / months,
        period: count_since(pomodoros, since),
        total,
        daily: daily_groups(pomodoros, now, since),
        pomodoros: times,
    })
}
