//! Wall clock and local calendar boundaries.
//!
//! Day, week and month counts are taken relative to local midnight in the
//! clock's timezone, so the clock carries its timezone along with "now".

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveTime,
    TimeZone, Weekday,
};

/// Source of the current time.
pub trait Clock: Send + Sync {
    type Tz: TimeZone + Send + Sync;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// The system clock in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    type Tz = FixedOffset;

    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }
}

/// Local midnight at the start of `date`.
///
/// Where midnight is skipped by a DST transition, the first instant of the
/// day is used instead.
pub fn start_of_date<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let shifted = midnight + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
        }
    }
}

pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    start_of_date(&now.timezone(), now.date_naive())
}

/// Start of the week containing `now`, weeks beginning on `week_start`.
pub fn start_of_week<Tz: TimeZone>(now: &DateTime<Tz>, week_start: Weekday) -> DateTime<Tz> {
    let today = now.date_naive();
    let back = (7 + today.weekday().num_days_from_sunday() - week_start.num_days_from_sunday()) % 7;
    start_of_date(&now.timezone(), today - Duration::days(i64::from(back)))
}

pub fn start_of_month<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let today = now.date_naive();
    let first = today.with_day(1).unwrap_or(today);
    start_of_date(&now.timezone(), first)
}

/// Minutes since the epoch, floored.
pub fn minutes<Tz: TimeZone>(when: &DateTime<Tz>) -> i64 {
    when.timestamp().div_euclid(60)
}

/// Inverse of [`minutes`].
pub fn from_minutes(minutes: i64) -> Option<DateTime<chrono::Utc>> {
    DateTime::from_timestamp(minutes.checked_mul(60)?, 0)
}
