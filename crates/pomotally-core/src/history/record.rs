//! Persisted history record and its decompressed form.
//!
//! A completion is stored as three index-aligned sequences: timestamps in
//! minutes since the epoch, durations in seconds, and timezone offsets in
//! minutes (`UTC - local`, the browser `getTimezoneOffset` convention).
//! Only `durations` and `timezones` are run-length encoded.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;

use super::rle::Rle;
use super::search::search;
use crate::error::{Field, HistoryError};

/// Schema version of the persisted history record.
pub const HISTORY_VERSION: u32 = 1;

/// One completed pomodoro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Minutes since the Unix epoch.
    pub timestamp: i64,
    /// Seconds.
    pub duration: i64,
    /// Minutes, `UTC - local`.
    pub timezone: i64,
}

impl Completion {
    /// Build a completion ending at `when`, keeping its offset.
    pub fn at(when: &DateTime<FixedOffset>, duration: i64) -> Self {
        Self {
            timestamp: when.timestamp().div_euclid(60),
            duration,
            timezone: i64::from(-when.offset().local_minus_utc() / 60),
        }
    }

    /// The end time rendered in the offset it was recorded in.
    ///
    /// Returns `None` for offsets or timestamps chrono cannot represent.
    pub fn end_time(&self) -> Option<DateTime<FixedOffset>> {
        let offset_secs = i32::try_from(self.timezone.checked_mul(-60)?).ok()?;
        let offset = FixedOffset::east_opt(offset_secs)?;
        let utc = DateTime::from_timestamp(self.timestamp.checked_mul(60)?, 0)?;
        Some(utc.with_timezone(&offset))
    }
}

/// The persisted, compacted form of the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub pomodoros: Vec<i64>,
    pub durations: Rle,
    pub timezones: Rle,
    pub version: u32,
}

impl Default for HistoryRecord {
    fn default() -> Self {
        Self {
            pomodoros: Vec::new(),
            durations: Rle::new(),
            timezones: Rle::new(),
            version: HISTORY_VERSION,
        }
    }
}

impl HistoryRecord {
    /// Parse and validate a stored payload.
    ///
    /// # Errors
    /// Returns a [`HistoryError`] if a field is missing, malformed, holds a
    /// non-integer element, or if the version is absent.
    pub fn from_value(value: &Value) -> Result<Self, HistoryError> {
        let (pomodoros, durations, timezones) = parse_fields(value)?;
        check_aligned(pomodoros.len(), durations.len(), timezones.len())?;
        let version = value
            .get("version")
            .and_then(as_integer)
            .and_then(|v| u32::try_from(v).ok())
            .filter(|&v| v > 0)
            .ok_or_else(|| HistoryError::VersionIntegrity("Missing version".into()))?;

        Ok(Self {
            pomodoros,
            durations,
            timezones,
            version,
        })
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn len(&self) -> usize {
        self.pomodoros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pomodoros.is_empty()
    }

    /// Check that both encoded fields decode to as many entries as there
    /// are timestamps, without decompressing them.
    pub fn validate(&self) -> Result<(), HistoryError> {
        check_aligned(
            self.pomodoros.len(),
            self.durations.len(),
            self.timezones.len(),
        )
    }

    /// Expand the encoded fields, checking that all three sequences align.
    pub fn decompress(&self) -> Result<HistoryEntries, HistoryError> {
        self.validate()?;
        Ok(HistoryEntries {
            pomodoros: self.pomodoros.clone(),
            durations: self.durations.decompress(),
            timezones: self.timezones.decompress(),
        })
    }

    /// Insert `completion` at its sorted position.
    ///
    /// Appending past the end only extends the trailing runs. An insert
    /// before the end (clock went backwards, or an explicit past time)
    /// re-encodes both run-length fields. Returns `true` for the fast path.
    ///
    /// A completion in the same minute as existing ones goes after them.
    pub fn insert_sorted(&mut self, completion: Completion) -> bool {
        let index = search(&self.pomodoros, &completion.timestamp.saturating_add(1));

        if index >= self.pomodoros.len() {
            self.durations.append(completion.duration);
            self.timezones.append(completion.timezone);
            self.pomodoros.push(completion.timestamp);
            return true;
        }

        let mut durations = self.durations.decompress();
        durations.insert(index, completion.duration);
        self.durations = Rle::compress(&durations);

        let mut timezones = self.timezones.decompress();
        timezones.insert(index, completion.timezone);
        self.timezones = Rle::compress(&timezones);

        self.pomodoros.insert(index, completion.timestamp);
        false
    }
}

/// Decompressed history: three dense, index-aligned sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryEntries {
    pub pomodoros: Vec<i64>,
    pub durations: Vec<i64>,
    pub timezones: Vec<i64>,
}

impl HistoryEntries {
    /// Validate and decompress an untrusted payload, e.g. an import.
    ///
    /// Unlike [`HistoryRecord::from_value`], no version is required.
    pub fn from_value(value: &Value) -> Result<Self, HistoryError> {
        let (pomodoros, durations, timezones) = parse_fields(value)?;
        check_aligned(pomodoros.len(), durations.len(), timezones.len())?;
        Ok(Self {
            pomodoros,
            durations: durations.decompress(),
            timezones: timezones.decompress(),
        })
    }

    pub fn len(&self) -> usize {
        self.pomodoros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pomodoros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Completion> + '_ {
        self.pomodoros
            .iter()
            .zip(&self.durations)
            .zip(&self.timezones)
            .map(|((&timestamp, &duration), &timezone)| Completion {
                timestamp,
                duration,
                timezone,
            })
    }

    /// Re-encode into the persisted form.
    pub fn compress(&self, version: u32) -> Result<HistoryRecord, HistoryError> {
        self.check_lengths()?;
        Ok(HistoryRecord {
            pomodoros: self.pomodoros.clone(),
            durations: Rle::compress(&self.durations),
            timezones: Rle::compress(&self.timezones),
            version,
        })
    }

    /// Merge `importing` into `self`, returning how many entries were added.
    ///
    /// Each imported entry is placed at its sorted position in the running
    /// sequence. An entry whose timestamp already exists is the same
    /// completion and is skipped, including duplicates within `importing`.
    pub fn merge(&mut self, importing: &HistoryEntries) -> usize {
        let mut count = 0;
        for completion in importing.iter() {
            let index = search(&self.pomodoros, &completion.timestamp);
            if self.pomodoros.get(index) == Some(&completion.timestamp) {
                continue;
            }

            count += 1;
            self.pomodoros.insert(index, completion.timestamp);
            self.durations.insert(index, completion.duration);
            self.timezones.insert(index, completion.timezone);
        }
        count
    }

    fn check_lengths(&self) -> Result<(), HistoryError> {
        check_aligned(
            self.pomodoros.len(),
            self.durations.len(),
            self.timezones.len(),
        )
    }
}

fn check_aligned(expected: usize, durations: usize, timezones: usize) -> Result<(), HistoryError> {
    for (field, len) in [(Field::Durations, durations), (Field::Timezones, timezones)] {
        if len != expected {
            return Err(HistoryError::InvalidShape {
                field,
                reason: format!("mismatched length: {len} entries for {expected} pomodoros"),
            });
        }
    }
    Ok(())
}

/// Interpret a JSON number as an integer; integral floats are accepted.
pub(crate) fn as_integer(value: &Value) -> Option<i64> {
    if let Some(v) = value.as_i64() {
        return Some(v);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn field<'a>(payload: &'a Value, field: Field) -> Result<&'a Value, HistoryError> {
    match payload.get(field.key()) {
        None | Some(Value::Null) => Err(HistoryError::MissingData { field }),
        Some(value) => Ok(value),
    }
}

fn parse_fields(payload: &Value) -> Result<(Vec<i64>, Rle, Rle), HistoryError> {
    if !payload.is_object() {
        return Err(HistoryError::MissingData {
            field: Field::Pomodoros,
        });
    }

    let pomodoros_value = field(payload, Field::Pomodoros)?;
    let durations_value = field(payload, Field::Durations)?;
    let timezones_value = field(payload, Field::Timezones)?;

    let pomodoros = pomodoros_value
        .as_array()
        .ok_or_else(|| HistoryError::InvalidShape {
            field: Field::Pomodoros,
            reason: "expected an array of timestamps".into(),
        })?
        .iter()
        .enumerate()
        .map(|(index, v)| {
            as_integer(v).ok_or(HistoryError::InvalidElement {
                field: Field::Pomodoros,
                index,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let durations = Rle::from_value(Field::Durations, durations_value)?;
    let timezones = Rle::from_value(Field::Timezones, timezones_value)?;

    Ok((pomodoros, durations, timezones))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries(pomodoros: &[i64]) -> HistoryEntries {
        HistoryEntries {
            pomodoros: pomodoros.to_vec(),
            durations: vec![1500; pomodoros.len()],
            timezones: vec![0; pomodoros.len()],
        }
    }

    #[test]
    fn completion_keeps_recorded_offset() {
        let when = DateTime::parse_from_rfc3339("2024-01-01T09:30:59+02:00").unwrap();
        let completion = Completion::at(&when, 1500);
        assert_eq!(completion.timestamp, when.timestamp() / 60);
        assert_eq!(completion.timezone, -120);

        let end = completion.end_time().unwrap();
        assert_eq!(end.offset().local_minus_utc(), 7200);
        assert_eq!(end.to_rfc3339(), "2024-01-01T09:30:00+02:00");
    }

    #[test]
    fn record_requires_version() {
        let err = HistoryRecord::from_value(&json!({
            "pomodoros": [], "durations": [], "timezones": []
        }))
        .unwrap_err();
        assert!(matches!(err, HistoryError::VersionIntegrity(_)));
    }

    #[test]
    fn missing_fields_are_reported_in_order() {
        let err = HistoryEntries::from_value(&json!({"durations": [], "timezones": []})).unwrap_err();
        assert_eq!(err, HistoryError::MissingData { field: Field::Pomodoros });

        let err = HistoryEntries::from_value(&json!({"pomodoros": [], "timezones": []})).unwrap_err();
        assert_eq!(err, HistoryError::MissingData { field: Field::Durations });

        let err = HistoryEntries::from_value(&json!(null)).unwrap_err();
        assert_eq!(err, HistoryError::MissingData { field: Field::Pomodoros });
    }

    #[test]
    fn mismatched_lengths_are_invalid_shape() {
        let err = HistoryEntries::from_value(&json!({
            "pomodoros": [1, 2],
            "durations": [[1500, 1]],
            "timezones": [[0, 2]]
        }))
        .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidShape { field: Field::Durations, .. }));
    }

    #[test]
    fn non_integer_timestamp_is_invalid_element() {
        let err = HistoryEntries::from_value(&json!({
            "pomodoros": [1, 2.5],
            "durations": [[1500, 2]],
            "timezones": [[0, 2]]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            HistoryError::InvalidElement {
                field: Field::Pomodoros,
                index: 1
            }
        );
    }

    #[test]
    fn insert_sorted_appends_in_order() {
        let mut record = HistoryRecord::default();
        for ts in [10, 20, 20, 30] {
            assert!(record.insert_sorted(Completion { timestamp: ts, duration: 1500, timezone: 0 }));
        }
        assert_eq!(record.pomodoros, vec![10, 20, 20, 30]);
        assert_eq!(record.durations.runs().len(), 1);
    }

    #[test]
    fn same_minute_completion_goes_after_existing_one() {
        let mut record = HistoryRecord::default();
        record.insert_sorted(Completion { timestamp: 20, duration: 1500, timezone: 0 });
        let fast = record.insert_sorted(Completion { timestamp: 20, duration: 300, timezone: -60 });

        assert!(fast);
        let entries = record.decompress().unwrap();
        assert_eq!(entries.durations, vec![1500, 300]);
        assert_eq!(entries.timezones, vec![0, -60]);
    }

    #[test]
    fn same_minute_splice_keeps_arrival_order() {
        let mut record = HistoryRecord::default();
        for (ts, duration) in [(10, 1500), (20, 1500), (30, 1500), (10, 300)] {
            record.insert_sorted(Completion { timestamp: ts, duration, timezone: 0 });
        }
        let entries = record.decompress().unwrap();
        assert_eq!(entries.pomodoros, vec![10, 10, 20, 30]);
        assert_eq!(entries.durations, vec![1500, 300, 1500, 1500]);
    }

    #[test]
    fn huge_run_counts_are_rejected_before_decoding() {
        let err = HistoryEntries::from_value(&json!({
            "pomodoros": [1],
            "durations": [[1500, 9_000_000_000_000_000_000i64]],
            "timezones": [[0, 1]]
        }))
        .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidShape { field: Field::Durations, .. }));

        let err = HistoryRecord::from_value(&json!({
            "pomodoros": [1],
            "durations": [[1500, 1]],
            "timezones": [[0, 1_000_000_000]],
            "version": 1
        }))
        .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidShape { field: Field::Timezones, .. }));
    }

    #[test]
    fn overflowing_run_counts_are_invalid_shape() {
        let huge = i64::MAX;
        let err = HistoryEntries::from_value(&json!({
            "pomodoros": [1],
            "durations": [[1500, huge], [300, huge], [1500, huge]],
            "timezones": [[0, 1]]
        }))
        .unwrap_err();
        assert!(matches!(err, HistoryError::InvalidShape { field: Field::Durations, .. }));
    }

    #[test]
    fn insert_sorted_splices_out_of_order_entry() {
        let mut record = HistoryRecord::default();
        record.insert_sorted(Completion { timestamp: 10, duration: 1500, timezone: 0 });
        record.insert_sorted(Completion { timestamp: 30, duration: 1500, timezone: 0 });
        let fast = record.insert_sorted(Completion { timestamp: 20, duration: 300, timezone: -60 });

        assert!(!fast);
        let entries = record.decompress().unwrap();
        assert_eq!(entries.pomodoros, vec![10, 20, 30]);
        assert_eq!(entries.durations, vec![1500, 300, 1500]);
        assert_eq!(entries.timezones, vec![0, -60, 0]);
    }

    #[test]
    fn merge_skips_existing_timestamps() {
        let mut existing = entries(&[100]);
        let count = existing.merge(&entries(&[100, 200]));
        assert_eq!(count, 1);
        assert_eq!(existing.pomodoros, vec![100, 200]);
    }

    #[test]
    fn merge_with_self_is_noop() {
        let mut existing = entries(&[1, 5, 9]);
        let copy = existing.clone();
        assert_eq!(existing.merge(&copy), 0);
        assert_eq!(existing, copy);
    }

    #[test]
    fn merge_interleaves_disjoint_histories() {
        let mut existing = entries(&[2, 4, 6]);
        let mut importing = entries(&[7, 1, 5, 3]);
        importing.durations = vec![70, 10, 50, 30];

        assert_eq!(existing.merge(&importing), 4);
        assert_eq!(existing.pomodoros, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(existing.durations, vec![10, 1500, 30, 1500, 50, 1500, 70]);
    }

    #[test]
    fn merge_drops_duplicates_within_import() {
        let mut existing = HistoryEntries::default();
        assert_eq!(existing.merge(&entries(&[3, 3, 4])), 2);
        assert_eq!(existing.pomodoros, vec![3, 4]);
    }
}
