//! Run-length encoding for highly repetitive integer sequences.
//!
//! Durations and timezone offsets rarely change between completions, so
//! they are persisted as runs of `[value, count]` pairs instead of dense
//! arrays. [`Rle::append`] extends the trailing run in place, which keeps the
//! common "record one more pomodoro" path O(1).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Field, HistoryError};

/// A single run: `value` repeated `count` times.
///
/// Serialized as a two-element array `[value, count]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, u64)", into = "(i64, u64)")]
pub struct Run {
    pub value: i64,
    pub count: u64,
}

impl From<(i64, u64)> for Run {
    fn from((value, count): (i64, u64)) -> Self {
        Self { value, count }
    }
}

impl From<Run> for (i64, u64) {
    fn from(run: Run) -> Self {
        (run.value, run.count)
    }
}

/// Run-length encoded integer sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rle {
    runs: Vec<Run>,
}

impl Rle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `values` into runs.
    pub fn compress(values: &[i64]) -> Self {
        let mut rle = Self::new();
        for &value in values {
            rle.append(value);
        }
        rle
    }

    /// Expand back into the dense sequence.
    pub fn decompress(&self) -> Vec<i64> {
        let mut values = Vec::with_capacity(self.checked_len().unwrap_or(0));
        values.extend(self.iter());
        values
    }

    /// Extend the logical sequence by one value.
    ///
    /// Only the trailing run is touched: it grows when `value` repeats it,
    /// otherwise a new run is started.
    pub fn append(&mut self, value: i64) {
        match self.runs.last_mut() {
            Some(last) if last.value == value => last.count += 1,
            _ => self.runs.push(Run { value, count: 1 }),
        }
    }

    /// Iterate over the decoded values without allocating.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.runs
            .iter()
            .flat_map(|run| std::iter::repeat(run.value).take(run.count as usize))
    }

    /// Length of the decoded sequence, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    /// Length of the decoded sequence, or `None` if it does not fit a
    /// `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.runs.iter().try_fold(0usize, |total, run| {
            total.checked_add(usize::try_from(run.count).ok()?)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Parse an encoded field out of an untrusted JSON payload.
    ///
    /// The field must be an array of `[value, count]` pairs where both
    /// members are integers and `count` is at least one.
    pub fn from_value(field: Field, value: &Value) -> Result<Self, HistoryError> {
        let entries = value.as_array().ok_or_else(|| HistoryError::InvalidShape {
            field,
            reason: "expected an array of runs".into(),
        })?;

        let mut runs = Vec::with_capacity(entries.len());
        let mut offset = 0usize;
        for (i, entry) in entries.iter().enumerate() {
            let pair = match entry.as_array() {
                Some(pair) if pair.len() == 2 => pair,
                _ => {
                    return Err(HistoryError::InvalidShape {
                        field,
                        reason: format!("run {i} is not a [value, count] pair"),
                    })
                }
            };

            let value = super::record::as_integer(&pair[0])
                .ok_or(HistoryError::InvalidElement { field, index: offset })?;
            let count = super::record::as_integer(&pair[1])
                .and_then(|count| u64::try_from(count).ok())
                .filter(|&count| count > 0)
                .ok_or_else(|| HistoryError::InvalidShape {
                    field,
                    reason: format!("run {i} has an invalid count"),
                })?;

            offset = usize::try_from(count)
                .ok()
                .and_then(|count| offset.checked_add(count))
                .ok_or_else(|| HistoryError::InvalidShape {
                    field,
                    reason: format!("run {i} overflows the decoded length"),
                })?;
            runs.push(Run { value, count });
        }

        Ok(Self { runs })
    }
}

impl FromIterator<i64> for Rle {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut rle = Self::new();
        for value in iter {
            rle.append(value);
        }
        rle
    }
}
