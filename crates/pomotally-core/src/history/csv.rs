//! Tabular export of the completion history.

use super::calendar;
use super::record::HistoryEntries;
use crate::error::{CoreError, Field, HistoryError};

pub const HEADER: [&str; 6] = [
    "End (ISO 8601)",
    "End Date",
    "End Time (24 Hour)",
    "End Timestamp (Unix)",
    "End Timezone (UTC Offset Minutes)",
    "Duration (Seconds)",
];

/// Render one header row plus one row per completion.
///
/// Times are rendered in the offset each completion was recorded in, and
/// the offset column is UTC-relative (the negation of the stored offset).
pub fn render(entries: &HistoryEntries) -> Result<String, CoreError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;

    for (index, completion) in entries.iter().enumerate() {
        let end = completion.end_time().ok_or_else(|| {
            let field = match calendar::from_minutes(completion.timestamp) {
                Some(_) => Field::Timezones,
                None => Field::Pomodoros,
            };
            HistoryError::InvalidElement { field, index }
        })?;

        writer
            .write_record([
                end.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string(),
                end.format("%Y-%m-%d").to_string(),
                end.format("%H:%M:%S").to_string(),
                end.timestamp().to_string(),
                (-completion.timezone).to_string(),
                completion.duration.to_string(),
            ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        CoreError::Csv(csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e,
        )))
    })
}
