//! Completion history: codec, search, record, statistics and the store.

pub mod calendar;
pub mod csv;
pub mod record;
pub mod rle;
pub mod search;
pub mod stats;
mod store;

pub use calendar::{Clock, FixedClock, SystemClock};
pub use record::{Completion, HistoryEntries, HistoryRecord, HISTORY_VERSION};
pub use rle::{Rle, Run};
pub use search::search;
pub use stats::Stats;
pub use store::{HistorySchema, HistoryStore};
