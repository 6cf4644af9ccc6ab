//! History store integration tests.
//!
//! Drives the store end to end through both backends with a fixed clock.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use pomotally_core::history::{calendar, HistorySchema};
use pomotally_core::storage::{Backend, Schema, HISTORY_AREA};
use pomotally_core::{
    CoreError, FixedClock, HistoryError, HistoryRecord, HistoryStore, MemoryBackend,
    SqliteDatabase,
};
use proptest::prelude::*;
use serde_json::json;

fn at(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn memory_store(now: &str) -> HistoryStore<FixedClock> {
    HistoryStore::with_clock(Arc::new(MemoryBackend::new()), FixedClock::new(at(now)))
}

fn sqlite_store(db: &SqliteDatabase, now: &str) -> HistoryStore<FixedClock> {
    HistoryStore::with_clock(Arc::new(db.area(HISTORY_AREA)), FixedClock::new(at(now)))
}

async fn record(store: &HistoryStore<FixedClock>) -> HistoryRecord {
    HistoryRecord::from_value(&store.all().await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_out_of_order_add_scenario() {
    let db = SqliteDatabase::open_memory().unwrap();
    let store = sqlite_store(&db, "2024-01-01T12:00:00Z");
    let t0 = at("2024-01-01T09:00:00Z");
    let t1 = at("2024-01-01T08:00:00Z");

    store.add_pomodoro(1500, Some(t0)).await.unwrap();
    store.add_pomodoro(1500, Some(t1)).await.unwrap();

    let record = record(&store).await;
    assert_eq!(
        record.pomodoros,
        vec![calendar::minutes(&t1), calendar::minutes(&t0)]
    );
    let entries = record.decompress().unwrap();
    assert_eq!(entries.durations, vec![1500, 1500]);
    assert_eq!(entries.timezones, vec![0, 0]);
}

#[tokio::test]
async fn test_merge_scenario() {
    let store = memory_store("2024-01-01T12:00:00Z");
    store
        .merge(&json!({"pomodoros": [100], "durations": [[1500, 1]], "timezones": [[0, 1]]}))
        .await
        .unwrap();

    let count = store
        .merge(&json!({"pomodoros": [100, 200], "durations": [[1500, 2]], "timezones": [[0, 2]]}))
        .await
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(record(&store).await.pomodoros, vec![100, 200]);
}

#[tokio::test]
async fn test_merge_into_itself_inserts_nothing() {
    let store = memory_store("2024-01-01T12:00:00Z");
    for hour in [8, 9, 11] {
        let when = at(&format!("2024-01-01T{hour:02}:00:00Z"));
        store.add_pomodoro(1500, Some(when)).await.unwrap();
    }

    let exported = store.all().await.unwrap();
    assert_eq!(store.merge(&exported).await.unwrap(), 0);
    assert_eq!(store.all().await.unwrap(), exported);
}

#[tokio::test]
async fn test_disjoint_merge_is_sorted_union() {
    let store = memory_store("2024-01-01T12:00:00Z");
    store
        .merge(&json!({"pomodoros": [10, 30, 50], "durations": [[1500, 3]], "timezones": [[0, 3]]}))
        .await
        .unwrap();

    let count = store
        .merge(&json!({
            "pomodoros": [20, 40, 60],
            "durations": [[900, 1], [600, 2]],
            "timezones": [[-60, 3]]
        }))
        .await
        .unwrap();
    assert_eq!(count, 3);

    let entries = record(&store).await.decompress().unwrap();
    assert_eq!(entries.pomodoros, vec![10, 20, 30, 40, 50, 60]);
    assert_eq!(entries.durations, vec![1500, 900, 1500, 600, 1500, 600]);
    assert_eq!(entries.timezones, vec![0, -60, 0, -60, 0, -60]);
}

#[tokio::test]
async fn test_invalid_import_is_rejected_without_writing() {
    let db = SqliteDatabase::open_memory().unwrap();
    let store = sqlite_store(&db, "2024-01-01T12:00:00Z");
    store.add_pomodoro(1500, None).await.unwrap();
    let before = store.all().await.unwrap();

    let cases = [
        json!({"durations": [[1500, 1]], "timezones": [[0, 1]]}),
        json!({"pomodoros": 5, "durations": [[1500, 1]], "timezones": [[0, 1]]}),
        json!({"pomodoros": [1.5], "durations": [[1500, 1]], "timezones": [[0, 1]]}),
        json!({"pomodoros": [1, 2], "durations": [[1500, 2]], "timezones": [[0, 1]]}),
        json!({"pomodoros": [1], "durations": [[1500, 9_000_000_000_000_000_000i64]], "timezones": [[0, 1]]}),
        json!({
            "pomodoros": [1],
            "durations": [[1500, 1]],
            "timezones": [[0, i64::MAX], [60, i64::MAX], [0, i64::MAX]]
        }),
    ];
    for imported in cases {
        let err = store.merge(&imported).await.unwrap_err();
        assert!(matches!(err, CoreError::History(_)), "{imported}: {err}");
        assert_eq!(store.all().await.unwrap(), before);
    }
}

#[tokio::test]
async fn test_stored_payload_without_version_is_fatal() {
    let db = SqliteDatabase::open_memory().unwrap();
    let area = db.area(HISTORY_AREA);
    area.set(&json!({"pomodoros": [], "durations": [], "timezones": []}))
        .await
        .unwrap();

    let store = sqlite_store(&db, "2024-01-01T12:00:00Z");
    let err = store.add_pomodoro(1500, None).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::History(HistoryError::VersionIntegrity(_))
    ));
}

#[tokio::test]
async fn test_history_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("pomotally.db");

    {
        let db = SqliteDatabase::open(&path).unwrap();
        let store = sqlite_store(&db, "2024-01-01T12:00:00Z");
        store.add_pomodoro(1500, Some(at("2024-01-01T09:00:00Z"))).await.unwrap();
    }

    let db = SqliteDatabase::open(&path).unwrap();
    let store = sqlite_store(&db, "2024-01-01T12:00:00Z");
    assert_eq!(store.count_today(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_single_entry_from_today_stats() {
    let store = memory_store("2024-05-15T12:00:00+02:00");
    store.add_pomodoro(1500, Some(at("2024-05-15T08:30:00+02:00"))).await.unwrap();

    let since = at("2024-05-01T00:00:00Z").with_timezone(&Utc);
    let stats = store.stats(since).await.unwrap();
    assert_eq!(stats.day, 1);
    assert!(stats.week >= 1);
    assert!(stats.month >= 1);
    assert_eq!(stats.period, 1);
    assert_eq!(stats.total, 1);
    assert_eq!(stats.daily.values().sum::<usize>(), 1);
    assert_eq!(stats.pomodoros.len(), 1);
    assert_eq!(stats.day_average, 1.0);
}

#[tokio::test]
async fn test_empty_history_stats() {
    let store = memory_store("2024-05-15T12:00:00Z");
    let stats = store.stats(at("2024-01-01T00:00:00Z").with_timezone(&Utc)).await.unwrap();
    assert_eq!((stats.day, stats.week, stats.month, stats.period, stats.total), (0, 0, 0, 0, 0));
    assert!(stats.daily.is_empty());
    assert_eq!(stats.day_average, 0.0);
}

#[tokio::test]
async fn test_csv_single_entry() {
    let store = memory_store("2024-01-01T12:00:00Z");
    store.add_pomodoro(1500, Some(at("2024-01-01T09:00:00Z"))).await.unwrap();

    let csv = store.to_csv().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("End (ISO 8601),"));
    assert_eq!(lines[1].rsplit(',').next(), Some("1500"));
}

#[tokio::test]
async fn test_clear_writes_versioned_default() {
    let db = SqliteDatabase::open_memory().unwrap();
    let store = sqlite_store(&db, "2024-01-01T12:00:00Z");
    store.add_pomodoro(1500, None).await.unwrap();
    store.clear().await.unwrap();

    assert_eq!(
        db.area(HISTORY_AREA).get().await.unwrap(),
        HistorySchema.default_payload()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_not_lost() {
    let store = Arc::new(memory_store("2024-01-01T12:00:00Z"));
    let base = at("2024-01-01T00:00:00Z");

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let store = Arc::clone(&store);
            let when = base + Duration::minutes(i * 7 % 32);
            tokio::spawn(async move { store.add_pomodoro(1500, Some(when)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let record = record(&store).await;
    assert_eq!(record.pomodoros.len(), 32);
    assert!(record.pomodoros.windows(2).all(|w| w[0] <= w[1]));
    record.validate().unwrap();
}

proptest! {
    #[test]
    fn prop_adds_keep_history_sorted_and_aligned(
        offsets in proptest::collection::vec(0i64..10_000, 1..40),
        durations in proptest::collection::vec(prop_oneof![Just(1500i64), Just(300), Just(900)], 40),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let record = runtime.block_on(async {
            let store = memory_store("2024-02-01T00:00:00Z");
            let base = at("2024-01-01T00:00:00+01:00");
            for (offset, duration) in offsets.iter().zip(&durations) {
                store
                    .add_pomodoro(*duration, Some(base + Duration::minutes(*offset)))
                    .await
                    .unwrap();
            }
            record(&store).await
        });

        prop_assert!(record.pomodoros.windows(2).all(|w| w[0] <= w[1]));
        let entries = record.decompress().unwrap();
        prop_assert_eq!(entries.durations.len(), offsets.len());
        prop_assert_eq!(entries.timezones.len(), offsets.len());
        prop_assert!(entries.timezones.iter().all(|&tz| tz == -60));

        // Every (timestamp, duration) pair that went in comes out.
        let mut expected: Vec<(i64, i64)> = offsets
            .iter()
            .zip(&durations)
            .map(|(offset, duration)| {
                (calendar::minutes(&(at("2024-01-01T00:00:00+01:00") + Duration::minutes(*offset))), *duration)
            })
            .collect();
        let mut actual: Vec<(i64, i64)> = entries
            .pomodoros
            .iter()
            .copied()
            .zip(entries.durations.iter().copied())
            .collect();
        expected.sort_unstable();
        actual.sort_unstable();
        prop_assert_eq!(actual, expected);
    }
}
