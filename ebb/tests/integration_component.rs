//! Integration tests for the component lifecycle.
//!
//! These tests exercise the full path from opening a data directory through
//! appending, retention filtering, persistence across restarts, and shutdown.

use ebb::error::{AppenderError, StoreOpenError, StoreWriteError};
use ebb::{
    Component, ComponentOptions, Durability, EbbError, Exports, Labels, MockClock,
    RetentionConfig, Selector,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

const MINUTE: Duration = Duration::from_secs(60);

fn retention(ttl: Duration) -> RetentionConfig {
    RetentionConfig::new(ttl).unwrap()
}

fn open_at(path: &std::path::Path, clock: &Arc<MockClock>, ttl: Duration) -> Component {
    let options = ComponentOptions::new(path).with_clock(clock.clone());
    Component::open_with(options, retention(ttl)).unwrap()
}

fn cpu(host: &str) -> Labels {
    Labels::metric("cpu_usage", [("host", host)])
}

#[test]
fn test_five_minute_window() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(410_000));
    let component = open_at(temp_dir.path(), &clock, 5 * MINUTE);

    let mut app = component.new_appender();
    app.add(&cpu("web1"), 0, 1.0).unwrap();
    app.add(&cpu("web1"), 400_000, 2.0).unwrap();
    let outcome = app.commit().unwrap();

    assert_eq!(outcome.written, 1);
    assert_eq!(outcome.dropped, 1);

    let points = component
        .query(&Selector::exact(cpu("web1")), i64::MIN, i64::MAX)
        .unwrap()
        .points();
    assert_eq!(points, vec![(400_000, 2.0)]);

    let stats = component.stats();
    assert_eq!(stats.samples_written, 1);
    assert_eq!(stats.samples_dropped_stale, 1);
}

#[test]
fn test_presence_tracks_cutoff() {
    let temp_dir = tempdir().unwrap();
    let now_ms = 10_000_000;
    let clock = Arc::new(MockClock::at_millis(now_ms));
    let component = open_at(temp_dir.path(), &clock, MINUTE);

    let cutoff = 10_000_000 - 60_000;
    let mut app = component.new_appender();
    for (i, ts) in [cutoff - 1, cutoff, cutoff + 1, 10_000_000].into_iter().enumerate() {
        app.add(&cpu("web1"), ts, i as f64).unwrap();
    }
    let outcome = app.commit().unwrap();
    assert_eq!(outcome.cutoff_ms, cutoff);

    let stored: Vec<i64> = component
        .query(&Selector::All, i64::MIN, i64::MAX)
        .unwrap()
        .map(|s| s.timestamp_ms)
        .collect();
    assert_eq!(stored, vec![cutoff, cutoff + 1, 10_000_000]);
}

#[test]
fn test_deserialized_labels_match_built_labels() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(1_000_000));
    let component = open_at(temp_dir.path(), &clock, MINUTE);

    let parsed: Labels = serde_json::from_str(r#"[["zone","a"],["__name__","m"]]"#).unwrap();
    let mut app = component.new_appender();
    app.add(&parsed, 999_000, 1.0).unwrap();
    app.commit().unwrap();

    let built = Labels::new([("zone", "a"), ("__name__", "m")]);
    let points = component
        .query(&Selector::exact(built), 0, i64::MAX)
        .unwrap()
        .points();
    assert_eq!(points, vec![(999_000, 1.0)]);
}

#[test]
fn test_data_survives_reopen() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(1_000_000));

    let first_sequences = {
        let component = open_at(temp_dir.path(), &clock, 10 * MINUTE);
        let mut app = component.new_appender();
        let web1 = app.add(&cpu("web1"), 900_000, 1.0).unwrap();
        app.add_fast(web1, 910_000, 2.0).unwrap();
        app.add(&cpu("web2"), 905_000, 3.0).unwrap();
        let outcome = app.commit().unwrap();
        component.close().unwrap();
        outcome.sequences.unwrap()
    };
    assert_eq!(first_sequences, 0..=2);
    assert!(temp_dir.path().join("metrics").is_dir());

    let component = open_at(temp_dir.path(), &clock, 10 * MINUTE);
    assert_eq!(component.series(), vec![cpu("web1"), cpu("web2")]);

    let points = component
        .query(&Selector::exact(cpu("web1")), 0, i64::MAX)
        .unwrap()
        .points();
    assert_eq!(points, vec![(900_000, 1.0), (910_000, 2.0)]);

    // Sequence numbers continue after a restart.
    let mut app = component.new_appender();
    app.add(&cpu("web1"), 950_000, 4.0).unwrap();
    assert_eq!(app.commit().unwrap().sequences, Some(3..=3));
}

#[test]
fn test_entries_expire_across_restart() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(1_000_000));

    {
        let component = open_at(temp_dir.path(), &clock, MINUTE);
        let mut app = component.new_appender();
        app.add(&cpu("web1"), 999_000, 1.0).unwrap();
        app.commit().unwrap();
    }

    clock.advance(MINUTE + Duration::from_secs(1));
    let component = open_at(temp_dir.path(), &clock, MINUTE);
    assert!(component.series().is_empty());
    assert!(component.query(&Selector::All, 0, i64::MAX).unwrap().is_empty());
}

#[test]
fn test_store_expiry_hides_old_entries_before_maintenance() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(1_000_000));
    let component = open_at(temp_dir.path(), &clock, MINUTE);

    let mut app = component.new_appender();
    app.add(&cpu("web1"), 999_000, 1.0).unwrap();
    app.commit().unwrap();

    clock.advance(2 * MINUTE);
    assert!(component.query(&Selector::All, 0, i64::MAX).unwrap().is_empty());

    let report = component.maintain().unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(report.live, 0);
    assert!(component.series().is_empty());
}

#[test]
fn test_update_between_commits() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(10_000_000));
    let component = open_at(temp_dir.path(), &clock, 10 * MINUTE);
    let five_minutes_ago = 10_000_000 - 300_000;

    let mut app = component.new_appender();
    app.add(&cpu("web1"), five_minutes_ago, 1.0).unwrap();
    assert_eq!(app.commit().unwrap().written, 1);

    component.update_configuration(retention(MINUTE)).unwrap();

    let mut app = component.new_appender();
    app.add(&cpu("web1"), five_minutes_ago + 1, 2.0).unwrap();
    let outcome = app.commit().unwrap();
    assert_eq!(outcome.written, 0);
    assert_eq!(outcome.dropped, 1);
}

#[test]
fn test_commit_after_close_writes_nothing() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(1_000_000));
    let component = open_at(temp_dir.path(), &clock, MINUTE);

    let mut app = component.new_appender();
    app.add(&cpu("web1"), 999_000, 1.0).unwrap();
    component.close().unwrap();

    let err = app.commit().unwrap_err();
    assert!(matches!(err, EbbError::StoreWrite(StoreWriteError::Closed)));
    assert!(matches!(
        app.commit(),
        Err(EbbError::Appender(AppenderError::Closed))
    ));
    drop(component);

    // Nothing reached the log.
    let component = open_at(temp_dir.path(), &clock, MINUTE);
    assert!(component.series().is_empty());
    assert_eq!(component.store().stats().next_sequence, 0);
}

#[test]
fn test_second_open_is_locked() {
    let temp_dir = tempdir().unwrap();
    let clock = Arc::new(MockClock::at_millis(0));
    let component = open_at(temp_dir.path(), &clock, MINUTE);

    let err = Component::open(temp_dir.path(), retention(MINUTE)).unwrap_err();
    assert!(matches!(
        err,
        EbbError::StoreOpen(StoreOpenError::Locked { .. })
    ));

    component.close().unwrap();
    Component::open(temp_dir.path(), retention(MINUTE)).unwrap();
}

#[test]
fn test_open_unusable_path_fails() {
    let temp_dir = tempdir().unwrap();
    let file_path = temp_dir.path().join("not_a_dir");
    std::fs::write(&file_path, b"occupied").unwrap();

    let err = Component::open(&file_path, retention(MINUTE)).unwrap_err();
    assert!(matches!(
        err,
        EbbError::StoreOpen(StoreOpenError::DirectoryAccess { .. })
    ));
}

#[test]
fn test_state_change_hook() {
    let temp_dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let options = ComponentOptions::new(temp_dir.path())
        .with_durability(Durability::Buffered)
        .on_state_change(Arc::new(move |exports: Exports| {
            let ttl = exports.receiver.configuration().ttl;
            assert!(ttl == 2 * MINUTE || ttl == MINUTE);
            seen.fetch_add(1, Ordering::SeqCst);
        }));
    let component = Component::open_with(options, retention(2 * MINUTE)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    component.update_configuration(retention(MINUTE)).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_run_maintains_until_cancelled() {
    let temp_dir = tempdir().unwrap();
    let options = ComponentOptions::new(temp_dir.path()).with_durability(Durability::Buffered);
    let component = Component::open_with(options, retention(MINUTE)).unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    let handle = {
        let component = component.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { component.run(cancel).await })
    };

    let now_ms = ebb::clock::unix_millis(std::time::SystemTime::now());
    let mut app = component.new_appender();
    app.add(&cpu("web1"), now_ms, 1.0).unwrap();
    app.commit().unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    cancel.cancel();
    handle.await.unwrap().unwrap();

    let stats = component.stats();
    assert!(stats.maintenance_runs >= 1);
    assert_eq!(stats.maintenance_failures, 0);
    component.close().unwrap();
}
