use oejp_meter::accumulator::CumulativeState;
use oejp_meter::dashboard::RecentReading;
use oejp_meter::error::MeterError;
use oejp_meter::persistence::{PersistedValues, StateStore};
use std::fs;

#[test]
fn missing_file_loads_as_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    assert_eq!(store.load().unwrap(), None);

    let acc = store.restore_accumulator();
    assert_eq!(acc.total(), 0.0);
    assert_eq!(acc.last_applied_end(), None);
}

#[test]
fn save_and_restore_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let store = StateStore::new(&path);

    store
        .save(&CumulativeState {
            total: 12.9,
            last_applied_end: Some("2024-01-01T01:00:00+09:00".to_string()),
        })
        .unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());

    let acc = StateStore::new(&path).restore_accumulator();
    assert_eq!(acc.total(), 12.9);
    assert_eq!(acc.last_applied_end(), Some("2024-01-01T01:00:00+09:00"));
}

#[test]
fn total_written_as_string_is_accepted() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(
        tmp.path(),
        r#"{"total": "12.5", "last_applied_end": "2024-01-01T00:30:00+09:00"}"#,
    )
    .unwrap();

    let store = StateStore::new(tmp.path());
    assert_eq!(
        store.load().unwrap(),
        Some(PersistedValues {
            total: Some("12.5".to_string()),
            last_applied_end: Some("2024-01-01T00:30:00+09:00".to_string()),
        })
    );

    // Restart example: 12.5 plus one new interval of 0.4
    let mut acc = store.restore_accumulator();
    acc.apply(&[
        RecentReading {
            end_jst: "2024-01-01T00:30:00+09:00".to_string(),
            kwh: 0.3,
        },
        RecentReading {
            end_jst: "2024-01-01T01:00:00+09:00".to_string(),
            kwh: 0.4,
        },
    ]);
    assert!((acc.total() - 12.9).abs() < 1e-9);
}

#[test]
fn unknown_total_restores_as_zero() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), r#"{"total": "unavailable", "last_applied_end": null}"#).unwrap();

    let acc = StateStore::new(tmp.path()).restore_accumulator();
    assert_eq!(acc.total(), 0.0);
    assert_eq!(acc.last_applied_end(), None);
}

#[test]
fn corrupt_file_is_persistence_error_and_restores_zero() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"{not json").unwrap();

    let store = StateStore::new(tmp.path());
    let err = store.load().unwrap_err();
    assert!(matches!(err, MeterError::Persistence { .. }));

    assert_eq!(store.restore_accumulator().total(), 0.0);
}

#[test]
fn save_overwrites_previous_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));

    store
        .save(&CumulativeState {
            total: 1.0,
            last_applied_end: None,
        })
        .unwrap();
    store
        .save(&CumulativeState {
            total: 2.5,
            last_applied_end: Some("2024-02-01T00:00:00+09:00".to_string()),
        })
        .unwrap();

    let values = store.load().unwrap().unwrap();
    assert_eq!(values.total.as_deref(), Some("2.5"));
    assert_eq!(
        values.last_applied_end.as_deref(),
        Some("2024-02-01T00:00:00+09:00")
    );
}
