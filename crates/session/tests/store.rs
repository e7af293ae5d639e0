//! End-to-end store lifecycle against on-disk backends.

use std::time::Duration;

use gridmock_config::{Settings, StorageBackend};
use gridmock_engine::{CellView, Column, ColumnConfig, ColumnKind, GridError, ImportRecord, RunState};
use gridmock_io::{FileStore, KeyValueStore, UploadedFile, STATE_KEY, UPLOAD_KEY};
use gridmock_session::{GridStateStore, StartupSource};
use tempfile::tempdir;

fn col(c: char) -> Column {
    Column::from_letter(c).unwrap()
}

fn settings_in(dir: &std::path::Path, backend: StorageBackend) -> Settings {
    Settings {
        storage_backend: backend,
        storage_dir: Some(dir.to_path_buf()),
        run_delay_ms: 10,
        save_debounce_ms: 0,
        ..Settings::default()
    }
}

#[test]
fn test_state_survives_reopen_file_backend() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), StorageBackend::File);

    {
        let mut store = GridStateStore::open_default(&settings).unwrap();
        assert_eq!(store.startup_source(), StartupSource::Empty);
        store.set_cell(7, col('B'), "hello").unwrap();
        store
            .configure_column(col('C'), ColumnConfig::dropdown(vec!["Yes".into(), "No".into()]))
            .unwrap();
        store.set_cell(1, col('C'), "Yes").unwrap();
        store.flush().unwrap();
    }

    let store = GridStateStore::open_default(&settings).unwrap();
    assert_eq!(store.startup_source(), StartupSource::Persisted);
    assert_eq!(store.get_cell(7, col('B')).unwrap(), "hello");
    assert_eq!(store.grid().kind_of(col('C')), ColumnKind::Dropdown);
    assert!(matches!(
        store.cell_view(1, col('C')).unwrap(),
        CellView::Choice { selected, .. } if selected == vec!["Yes".to_string()]
    ));
}

#[test]
fn test_state_survives_reopen_sqlite_backend() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), StorageBackend::Sqlite);

    {
        let mut store = GridStateStore::open_default(&settings).unwrap();
        store.add_column().unwrap();
        store.set_cell(2, col('I'), "ninth").unwrap();
        // Zero debounce: first tick writes
        assert!(store.tick());
    }

    let store = GridStateStore::open_default(&settings).unwrap();
    assert_eq!(store.grid().column_count(), 9);
    assert_eq!(store.get_cell(2, col('I')).unwrap(), "ninth");
}

#[test]
fn test_upload_preview_then_commit() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), StorageBackend::File);

    let data: Vec<Vec<String>> = (1..=25).map(|i| vec![format!("lead{}", i), format!("{}@x.io", i)]).collect();
    let upload = UploadedFile { name: "leads.csv".into(), preview_mode: true, data };
    let mut kv = FileStore::new(dir.path());
    kv.set(UPLOAD_KEY, &upload.to_json().unwrap()).unwrap();

    let mut store = GridStateStore::open_default(&settings).unwrap();
    assert_eq!(store.startup_source(), StartupSource::Upload);
    assert!(store.grid().test_mode_active());
    assert_eq!(store.grid().staged_rows().len(), 5);
    assert_eq!(store.get_cell(20, col('A')).unwrap(), "lead20");
    assert!(store.locked(11));
    assert!(FileStore::new(dir.path()).get(UPLOAD_KEY).unwrap().is_none());

    store.configure_column(col('C'), ColumnConfig::app("Enricher")).unwrap();
    assert_eq!(store.credits_owed(), 10 * 20);

    let added = store.commit_import().unwrap();
    assert_eq!(added, 21..26);
    assert!(!store.grid().test_mode_active());
    assert!(!store.grid().preview_mode());
    assert_eq!(store.grid().row_count(), 25);
    assert_eq!(store.get_cell(25, col('B')).unwrap(), "25@x.io");
    assert_eq!(store.credits_owed(), 25 * 20);
    store.flush().unwrap();

    // Upload was consumed: reopening restores the committed grid
    let store = GridStateStore::open_default(&settings).unwrap();
    assert_eq!(store.startup_source(), StartupSource::Persisted);
    assert_eq!(store.grid().row_count(), 25);
    assert!(store.grid().staged_rows().is_empty());
}

#[test]
fn test_corrupt_blob_recovers_and_is_overwritten() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), StorageBackend::File);
    FileStore::new(dir.path()).set(STATE_KEY, "not json at all").unwrap();

    let mut store = GridStateStore::open_default(&settings).unwrap();
    assert_eq!(store.startup_source(), StartupSource::Recovered);
    assert_eq!(store.grid().row_count(), 20);
    assert_eq!(store.grid().column_count(), 8);

    store.set_cell(1, col('A'), "fresh").unwrap();
    store.flush().unwrap();
    let store = GridStateStore::open_default(&settings).unwrap();
    assert_eq!(store.startup_source(), StartupSource::Persisted);
}

#[test]
fn test_bulk_import_and_runs() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), StorageBackend::Memory);
    let mut store = GridStateStore::open_default(&settings).unwrap();

    store.configure_column(col('B'), ColumnConfig::prompt("Summarize", Some(col('A')))).unwrap();
    let records: Vec<ImportRecord> = (0..3)
        .map(|i| ImportRecord::from_pairs([("name", format!("r{}", i)), ("ignored", "x".to_string())]))
        .collect();
    assert_eq!(store.import_bulk_rows(&records).unwrap(), 21..24);
    assert_eq!(store.get_cell(21, col('A')).unwrap(), "r0");
    // Executable column gets an idle slot, not the record's field
    assert_eq!(store.grid().run_state(21, col('B')).unwrap(), RunState::Idle);

    store.trigger_run(22, col('B')).unwrap();
    store.trigger_run(22, col('B')).unwrap();
    assert_eq!(store.wait_for_runs(Duration::from_secs(5)), 1);
    assert_eq!(store.get_cell(22, col('B')).unwrap(), "Prompt response");
    assert_eq!(store.credits_owed(), 22 * 20);
}

#[test]
fn test_row_limit_leaves_state_alone() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), StorageBackend::Memory);
    let mut store = GridStateStore::open_default(&settings).unwrap();

    let records = vec![ImportRecord::from_values(["x"]); 10_000];
    assert!(matches!(
        store.import_bulk_rows(&records),
        Err(GridError::RowLimitExceeded { .. })
    ));
    assert_eq!(store.grid().row_count(), 20);
    assert!(!store.is_dirty());
}

#[test]
fn test_remove_suffix_columns() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path(), StorageBackend::Memory);
    let mut store = GridStateStore::open_default(&settings).unwrap();
    store.set_cell(1, col('H'), "gone").unwrap();
    store.flush().unwrap();

    assert!(!store.remove_columns([col('B')]).unwrap());
    assert!(!store.is_dirty());

    assert!(store.remove_columns([col('G'), col('H')]).unwrap());
    assert_eq!(store.grid().column_count(), 6);
    assert!(store.is_dirty());
    assert!(store.get_cell(1, col('H')).is_err());
}
