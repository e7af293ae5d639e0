//! Pick a storage backend from settings.

use std::path::PathBuf;

use gridmock_config::{Settings, StorageBackend};
use gridmock_io::{FileStore, KeyValueStore, MemoryStore, SqliteStore, StoreError};

/// Data directory from settings, or the platform default.
pub fn data_dir(settings: &Settings) -> PathBuf {
    settings.storage_dir.clone().unwrap_or_else(FileStore::default_dir)
}

/// Open the key-value store named by `storage.backend`.
pub fn open_backend(settings: &Settings) -> Result<Box<dyn KeyValueStore>, StoreError> {
    let store: Box<dyn KeyValueStore> = match settings.storage_backend {
        StorageBackend::File => Box::new(FileStore::new(data_dir(settings))),
        StorageBackend::Sqlite => {
            Box::new(SqliteStore::open(&data_dir(settings).join("gridmock.db"))?)
        }
        StorageBackend::Memory => Box::new(MemoryStore::new()),
    };
    log::info!("using {:?} storage", settings.storage_backend);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sqlite_backend_in_storage_dir() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            storage_backend: StorageBackend::Sqlite,
            storage_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let mut store = open_backend(&settings).unwrap();
        store.set("k", "v").unwrap();
        assert!(dir.path().join("gridmock.db").exists());
    }

    #[test]
    fn test_file_backend_in_storage_dir() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            storage_dir: Some(dir.path().to_path_buf()),
            ..Settings::default()
        };
        let mut store = open_backend(&settings).unwrap();
        store.set("spreadsheetState", "{}").unwrap();
        assert!(dir.path().join("spreadsheetState.json").exists());
    }
}
