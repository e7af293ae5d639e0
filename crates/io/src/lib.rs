// Persistence and file I/O

pub mod blob;
pub mod csv;
pub mod error;
pub mod kv;
pub mod sqlite;
pub mod upload;

pub use error::StoreError;
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use sqlite::SqliteStore;
pub use upload::UploadedFile;

/// Key holding the serialized grid state.
pub const STATE_KEY: &str = "spreadsheetState";

/// Key holding the one-shot upload payload.
pub const UPLOAD_KEY: &str = "uploadedFile";
