// Application settings
// Loaded from ~/.config/gridmock/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where grid state is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key in the data directory (default)
    #[default]
    File,
    /// Single SQLite database in the data directory
    Sqlite,
    /// Nothing persisted beyond the process
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Grid
    #[serde(rename = "grid.initialRows")]
    pub initial_rows: u32,

    #[serde(rename = "grid.initialColumns")]
    pub initial_columns: usize,

    // File
    #[serde(rename = "file.autoSaveInterval")]
    pub auto_save_interval: u64, // seconds

    #[serde(rename = "file.saveDebounceMs")]
    pub save_debounce_ms: u64,

    // Simulated runs
    #[serde(rename = "run.delayMs")]
    pub run_delay_ms: u64,

    #[serde(rename = "credits.perCell")]
    pub credits_per_cell: u32,

    #[serde(rename = "testMode.rowLimit")]
    pub test_mode_row_limit: u32,

    // Storage
    #[serde(rename = "storage.backend")]
    pub storage_backend: StorageBackend,

    #[serde(rename = "storage.dir", skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_rows: 20,
            initial_columns: 8,
            auto_save_interval: 30,
            save_debounce_ms: 1000,
            run_delay_ms: 2000,
            credits_per_cell: 20,
            test_mode_row_limit: 10,
            storage_backend: StorageBackend::File,
            storage_dir: None, // None = platform data dir
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridmock")
            .join("settings.json")
    }

    /// Load settings from disk, falling back to defaults.
    /// Writes a commented default file on first run.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load from a specific file; any read or parse error yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to the default path
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_secs(self.auto_save_interval.max(1))
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn run_delay(&self) -> Duration {
        Duration::from_millis(self.run_delay_ms)
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("Error creating config directory: {}", e);
                return;
            }
        }

        let default_config = r#"{
    // Grid size at startup
    "grid.initialRows": 20,
    "grid.initialColumns": 8,

    // Autosave: periodic interval (seconds) and edit debounce (ms)
    "file.autoSaveInterval": 30,
    "file.saveDebounceMs": 1000,

    // Simulated app/agent/prompt runs
    "run.delayMs": 2000,
    "credits.perCell": 20,

    // Rows that stay interactive in test mode
    "testMode.rowLimit": 10,

    // Storage options: "file", "sqlite", "memory"
    "storage.backend": "file"
}
"#;

        if let Err(e) = fs::write(path, default_config) {
            log::warn!("Error writing default settings.json: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.initial_rows, 20);
        assert_eq!(s.initial_columns, 8);
        assert_eq!(s.auto_save_interval(), Duration::from_secs(30));
        assert_eq!(s.credits_per_cell, 20);
        assert_eq!(s.test_mode_row_limit, 10);
        assert_eq!(s.storage_backend, StorageBackend::File);
    }

    #[test]
    fn test_parse_with_comments_and_partial_keys() {
        let json = r#"{
            // faster runs for demos
            "run.delayMs": 250,
            "storage.backend": "sqlite"
        }"#;
        let s = Settings::parse(json).unwrap();
        assert_eq!(s.run_delay(), Duration::from_millis(250));
        assert_eq!(s.storage_backend, StorageBackend::Sqlite);
        // untouched keys keep defaults
        assert_eq!(s.initial_rows, 20);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());

        let missing = dir.path().join("missing.json");
        assert_eq!(Settings::load_from(&missing), Settings::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");

        let mut s = Settings::default();
        s.auto_save_interval = 5;
        s.storage_dir = Some(dir.path().join("data"));
        s.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path), s);
    }

    #[test]
    fn test_default_file_parses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        Settings::default().create_default_file(&path);
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
