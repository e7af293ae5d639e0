// One-shot uploaded file payload (the `uploadedFile` key)

use serde::{Deserialize, Serialize};

use gridmock_engine::{GridError, GridPolicy, GridState};

use crate::error::StoreError;

/// Written by the upload step, read once at startup, then removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    #[serde(default)]
    pub preview_mode: bool,
    pub data: Vec<Vec<String>>,
}

impl UploadedFile {
    pub fn parse(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Placeholder conversion into a fresh `rows` x `columns` grid. A full
    /// load (not a preview) grows the grid to hold every data row.
    pub fn into_grid(self, rows: u32, columns: usize, policy: GridPolicy) -> Result<GridState, GridError> {
        GridState::from_preview(self.name, self.preview_mode, self.data, rows, columns, policy)
    }
}
