// Persisted spreadsheet state (the `spreadsheetState` blob)
//
// {
//   "rowCount": 20, "columnCount": 8,
//   "cells": { "A1": "Name", "C4": "Summarizer output" },
//   "fileName": "leads.csv", "previewMode": false,
//   "timestamp": 1760000000000,
//   "columns": { "C": { "kind": "app", "boundAppName": "Summarizer", ... } },
//   "testModeActive": false
// }
//
// rowCount, columnCount and cells are required; everything else defaults.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use gridmock_engine::{CellRef, Column, ColumnConfig, GridError, GridPolicy, GridSnapshot, GridState};

use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedState {
    row_count: u32,
    column_count: usize,
    cells: BTreeMap<String, String>,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    preview_mode: bool,
    /// Save time, milliseconds since the Unix epoch
    #[serde(default)]
    timestamp: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    columns: BTreeMap<Column, ColumnConfig>,
    #[serde(default)]
    test_mode_active: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    staged_rows: Vec<Vec<String>>,
}

/// Serialize with the current time as timestamp.
pub fn serialize(grid: &GridState) -> Result<String, StoreError> {
    serialize_at(grid, Utc::now())
}

pub fn serialize_at(grid: &GridState, saved_at: DateTime<Utc>) -> Result<String, StoreError> {
    let snap = grid.snapshot();
    let state = PersistedState {
        row_count: snap.row_count,
        column_count: snap.column_count,
        cells: snap.cells.into_iter().map(|(cell, v)| (cell.to_string(), v)).collect(),
        file_name: snap.file_name,
        preview_mode: snap.preview_mode,
        timestamp: saved_at.timestamp_millis(),
        columns: snap.columns,
        test_mode_active: snap.test_mode_active,
        staged_rows: snap.staged_rows,
    };
    Ok(serde_json::to_string(&state)?)
}

/// Parse a blob back into a grid. Any structural problem is `CorruptState`.
pub fn deserialize(blob: &str, policy: GridPolicy) -> Result<GridState, GridError> {
    let state: PersistedState =
        serde_json::from_str(blob).map_err(|e| GridError::CorruptState(e.to_string()))?;

    let mut cells = BTreeMap::new();
    for (key, value) in state.cells {
        let cell = key.parse::<CellRef>().map_err(|e| GridError::CorruptState(format!("{e}")))?;
        cells.insert(cell, value);
    }

    GridState::restore(
        GridSnapshot {
            row_count: state.row_count,
            column_count: state.column_count,
            cells,
            columns: state.columns,
            file_name: state.file_name,
            preview_mode: state.preview_mode,
            test_mode_active: state.test_mode_active,
            staged_rows: state.staged_rows,
        },
        policy,
    )
}

/// Save time recorded in a blob, if it parses and carries one.
pub fn saved_at(blob: &str) -> Option<DateTime<Utc>> {
    let state: PersistedState = serde_json::from_str(blob).ok()?;
    if state.timestamp == 0 {
        return None;
    }
    Utc.timestamp_millis_opt(state.timestamp).single()
}
