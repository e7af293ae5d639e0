// Property-based tests for grid addressing, import and snapshots.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use gridmock_engine::{
    Column, ColumnConfig, ColumnKind, GridPolicy, GridState, ImportRecord,
};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"[a-zA-Z0-9 ,.]{1,20}",
        1 => Just("".to_string()),
    ]
}

/// (row, column index) inside the default 20x8 grid.
fn arb_addr() -> impl Strategy<Value = (u32, usize)> {
    (1u32..=20, 0usize..8)
}

fn col(index: usize) -> Column {
    Column::from_index(index).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn set_then_get_returns_value((row, c) in arb_addr(), value in arb_value()) {
        let mut grid = GridState::default();
        grid.set_cell(row, col(c), value.clone()).unwrap();
        prop_assert_eq!(grid.get_cell(row, col(c)).unwrap(), value);
    }

    #[test]
    fn last_write_wins(
        writes in prop::collection::vec((arb_addr(), arb_value()), 1..40),
    ) {
        let mut grid = GridState::default();
        let mut expected = std::collections::HashMap::new();
        for ((row, c), value) in &writes {
            grid.set_cell(*row, col(*c), value.clone()).unwrap();
            expected.insert((*row, *c), value.clone());
        }
        for ((row, c), value) in expected {
            prop_assert_eq!(grid.get_cell(row, col(c)).unwrap(), value);
        }
    }

    #[test]
    fn out_of_range_rows_rejected(row in 21u32..1000, c in 0usize..8) {
        let mut grid = GridState::default();
        let before = grid.clone();
        prop_assert!(grid.set_cell(row, col(c), "x").is_err());
        prop_assert!(grid.get_cell(row, col(c)).is_err());
        prop_assert_eq!(grid, before);
    }

    #[test]
    fn snapshot_restore_preserves_cells(
        writes in prop::collection::vec((arb_addr(), arb_value()), 0..40),
        name in r"[a-z]{0,10}\.csv",
    ) {
        let mut grid = GridState::default();
        grid.set_file_name(name);
        for ((row, c), value) in &writes {
            grid.set_cell(*row, col(*c), value.clone()).unwrap();
        }
        let restored = GridState::restore(grid.snapshot(), GridPolicy::default()).unwrap();
        prop_assert_eq!(restored, grid);
    }

    #[test]
    fn import_grows_rows_and_copies_fields(
        rows in prop::collection::vec(prop::collection::vec(arb_value(), 0..10), 0..30),
    ) {
        let mut grid = GridState::default();
        grid.configure_column(col(1), ColumnConfig::app("Scorer")).unwrap();
        let start = grid.row_count();

        let records: Vec<ImportRecord> = rows.iter().map(|r| ImportRecord::from_values(r.clone())).collect();
        grid.import_bulk_rows(&records).unwrap();

        prop_assert_eq!(grid.row_count(), start + rows.len() as u32);
        for (i, values) in rows.iter().enumerate() {
            let row = start + 1 + i as u32;
            for c in grid.column_letters() {
                let got = grid.get_cell(row, c).unwrap();
                if grid.kind_of(c) == ColumnKind::App {
                    prop_assert_eq!(got, "");
                } else {
                    let want = values.get(c.index()).cloned().unwrap_or_default();
                    prop_assert_eq!(got, want);
                }
            }
        }
    }

    #[test]
    fn credits_match_missing_outputs(
        done in prop::collection::vec(any::<bool>(), 20),
        test_mode in any::<bool>(),
    ) {
        let mut grid = GridState::default();
        grid.configure_column(col(2), ColumnConfig::app("Scorer")).unwrap();
        for (i, has_output) in done.iter().enumerate() {
            if *has_output {
                grid.set_cell(i as u32 + 1, col(2), "ok").unwrap();
            }
        }
        grid.set_test_mode(test_mode);

        let window = if test_mode { 10 } else { 20 };
        let missing = done.iter().take(window).filter(|d| !**d).count() as u32;
        prop_assert_eq!(grid.credits_owed(), missing * 20);
    }
}
