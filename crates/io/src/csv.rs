// CSV source for bulk row imports

use std::io::Read;
use std::path::Path;

use gridmock_engine::ImportRecord;

use crate::error::StoreError;

/// Read CSV with a header row into import records. Header names become the
/// record field names; values still map to columns by position.
pub fn read_bulk_rows<R: Read>(reader: R) -> Result<Vec<ImportRecord>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let pairs = record.iter().enumerate().map(|(i, value)| {
            let name = headers
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("field{}", i + 1));
            (name, value.to_string())
        });
        records.push(ImportRecord::from_pairs(pairs));
    }

    Ok(records)
}

pub fn read_bulk_rows_from_path(path: &Path) -> Result<Vec<ImportRecord>, StoreError> {
    let file = std::fs::File::open(path)?;
    read_bulk_rows(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_read_with_headers() {
        let data = "name,email,score\nAda,ada@example.com,9\nGrace,grace@example.com\n";
        let records = read_bulk_rows(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("email"), Some("ada@example.com"));
        assert_eq!(records[0].value_at(2), Some("9"));
        // Short rows are fine
        assert_eq!(records[1].len(), 2);
        assert_eq!(records[1].value_at(2), None);
    }

    #[test]
    fn test_extra_fields_get_names() {
        let records = read_bulk_rows("a\n1,2\n".as_bytes()).unwrap();
        let names: Vec<_> = records[0].fields().map(|(k, _)| k.to_string()).collect();
        assert_eq!(names, vec!["a".to_string(), "field2".to_string()]);
    }

    #[test]
    fn test_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "h\nv\n").unwrap();
        let records = read_bulk_rows_from_path(&path).unwrap();
        assert_eq!(records[0].value_at(0), Some("v"));
    }
}
