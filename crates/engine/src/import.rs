//! Records appended by bulk import.

use crate::cell::Column;

/// One imported row: ordered `(field, value)` pairs. Fields map to columns
/// by position, not by name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImportRecord {
    fields: Vec<(String, String)>,
}

impl ImportRecord {
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Record from bare values; field names are the column letters.
    pub fn from_values<V: Into<String>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            fields: values
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    let name = Column::from_index(i)
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| format!("field{}", i + 1));
                    (name, v.into())
                })
                .collect(),
        }
    }

    /// Value at `position`, if the record has that many fields.
    pub fn value_at(&self, position: usize) -> Option<&str> {
        self.fields.get(position).map(|(_, v)| v.as_str())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
