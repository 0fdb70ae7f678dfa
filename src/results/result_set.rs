use std::sync::Arc;

use super::row::{CustomDbRow, index_columns};
use crate::types::RowValues;

/// The rows returned by one query.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            column_names: None,
        }
    }

    /// Build a result set from column names and positional rows.
    #[must_use]
    pub fn from_rows(column_names: Vec<String>, rows: Vec<Vec<RowValues>>) -> ResultSet {
        let mut result_set = ResultSet::with_capacity(rows.len());
        result_set.set_column_names(Arc::new(column_names));
        for row in rows {
            result_set.add_row_values(row);
        }
        result_set
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_names = Some(column_names);
    }

    /// Add a row to the result set. Rows added before column names are set are dropped.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        let Some(column_names) = &self.column_names else {
            return;
        };
        // Every row shares one index; build it from the first row.
        let cache = match self.results.first() {
            Some(first) => first.column_index_cache.clone(),
            None => Arc::new(index_columns(column_names)),
        };
        self.results.push(CustomDbRow {
            column_names: column_names.clone(),
            rows: row_values,
            column_index_cache: cache,
        });
    }

    /// First row of the result, if any.
    #[must_use]
    pub fn first(&self) -> Option<&CustomDbRow> {
        self.results.first()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_lookup() {
        let rs = ResultSet::from_rows(
            vec!["datname".into(), "owner".into()],
            vec![
                vec![RowValues::Text("n8n".into()), RowValues::Text("n8n".into())],
                vec![RowValues::Text("app".into()), RowValues::Null],
            ],
        );
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.results[1].get("datname"), Some(&RowValues::Text("app".into())));
        assert!(rs.results[1].get("owner").is_some_and(RowValues::is_null));
        assert!(rs.results[0].get("missing").is_none());
    }

    #[test]
    fn rows_before_columns_are_ignored() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.is_empty());
    }
}
