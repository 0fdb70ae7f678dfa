/// Values bound as query parameters or read back from catalog rows.
///
/// Catalog lookups only deal in names and counts:
/// ```rust
/// use pg_bootstrap::prelude::*;
///
/// let params = vec![RowValues::Text("n8n".into())];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Text/string value
    Text(String),
    /// NULL value
    Null,
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RowValues::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

