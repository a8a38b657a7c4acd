use thiserror::Error;

/// Errors surfaced by the data layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    /// A filter step references a column the dataset does not have.
    #[error("schema error: column '{column}' is not present in the dataset")]
    Schema { column: String },

    /// The data source could not be read or produced no rows.
    #[error("data unavailable: {reason}")]
    Unavailable { reason: String },
}

impl DataError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        DataError::Unavailable {
            reason: reason.into(),
        }
    }
}
