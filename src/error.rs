//! Error types for loading and querying cleanup data.
//!
//! Only conditions that must stop the report live here. A selection that
//! matches no rows is not an error: the aggregator returns `None` or an
//! empty result instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, classifying or selecting data.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// The source table lacks one or more required columns.
    #[error("missing required columns: {missing:?}")]
    Schema { missing: Vec<String> },

    /// A row could not be read or deserialized.
    #[error("failed to read CSV data: {0}")]
    Csv(#[from] csv::Error),

    /// The data file could not be opened.
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The table has a header but no records.
    #[error("data file contains no records")]
    EmptyTable,

    /// A year, country or company that does not occur in the data.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// Strict mode rejected groups without a plausible total row.
    #[error("{count} group(s) lack a plausible total row")]
    ImplausibleGroups { count: usize },
}

/// Convenience alias for results carrying a [`DashboardError`].
pub type DashboardResult<T> = std::result::Result<T, DashboardError>;
