//! Error types for indicator loading and lookup.
//!
//! Structural failures (bad source layout, unknown indicator, unreadable file)
//! are [`Error`] and abort the request. Numeric failures of a single fit are
//! [`crate::fit::FitUndefined`] and never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// What is wrong with the shape of a wide source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaIssue {
    /// One or both identifier columns are absent.
    #[error("missing required identifier columns: {}", missing.join(", "))]
    MissingIdentifierColumns { missing: Vec<String> },

    /// No header matched the year-column pattern.
    #[error("no year columns found")]
    NoYearColumns,
}

/// Errors that can occur while reading sources or resolving indicators.
#[derive(Debug, Error)]
pub enum Error {
    /// Source file does not have the expected wide layout.
    #[error("schema error in {source_ref}: {reason}")]
    Schema {
        source_ref: String,
        reason: SchemaIssue,
    },

    /// Indicator name is not registered in the catalog.
    #[error("indicator not found: {indicator}")]
    NotFound { indicator: String },

    /// Failed to open or read a file.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a CSV source.
    #[error("failed to parse CSV {source_ref}: {source}")]
    Csv {
        source_ref: String,
        #[source]
        source: csv::Error,
    },

    /// Catalog configuration is malformed.
    #[error("invalid catalog {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn schema(source_ref: impl Into<String>, reason: SchemaIssue) -> Self {
        Self::Schema {
            source_ref: source_ref.into(),
            reason,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_source_and_columns() {
        let err = Error::schema(
            "data/EmCO2Tot.csv",
            SchemaIssue::MissingIdentifierColumns {
                missing: vec!["CountryCode".into()],
            },
        );
        assert_eq!(
            err.to_string(),
            "schema error in data/EmCO2Tot.csv: missing required identifier columns: CountryCode"
        );
    }

    #[test]
    fn not_found_display() {
        let err = Error::NotFound {
            indicator: "Nope".into(),
        };
        assert_eq!(err.to_string(), "indicator not found: Nope");
    }
}
