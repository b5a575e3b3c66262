//! Error types for capture loading and analysis.

use thiserror::Error;

/// Errors raised while opening or querying a capture database.
///
/// Every variant is meant to be shown to the user as-is; none of them
/// are retried.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The bytes are not an SQLite database.
    #[error("{label}: not a valid capture database ({reason})")]
    InvalidCaptureFormat { label: String, reason: String },

    /// The packet table has no rows, so the time range is undefined.
    #[error("{label}: capture contains no packets")]
    EmptyCapture { label: String },

    /// A table the analysis depends on is absent.
    #[error("{label}: required table '{table}' is missing")]
    MissingRequiredTable { label: String, table: String },

    /// A column the analysis depends on is absent.
    #[error("{label}: required column '{column}' is missing from table '{table}'")]
    MissingRequiredColumn {
        label: String,
        table: String,
        column: String,
    },

    /// Failure reading the capture or writing its transient copy.
    #[error("{label}: I/O error: {source}")]
    Io {
        label: String,
        #[source]
        source: std::io::Error,
    },

    /// A query failed after the schema was validated.
    #[error("{label}: query failed: {source}")]
    Query {
        label: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl CaptureError {
    pub fn io(label: &str, source: std::io::Error) -> Self {
        Self::Io {
            label: label.to_string(),
            source,
        }
    }

    pub fn query(label: &str, source: rusqlite::Error) -> Self {
        Self::Query {
            label: label.to_string(),
            source,
        }
    }

    /// Whether this error describes the capture's contents rather than the
    /// environment (I/O) it was read in.
    pub fn is_capture_problem(&self) -> bool {
        !matches!(self, CaptureError::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_capture() {
        let err = CaptureError::EmptyCapture {
            label: "baseline".to_string(),
        };
        assert_eq!(err.to_string(), "baseline: capture contains no packets");

        let err = CaptureError::MissingRequiredColumn {
            label: "follow-up".to_string(),
            table: "devices".to_string(),
            column: "devmac".to_string(),
        };
        assert!(err.to_string().contains("'devmac'"));
        assert!(err.to_string().contains("'devices'"));
    }

    #[test]
    fn test_is_capture_problem() {
        let io = CaptureError::io(
            "baseline",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(!io.is_capture_problem());

        let empty = CaptureError::EmptyCapture {
            label: "baseline".to_string(),
        };
        assert!(empty.is_capture_problem());
    }
}
