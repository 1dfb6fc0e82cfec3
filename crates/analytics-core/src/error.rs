use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the player analytics crates.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// The source file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV document is structurally malformed (ragged rows, bad UTF-8).
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// One or more required columns are absent from the header row.
    #[error("Missing required columns in {path}: {}", columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    /// A numeric field could not be parsed or is out of range.
    #[error("Invalid value {value:?} for column {column} at row {row}")]
    InvalidField {
        row: usize,
        column: String,
        value: String,
    },

    /// The source parsed but holds no data rows.
    #[error("Dataset is empty: {0}")]
    EmptyDataset(PathBuf),

    /// The expected data file does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A user-supplied date or timestamp did not match any recognised format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// An interactive filter command could not be understood.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalyticsError {
    /// `true` for errors raised while loading the dataset. These end the
    /// analysis session.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            AnalyticsError::FileRead { .. }
                | AnalyticsError::Csv(_)
                | AnalyticsError::MissingColumns { .. }
                | AnalyticsError::InvalidField { .. }
                | AnalyticsError::EmptyDataset(_)
                | AnalyticsError::DataPathNotFound(_)
        )
    }
}

/// Convenience alias used throughout the analytics crates.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AnalyticsError::FileRead {
            path: PathBuf::from("/some/players.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/players.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_columns() {
        let err = AnalyticsError::MissingColumns {
            path: PathBuf::from("players.csv"),
            columns: vec!["User_ID".to_string(), "Last_Login".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Missing required columns in players.csv: User_ID, Last_Login"
        );
    }

    #[test]
    fn test_error_display_invalid_field() {
        let err = AnalyticsError::InvalidField {
            row: 4,
            column: "Total_Revenue_USD".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value \"abc\" for column Total_Revenue_USD at row 4"
        );
    }

    #[test]
    fn test_error_display_empty_dataset() {
        let err = AnalyticsError::EmptyDataset(PathBuf::from("/data/empty.csv"));
        assert_eq!(err.to_string(), "Dataset is empty: /data/empty.csv");
    }

    #[test]
    fn test_error_display_invalid_command() {
        let err = AnalyticsError::InvalidCommand("frobnicate".to_string());
        assert_eq!(err.to_string(), "Invalid command: frobnicate");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AnalyticsError = io_err.into();
        assert!(err.to_string().contains("denied"));
        assert!(!err.is_load_error());
    }

    #[test]
    fn test_load_error_classification() {
        assert!(AnalyticsError::EmptyDataset(PathBuf::from("x.csv")).is_load_error());
        assert!(AnalyticsError::DataPathNotFound(PathBuf::from("x.csv")).is_load_error());
        assert!(!AnalyticsError::Config("bad".to_string()).is_load_error());
        assert!(!AnalyticsError::InvalidDate("soon".to_string()).is_load_error());
    }
}
