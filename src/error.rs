use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// Everything that can stop a conversion. Each variant says which stage failed.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed header in {}: {reason}", .path.display())]
    MalformedHeader { path: PathBuf, reason: String },

    #[error("csv error in {} (data row {row}): {source}", .path.display())]
    Csv {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("required column {column:?} not found in {}", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("data row {row}: cannot parse timestamp {value:?}")]
    BadTimestamp { row: usize, value: String },

    #[error("data row {row}: cannot parse {column:?} value {value:?}")]
    BadNumber {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("no measurement rows after the header in {}", .path.display())]
    EmptyData { path: PathBuf },

    #[error("netcdf error while {stage} ({}): {source}", .path.display())]
    NetCdf {
        path: PathBuf,
        stage: &'static str,
        #[source]
        source: netcdf::error::Error,
    },
}

impl ConvertError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io { path: path.into(), source }
    }
}
