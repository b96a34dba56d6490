use history_xdr::XdrError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorShape {
    pub error_message: String,
    pub error_type: String,
}

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("Invalid file sequence: {value}")]
    InvalidFileSequence { value: String },

    #[error("File not found in archive: {path}")]
    FileNotFound { path: String },

    #[error("Download of {path} failed: {reason}")]
    DownloadFailed { path: String, reason: String },

    #[error("Archive error: {reason}")]
    ArchiveError { reason: String },

    #[error("XDR error: {0}")]
    XdrError(#[from] XdrError),

    #[error("Ledger {ledger_seq} missing from ledger file {file}")]
    MissingLedger { ledger_seq: u32, file: String },

    #[error("Invalid close time: {close_time}")]
    InvalidCloseTime { close_time: u64 },

    #[error("Collector cursor is not initialized; run init-db or set collector.first_file")]
    NotInitialized,

    #[error("Database already exists: {name} (use --force to recreate)")]
    DatabaseExists { name: String },

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Database error: {reason}")]
    DatabaseError { reason: String },

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Internal error: {reason}")]
    InternalError { reason: String },
}

impl HistoryError {
    pub fn to_error_shape(&self) -> ErrorShape {
        ErrorShape {
            error_message: self.to_string(),
            error_type: self.error_type().to_string(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            HistoryError::ConfigError { .. } => "ConfigError",
            HistoryError::InvalidFileSequence { .. } => "InvalidParameterValueException",
            HistoryError::FileNotFound { .. } => "ArchiveFileNotFound",
            HistoryError::DownloadFailed { .. } => "DownloadFailed",
            HistoryError::ArchiveError { .. } => "ArchiveError",
            HistoryError::XdrError(_) => "DecodeError",
            HistoryError::MissingLedger { .. } => "DecodeError",
            HistoryError::InvalidCloseTime { .. } => "DecodeError",
            HistoryError::NotInitialized => "NotInitialized",
            HistoryError::DatabaseExists { .. } => "ResourceConflictException",
            HistoryError::InvalidRequest { .. } => "InvalidParameterValueException",
            HistoryError::NotFound { .. } => "ResourceNotFoundException",
            HistoryError::DatabaseError { .. } => "ServiceException",
            HistoryError::SqlxError(_) => "ServiceException",
            HistoryError::InternalError { .. } => "ServiceException",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            HistoryError::InvalidFileSequence { .. } => 400,
            HistoryError::InvalidRequest { .. } => 400,
            HistoryError::NotFound { .. } => 404,
            HistoryError::FileNotFound { .. } => 404,
            HistoryError::DatabaseExists { .. } => 409,
            HistoryError::NotInitialized => 503,
            HistoryError::DatabaseError { .. } | HistoryError::SqlxError(_) => 503,
            _ => 500,
        }
    }
}
