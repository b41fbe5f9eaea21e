//! Error types for the pieces that can actually fail a run.
//!
//! Per-identifier outcomes (record missing, email not found) are not errors;
//! they travel as [`crate::record::Lookup`] values instead.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("SMTP_USERNAME and SMTP_PASSWORD must be set together")]
    PartialSmtpCredentials,
}

/// Failures writing the output CSV.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to {operation} {path:?}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to write csv record to {path:?}")]
    Csv { path: PathBuf, source: csv::Error },
}

impl SinkError {
    /// The target file was already on disk when the sink tried to create it.
    pub fn already_exists(&self) -> bool {
        matches!(self, SinkError::Io { source, .. } if source.kind() == io::ErrorKind::AlreadyExists)
    }
}

/// Failures that end a batch run early.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("start_mc ({start}) must not exceed end_mc ({end})")]
    InvalidRange { start: u64, end: u64 },
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Failures driving the headless browser.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no usable browser binary (tried {tried:?})")]
    BrowserNotFound { tried: Vec<String> },
    #[error("browser io failure during {operation}")]
    Io {
        operation: &'static str,
        source: io::Error,
    },
    #[error("page render timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("browser exited with status {status}")]
    BrowserExit { status: String },
}

/// Failures handing the finished CSV to its recipient.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("email delivery is not configured")]
    NotConfigured,
    #[error("invalid recipient address {address:?}")]
    InvalidRecipient {
        address: String,
        source: lettre::address::AddressError,
    },
    #[error("failed to read attachment {path:?}")]
    Attachment { path: PathBuf, source: io::Error },
    #[error("failed to build message")]
    Message(#[from] lettre::error::Error),
    #[error("smtp send failed")]
    Transport(#[from] lettre::transport::smtp::Error),
}
