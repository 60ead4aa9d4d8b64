//! Error types for the detection pipeline
//!
//! One enum per failure domain: data sources, the store, and
//! notification delivery. None of these reach end users; callers log them
//! and move on.

use std::time::Duration;
use thiserror::Error;

/// Market data source failures (transient by nature)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Venue returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Fetch task aborted: {0}")]
    Aborted(String),
}

/// Store failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown recipient: {0}")]
    UnknownRecipient(i64),
}

/// Notification channel failures
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel rejected message for {recipient}: {status} {body}")]
    Rejected {
        recipient: i64,
        status: u16,
        body: String,
    },
}
