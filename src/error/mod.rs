//! Error types and Result aliases for simple-inotify.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for inotify operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The kernel refused to create a notification queue.
    #[error("failed to create notification queue: {message} (os error {code})")]
    QueueCreation { code: i32, message: String },

    /// The kernel refused to register a watch.
    #[error("failed to watch path '{path}': {message} (os error {code})")]
    WatchRegistration {
        path: String,
        code: i32,
        message: String,
    },

    /// A read returned bytes that do not form whole event records.
    #[error("malformed event stream: {0}")]
    MalformedEventStream(#[from] MalformedStream),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Ways a raw read can fail to decode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedStream {
    /// Fewer bytes remain than one fixed-size header.
    #[error("truncated header at offset {offset}: {remaining} bytes remain")]
    TruncatedHeader { offset: usize, remaining: usize },

    /// The header announces a name longer than the bytes that follow it.
    #[error("truncated name at offset {offset}: need {len} bytes, {remaining} remain")]
    TruncatedName {
        offset: usize,
        len: usize,
        remaining: usize,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a queue creation error from an OS error.
    #[must_use]
    pub fn queue_creation(err: &std::io::Error) -> Self {
        let (code, message) = os_parts(err);
        Self::QueueCreation { code, message }
    }

    /// Build a watch registration error from an OS error.
    pub fn watch_registration(path: impl Into<String>, err: &std::io::Error) -> Self {
        let (code, message) = os_parts(err);
        Self::WatchRegistration {
            path: path.into(),
            code,
            message,
        }
    }

    /// Platform error code carried by this error, if any.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::QueueCreation { code, .. } | Self::WatchRegistration { code, .. } => Some(*code),
            Self::Io(e) => e.raw_os_error(),
            Self::MalformedEventStream(_) | Self::Config(_) => None,
        }
    }
}

/// Split an OS error into its code and a best-effort message.
///
/// Errors without a raw code map to `0`. Codes the platform cannot describe
/// produce an empty message.
fn os_parts(err: &std::io::Error) -> (i32, String) {
    let code = err.raw_os_error().unwrap_or(0);
    (code, strerror(code))
}

/// Human-readable message for an errno value, empty when unknown.
#[must_use]
pub fn strerror(code: i32) -> String {
    let described = std::io::Error::from_raw_os_error(code).to_string();
    // std renders "<message> (os error N)"; keep only the message.
    let message = described
        .strip_suffix(&format!(" (os error {code})"))
        .unwrap_or(&described);
    if message.starts_with("Unknown error") {
        String::new()
    } else {
        message.to_string()
    }
}
