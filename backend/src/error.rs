//! Error taxonomy for the ingestion-and-query pipeline.
//!
//! Three failure families cover the whole request:
//! - [`DecodeError`]: an uploaded file could not be turned into a table.
//! - [`CapabilityError`]: the text-completion call failed, or came back
//!   with nothing usable.
//! - store failures, split into load-time problems and rejection of the
//!   final query (the latter is reported together with the stage-1 query
//!   so callers can tell intent-capture failures from translation ones).
//!
//! [`PipelineError`] is the umbrella the orchestrator propagates; its
//! `Display` text is what ends up in the response envelope's `error` field.

use thiserror::Error;

/// An uploaded file could not be decoded into a table.
#[derive(Debug, Error)]
#[error("failed to read {file}: {reason}")]
pub struct DecodeError {
    pub file: String,
    pub reason: String,
}

impl DecodeError {
    pub fn new(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// The external text-completion capability failed.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// The model answered, but with an empty or whitespace-only body.
    /// The display text is part of the response contract.
    #[error("no query produced")]
    Empty,

    /// Transport-level failure: request error, non-success status, or an
    /// unparsable response body.
    #[error("model request failed: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Creating the store or materializing a decoded table failed.
    #[error("store error: {0}")]
    Store(#[source] rusqlite::Error),

    /// The store's backing temp file could not be created.
    #[error("failed to create store: {0}")]
    StoreIo(#[source] std::io::Error),

    /// The store rejected the stage-2 query.
    #[error("query execution failed: {0}")]
    Execution(#[source] rusqlite::Error),
}
