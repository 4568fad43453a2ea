//! Error types for the sanad core.

use thiserror::Error;

/// Errors from the usage ledger storage layer.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A generic storage operation error.
    #[error("Ledger operation error: {message}")]
    OperationError { message: String },

    /// Connection error (sqlite open, pool checkout).
    #[error("Ledger connection error: {message}")]
    ConnectionError { message: String },

    /// A stored value could not be decoded.
    #[error("Ledger decode error: {message}")]
    DecodeError { message: String },
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::OperationError {
            message: e.to_string(),
        }
    }
}

/// Errors raised while running the reply pipeline.
///
/// The orchestrator is fail-open: these never escape `orchestrate`, they are
/// logged and the raw reply is returned untouched.
#[derive(Debug, Error)]
pub enum OrchestrateError {
    /// A phrase-pack lookup failed.
    #[error(transparent)]
    Phrase(#[from] crate::phrases::PhraseError),

    /// A runtime-built pattern (trigger topics) failed to compile.
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// Errors surfaced by the chat flow to the HTTP layer.
///
/// Quota rejection is deliberately *not* here; it is a typed outcome
/// (`ChatOutcome::LimitReached`), never an error.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The completion provider failed; there is no reply to deliver.
    #[error("Completion provider error: {message}")]
    Completion { message: String },

    /// The usage ledger failed mid-consume.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The requested persona id is unknown.
    #[error("Unknown persona: {id}")]
    UnknownPersona { id: String },
}
