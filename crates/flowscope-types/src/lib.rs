//! Shared error taxonomy and result alias for the Flowscope explorer.
//!
//! Rendering and derivation never fail at runtime; absence of optional data
//! degrades to omission. The fallible surfaces are document loading, the
//! advisory lint pass when promoted to an error, and file output, and those
//! are the variants modelled here.

/// Unified error type for all Flowscope subsystems.
#[derive(Debug, thiserror::Error)]
pub enum FlowscopeError {
    // === Document errors ===
    #[error("Document '{path}' could not be read: {message}")]
    DocumentRead { path: String, message: String },

    #[error("Document is not a valid pipeline description: {0}")]
    DocumentFormat(#[from] serde_json::Error),

    #[error("Lint failed on rule '{rule}': {message}")]
    LintError { rule: String, message: String },

    // === Lookup errors (CLI-facing; render paths skip instead) ===
    #[error("No step with id '{0}' in the document")]
    UnknownStep(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// A convenience alias for `Result<T, FlowscopeError>`.
pub type Result<T> = std::result::Result<T, FlowscopeError>;
