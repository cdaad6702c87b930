//! Error types for the navigation engine.
//!
//! Recoverable absence ("the text is not on screen", "no screen matched") is
//! never an error; those outcomes are `Option`/`bool` returns. Errors are
//! reserved for graph-configuration defects, exhausted retry budgets and
//! collaborator failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NavigationError {
    /// A screen name was used that the screen graph does not define. This is
    /// a configuration or route/graph mismatch defect, not a transient state.
    #[error("unknown screen: {0}")]
    UnknownScreen(String),

    /// The authored screen graph is structurally inconsistent.
    #[error("invalid screen graph: {0}")]
    InvalidGraph(String),

    /// No chain of edges connects a root screen to the requested target.
    #[error("no path found: {0}")]
    NoPathFound(String),

    /// Navigation exhausted its recovery budget without reaching the target.
    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    /// A transition loop hit its iteration cap without confirming progress.
    #[error("navigation stuck: no progress toward {goal} after {iterations} iterations")]
    NavigationStuck { goal: String, iterations: u32 },

    /// A perception collaborator (capture, OCR, template matcher, pointer)
    /// reported a hard failure.
    #[error("perception error: {0}")]
    PerceptionError(String),

    /// The anchor cache could not be read or written.
    #[error("anchor cache error: {0}")]
    CacheError(String),
}
