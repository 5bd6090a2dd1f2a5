//! Core Error Types
//!
//! Defines the error taxonomy shared by every crate in the map analysis
//! workspace. Each variant maps to one failure class a caller can act on:
//!
//! - `Validation` - bad or missing selection, mismatched geometry types,
//!   missing required fields. Raised before any fetch or compute work.
//! - `SourceUnavailable` / `EmptyInput` - raised right after fetch.
//! - `Operation` - a computation produced no usable results after the
//!   tool's partial-failure policy was applied.
//! - `Geometry` - a single geometry-engine call failed. Tools normally log
//!   and skip these; they only escape when a tool aborts on first failure.
//!
//! None of these are retried automatically.

use thiserror::Error;

/// Core error type for the map analysis workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Precondition failures (selection, parameters, schema)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backing view or session of a layer is gone
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A fetched feature set contains no usable geometry
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Computation produced zero usable results
    #[error("Operation error: {0}")]
    Operation(String),

    /// A single geometry engine call failed
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// The run was cancelled through its cancellation token
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// An identical run (same tool, same inputs) is already executing
    #[error("Run in progress: {0}")]
    RunInProgress(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Lifecycle transition not allowed from the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a source unavailable error
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Create an empty input error
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Create an operation error
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create a geometry error
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Create a cancelled error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Create a run-in-progress error
    pub fn run_in_progress(msg: impl Into<String>) -> Self {
        Self::RunInProgress(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::SourceUnavailable(_) => "source_unavailable",
            CoreError::EmptyInput(_) => "empty_input",
            CoreError::Operation(_) => "operation",
            CoreError::Geometry(_) => "geometry",
            CoreError::Cancelled(_) => "cancelled",
            CoreError::RunInProgress(_) => "run_in_progress",
            CoreError::NotFound(_) => "not_found",
            CoreError::InvalidState(_) => "invalid_state",
            CoreError::Serialization(_) => "serialization",
            CoreError::Internal(_) => "internal",
        }
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
