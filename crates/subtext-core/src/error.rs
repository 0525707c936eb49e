//! Error types for the analysis pipeline.
//!
//! The taxonomy separates what the external caller may see from what only
//! the logs may see. Oracle transport errors, parse failures and schema
//! violations all collapse into [`GenerationError`], whose public rendering
//! is a single generic message; the detailed variants exist for internal
//! diagnostics. Input validation is the one class surfaced with field-level
//! detail, because it is the one class the caller can act on.

use thiserror::Error;

use crate::schema::SchemaViolation;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The message shown to external callers for any internal failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "Analysis failed. Please try again later.";

/// Caller-supplied input violated basic shape constraints.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("input validation failed: {}", .violations.join("; "))]
pub struct InputValidationError {
    /// Every violated constraint, phrased for the caller.
    pub violations: Vec<String>,
}

/// One structured-generation attempt failed.
///
/// `Display` on every variant is safe to log; none of them should be shown
/// to an external caller directly - use [`GenerationError::public_message`].
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The oracle call itself could not complete (network, auth, quota,
    /// timeout).
    #[error("oracle invocation failed: {0}")]
    Oracle(String),

    /// The oracle returned no usable text.
    #[error("oracle returned empty output")]
    EmptyOutput,

    /// The oracle's text could not be parsed as JSON, even after stripping
    /// code-fence decoration.
    #[error("oracle output is not valid JSON: {detail}")]
    Parse {
        detail: String,
    },

    /// The parsed value does not conform to the target schema.
    #[error("{0}")]
    Schema(#[from] SchemaViolation),
}

impl GenerationError {
    /// The only rendering of this error an external caller may see.
    pub fn public_message(&self) -> &'static str {
        GENERIC_FAILURE_MESSAGE
    }
}

/// Top-level failure of one analysis run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Rejected before any oracle call was made.
    #[error(transparent)]
    InvalidInput(#[from] InputValidationError),

    /// A generation stage failed; all downstream stages were skipped.
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: GenerationError,
    },
}

impl PipelineError {
    /// Message safe to surface outside the service.
    ///
    /// Input problems keep their field detail; everything else is masked.
    pub fn public_message(&self) -> String {
        match self {
            PipelineError::InvalidInput(err) => err.to_string(),
            PipelineError::Stage { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Whether this failure is attributable to the caller's input.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self, PipelineError::InvalidInput(_))
    }
}
