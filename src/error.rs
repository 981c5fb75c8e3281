//! Error types for exit condition parsing
//!
//! Every failure here is fatal: the binary reports it and exits before the
//! first probe is sent. Once a `Condition` exists, evaluation and reporting
//! cannot fail.

use thiserror::Error;

/// Errors produced while turning a `-x` specification into a `Condition`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// Malformed specification string. `position` is 0-based; the message
    /// shows it 1-based so it lines up with what the user typed.
    #[error("-x parsing error '{spec}'@{}: {message}", .position + 1)]
    Syntax {
        spec: String,
        position: usize,
        message: String,
    },

    /// Syntactically valid but unusable specification
    #[error("-x configuration error '{spec}': {message}")]
    Configuration { spec: String, message: String },

    /// The initial ping map could not be allocated
    #[error("cannot allocate ping map of {requested} entries")]
    MapAllocation { requested: usize },
}

impl ConditionError {
    /// Position of the offending character (0-based), if this is a syntax error
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Syntax { position, .. } => Some(*position),
            _ => None,
        }
    }
}

/// Result type for condition parsing
pub type Result<T> = std::result::Result<T, ConditionError>;
