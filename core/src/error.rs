//! Error types for script runs

use std::time::Duration;

use thiserror::Error;

use crate::expr::EvalError;
use crate::script::StepType;

/// Fatal error that ends a run
///
/// Everything emitted before the error is still a valid, ordered partial result.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("no action supports step '{name}' ({step_type})")]
    UnsupportedStep { name: String, step_type: StepType },

    #[error("step '{name}' failed: {message}")]
    ActionExecution { name: String, message: String },

    #[error("expression in step '{name}' failed: {source}")]
    ExpressionEvaluation {
        name: String,
        #[source]
        source: EvalError,
    },

    #[error("unbalanced block: {marker} at step {index} does not close an open block")]
    UnbalancedBlock { index: usize, marker: StepType },

    #[error("block at step {index} nests deeper than {limit} levels")]
    BlockTooDeep { index: usize, limit: usize },

    #[error("run cancelled")]
    Cancelled,

    #[error("run timed out after {0:?}")]
    TimedOut(Duration),
}

/// Failure reported by an action or an interceptor for a single step
#[derive(Debug, Clone, Error)]
pub enum ActionError {
    /// The automation backend rejected the operation
    #[error("{0}")]
    Backend(String),

    #[error(transparent)]
    Expression(#[from] EvalError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A resource an earlier step should have opened is absent
    #[error("no {0} is open")]
    MissingResource(&'static str),

    /// The action was handed a step kind it does not handle
    #[error("invalid step: {0}")]
    InvalidStep(String),
}

impl ActionError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        ActionError::Backend(err.to_string())
    }

    /// Translate into the run-level error for step `name`
    pub fn into_run_error(self, name: &str) -> RunError {
        match self {
            ActionError::Expression(source) => RunError::ExpressionEvaluation {
                name: name.to_string(),
                source,
            },
            other => RunError::ActionExecution {
                name: name.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Template expansion failure (strict missing-parameter policy only)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("parameter '{0}' is not set")]
    MissingParameter(String),
}
