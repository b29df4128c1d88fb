use thiserror::Error;
use yangkit_schema::{errors::SchemaError, statement::StatementId};

/// Unexpected conditions hit while resolving a single candidate.
///
/// A modelling problem in the schema is never a `ResolveError`; those become
/// findings. These errors are caught per candidate by the fixpoint loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum ResolveError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{keyword} statement {statement} has no argument")]
    MissingArgument {
        keyword: &'static str,
        statement: StatementId,
    },

    #[error("{parent_keyword} statement {parent} has no `{child}` child")]
    MissingMandatoryChild {
        parent_keyword: String,
        parent: StatementId,
        child: &'static str,
    },

    #[error("malformed boundary expression `{expression}` at {statement}")]
    MalformedBoundary {
        expression: String,
        statement: StatementId,
    },
}
