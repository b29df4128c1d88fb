use thiserror::Error;

use crate::{keyword::Keyword, registry::ModuleId, statement::StatementId};

/// Errors raised by the statement arena and the module registry.
///
/// These signal misuse of the tree API (dangling ids, malformed roots) rather
/// than problems in the modelled schema; the latter are reported as findings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum SchemaError {
    #[error("unknown statement keyword `{0}`")]
    UnknownKeyword(String),

    #[error("statement {0} does not exist in the arena")]
    UnknownStatement(StatementId),

    #[error("statement {child} is not a child of statement {parent}")]
    NotAChild {
        parent: StatementId,
        child: StatementId,
    },

    #[error("statement {statement} cannot be moved under its own descendant {target}")]
    CyclicMove {
        statement: StatementId,
        target: StatementId,
    },

    #[error("`{0}` cannot be the root of a module tree")]
    NotAModuleRoot(Keyword),

    #[error("module {0} is not registered")]
    UnknownModule(ModuleId),

    #[error("module `{name}` is already registered with revision {revision:?}")]
    DuplicateModule {
        name: String,
        revision: Option<String>,
    },

    #[error("{keyword} statement {statement} has no argument")]
    MissingArgument {
        keyword: &'static str,
        statement: StatementId,
    },
}
