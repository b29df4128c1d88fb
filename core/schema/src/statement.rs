use core::fmt;
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::Serialize;

use crate::{keyword::Keyword, registry::ModuleId};

/// Identity of a statement inside the [`Arena`](crate::arena::Arena).
///
/// Ids are allocated monotonically and never reused, so a stale id held by a
/// side table simply stops resolving once its statement has been removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StatementId(pub(crate) u32);

impl StatementId {
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl Display for StatementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The qualified statement type: core keywords belong to the YANG language
/// itself, extensions to the module that defines them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum StatementKind {
    Yang(Keyword),
    Extension { module: String, name: String },
}

impl StatementKind {
    #[must_use]
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            StatementKind::Yang(keyword) => Some(*keyword),
            StatementKind::Extension { .. } => None,
        }
    }

    #[must_use]
    pub fn is(&self, keyword: Keyword) -> bool {
        self.keyword() == Some(keyword)
    }

    #[must_use]
    pub fn is_extension(&self) -> bool {
        matches!(self, StatementKind::Extension { .. })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            StatementKind::Yang(keyword) => keyword.as_str(),
            StatementKind::Extension { name, .. } => name,
        }
    }
}

impl From<Keyword> for StatementKind {
    fn from(keyword: Keyword) -> Self {
        StatementKind::Yang(keyword)
    }
}

impl Display for StatementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Yang(keyword) => write!(f, "{keyword}"),
            StatementKind::Extension { module, name } => write!(f, "{module}:{name}"),
        }
    }
}

/// Where a statement was written: the module whose source text produced it
/// and the line within that text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub module: ModuleId,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub(crate) id: StatementId,
    pub(crate) kind: StatementKind,
    pub(crate) argument: Option<String>,
    pub(crate) parent: Option<StatementId>,
    pub(crate) children: Vec<StatementId>,
    pub(crate) origin: Origin,
}

impl Statement {
    #[must_use]
    pub fn id(&self) -> StatementId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> &StatementKind {
        &self.kind
    }

    #[must_use]
    pub fn keyword(&self) -> Option<Keyword> {
        self.kind.keyword()
    }

    #[must_use]
    pub fn is(&self, keyword: Keyword) -> bool {
        self.kind.is(keyword)
    }

    #[must_use]
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    /// The argument with surrounding whitespace removed, or an empty string.
    #[must_use]
    pub fn trimmed_argument(&self) -> &str {
        self.argument.as_deref().map_or("", str::trim)
    }

    #[must_use]
    pub fn parent(&self) -> Option<StatementId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[StatementId] {
        &self.children
    }

    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn set_argument(&mut self, argument: Option<String>) {
        self.argument = argument;
    }
}

/// Lifecycle status of a definition, ordered by restrictiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Current => "current",
            Status::Deprecated => "deprecated",
            Status::Obsolete => "obsolete",
        }
    }
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "current" => Ok(Status::Current),
            "deprecated" => Ok(Status::Deprecated),
            "obsolete" => Ok(Status::Obsolete),
            _ => Err(()),
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
