use core::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::statement::StatementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

macro_rules! finding_kinds {
    (
        $(
            $(#[$doc:meta])*
            $variant:ident => $code:literal, $severity:ident
        ),* $(,)?
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        pub enum FindingKind {
            $( $(#[$doc])* $variant, )*
        }

        impl FindingKind {
            pub const ALL: &'static [FindingKind] = &[ $( FindingKind::$variant, )* ];

            /// Stable short code of the finding, e.g. `P054`.
            #[must_use]
            pub fn code(self) -> &'static str {
                match self {
                    $( FindingKind::$variant => $code, )*
                }
            }

            #[must_use]
            pub fn severity(self) -> Severity {
                match self {
                    $( FindingKind::$variant => Severity::$severity, )*
                }
            }
        }
    };
}

finding_kinds! {
    /// More than one `default` refined onto a target that takes a single one.
    InvalidSyntax => "P015", Error,
    IllegalChildStatement => "P018", Error,
    UnresolvablePrefix => "P033", Error,
    UnresolvablePath => "P054", Error,
    ConstraintNarrowed => "P056", Warning,
    DataTypeChanged => "P057", Warning,
    CircularTypedefReferences => "P111", Error,
    ExcessiveTypedefDepth => "P112", Info,
    UnresolvableDerivedType => "P113", Error,
    TypedefNotUsed => "P114", Info,
    TypedefUsedOnlyOnce => "P115", Info,
    NestedDerivedTypeNotResolvable => "P116", Error,
    IllegalDataTypeRestriction => "P117", Error,
    CircularUsesReferences => "P121", Error,
    ExcessiveUsesDepth => "P122", Info,
    InvalidUsesAugmentTargetNode => "P123", Error,
    InvalidRefineTargetNode => "P124", Error,
    UnresolvableGrouping => "P131", Error,
    GroupingNotUsed => "P132", Info,
    GroupingUsedOnlyOnce => "P133", Info,
    NestedUsesNotResolvable => "P134", Error,
    TargetNodeCannotBeAugmented => "P151", Error,
    AugmentingSameModule => "P152", Warning,
    InvalidDeviateOperation => "P161", Error,
    DeviationTargetInSameModule => "P162", Warning,
    /// The replaced statement was itself put there by a replace.
    AmbiguousDeviateReplace => "P163", Warning,
    DeviateReplaceOfDeviateAdded => "P164", Warning,
    DeviateDeleteOfDeviatedStatement => "P165", Warning,
    DeviateCardinalityViolation => "P166", Error,
}

impl Display for FindingKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.code(), self)
    }
}

/// A diagnostic tied to one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub statement: Option<StatementId>,
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    #[must_use]
    pub fn new(statement: StatementId, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            statement: Some(statement),
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.statement {
            Some(statement) => write!(
                f,
                "{} {}: {} (at {statement})",
                self.severity(),
                self.kind.code(),
                self.message
            ),
            None => write!(f, "{} {}: {}", self.severity(), self.kind.code(), self.message),
        }
    }
}

/// Append-only destination for findings.
pub trait FindingSink {
    fn emit(&mut self, finding: Finding);
}

impl FindingSink for Vec<Finding> {
    fn emit(&mut self, finding: Finding) {
        self.push(finding);
    }
}

/// In-memory collector with a few query helpers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Findings {
    items: Vec<Finding>,
}

impl Findings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn all(&self) -> &[Finding] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn of_kind(&self, kind: FindingKind) -> Vec<&Finding> {
        self.items.iter().filter(|finding| finding.kind == kind).collect()
    }

    #[must_use]
    pub fn has(&self, kind: FindingKind) -> bool {
        self.items.iter().any(|finding| finding.kind == kind)
    }

    #[must_use]
    pub fn count(&self, kind: FindingKind) -> usize {
        self.items.iter().filter(|finding| finding.kind == kind).count()
    }

    #[must_use]
    pub fn with_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.items
            .iter()
            .filter(|finding| finding.severity() == severity)
            .collect()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Finding> {
        self.items
    }
}

impl FindingSink for Findings {
    fn emit(&mut self, finding: Finding) {
        self.items.push(finding);
    }
}
