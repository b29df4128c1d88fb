use core::fmt;
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use serde::Serialize;

use crate::errors::SchemaError;

/// How the argument of a statement is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentKind {
    None,
    Name,
    Value,
    Text,
    Uri,
}

macro_rules! keywords {
    (
        $(
            $variant:ident => $text:literal : $arg:ident
        ),* $(,)?
    ) => {
        /// A core YANG statement keyword.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum Keyword {
            $( $variant, )*
        }

        impl Keyword {
            pub const ALL: &'static [Keyword] = &[ $( Keyword::$variant, )* ];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $( Keyword::$variant => $text, )*
                }
            }

            #[must_use]
            pub fn argument_kind(self) -> ArgumentKind {
                match self {
                    $( Keyword::$variant => ArgumentKind::$arg, )*
                }
            }
        }

        impl FromStr for Keyword {
            type Err = SchemaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Keyword::$variant), )*
                    _ => Err(SchemaError::UnknownKeyword(s.to_string())),
                }
            }
        }
    };
}

keywords! {
    Action => "action": Name,
    Anydata => "anydata": Name,
    Anyxml => "anyxml": Name,
    Argument => "argument": Name,
    Augment => "augment": Value,
    Base => "base": Name,
    BelongsTo => "belongs-to": Name,
    Bit => "bit": Name,
    Case => "case": Name,
    Choice => "choice": Name,
    Config => "config": Value,
    Contact => "contact": Text,
    Container => "container": Name,
    Default => "default": Value,
    Description => "description": Text,
    Deviate => "deviate": Value,
    Deviation => "deviation": Value,
    Enum => "enum": Name,
    ErrorAppTag => "error-app-tag": Value,
    ErrorMessage => "error-message": Text,
    Extension => "extension": Name,
    Feature => "feature": Name,
    FractionDigits => "fraction-digits": Value,
    Grouping => "grouping": Name,
    Identity => "identity": Name,
    IfFeature => "if-feature": Value,
    Import => "import": Name,
    Include => "include": Name,
    Input => "input": None,
    Key => "key": Value,
    Leaf => "leaf": Name,
    LeafList => "leaf-list": Name,
    Length => "length": Value,
    List => "list": Name,
    Mandatory => "mandatory": Value,
    MaxElements => "max-elements": Value,
    MinElements => "min-elements": Value,
    Modifier => "modifier": Value,
    Module => "module": Name,
    Must => "must": Value,
    Namespace => "namespace": Uri,
    Notification => "notification": Name,
    OrderedBy => "ordered-by": Value,
    Organization => "organization": Text,
    Output => "output": None,
    Path => "path": Value,
    Pattern => "pattern": Value,
    Position => "position": Value,
    Prefix => "prefix": Value,
    Presence => "presence": Value,
    Range => "range": Value,
    Reference => "reference": Text,
    Refine => "refine": Value,
    RequireInstance => "require-instance": Value,
    Revision => "revision": Value,
    RevisionDate => "revision-date": Value,
    Rpc => "rpc": Name,
    Status => "status": Value,
    Submodule => "submodule": Name,
    Type => "type": Name,
    Typedef => "typedef": Name,
    Unique => "unique": Value,
    Units => "units": Value,
    Uses => "uses": Name,
    Value => "value": Value,
    When => "when": Value,
    YangVersion => "yang-version": Value,
    YinElement => "yin-element": Value,
}

impl Keyword {
    /// Statements that define a node in the schema tree and can therefore be
    /// addressed by a schema-node identifier.
    #[must_use]
    pub fn defines_schema_node(self) -> bool {
        matches!(
            self,
            Keyword::Action
                | Keyword::Anydata
                | Keyword::Anyxml
                | Keyword::Case
                | Keyword::Choice
                | Keyword::Container
                | Keyword::Input
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Notification
                | Keyword::Output
                | Keyword::Rpc
        )
    }

    #[must_use]
    pub fn defines_data_node(self) -> bool {
        matches!(
            self,
            Keyword::Anydata
                | Keyword::Anyxml
                | Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
        )
    }

    /// Data nodes that may appear directly under a `choice` without an
    /// enclosing `case`.
    #[must_use]
    pub fn may_be_shorthand_case(self) -> bool {
        matches!(
            self,
            Keyword::Anydata
                | Keyword::Anyxml
                | Keyword::Choice
                | Keyword::Container
                | Keyword::LeafList
                | Keyword::Leaf
                | Keyword::List
        )
    }

    /// Targets an `augment` may add content to.
    #[must_use]
    pub fn is_augmentable(self) -> bool {
        matches!(
            self,
            Keyword::Container
                | Keyword::List
                | Keyword::Choice
                | Keyword::Case
                | Keyword::Input
                | Keyword::Output
                | Keyword::Notification
        )
    }

    #[must_use]
    pub fn is_module_root(self) -> bool {
        matches!(self, Keyword::Module | Keyword::Submodule)
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
