//! Which core statements may appear under which, and how often.

use crate::keyword::Keyword::{
    self, Action, Anydata, Anyxml, Argument, Augment, Base, BelongsTo, Bit, Case, Choice, Config,
    Contact, Container, Default, Description, Deviate, Deviation, Enum, ErrorAppTag, ErrorMessage,
    Extension, Feature, FractionDigits, Grouping, Identity, IfFeature, Import, Include, Input, Key,
    Leaf, LeafList, Length, List, Mandatory, MaxElements, MinElements, Modifier, Must, Namespace,
    Notification, OrderedBy, Organization, Output, Path, Pattern, Position, Prefix, Presence,
    Range, Reference, Refine, RequireInstance, Revision, RevisionDate, Rpc, Status, Type, Typedef,
    Unique, Units, Uses, Value, When, YangVersion,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub optional_single: &'static [Keyword],
    pub optional_multiple: &'static [Keyword],
    pub mandatory_single: &'static [Keyword],
    pub mandatory_multiple: &'static [Keyword],
}

const NONE: &[Keyword] = &[];
const DESCRIPTIVE: &[Keyword] = &[Description, Reference];

const fn table(
    optional_single: &'static [Keyword],
    optional_multiple: &'static [Keyword],
    mandatory_single: &'static [Keyword],
    mandatory_multiple: &'static [Keyword],
) -> Cardinality {
    Cardinality {
        optional_single,
        optional_multiple,
        mandatory_single,
        mandatory_multiple,
    }
}

const OPERATION: Cardinality = table(
    &[Description, Input, Output, Reference, Status],
    &[Grouping, IfFeature, Typedef],
    NONE,
    NONE,
);

const ANY: Cardinality = table(
    &[Config, Description, Mandatory, Reference, Status, When],
    &[IfFeature, Must],
    NONE,
    NONE,
);

const ENUM_OR_BIT_COMMON: &[Keyword] = &[IfFeature];

const CONSTRAINT: Cardinality = table(
    &[Description, ErrorAppTag, ErrorMessage, Reference],
    NONE,
    NONE,
    NONE,
);

const INPUT_OUTPUT: Cardinality = table(
    DESCRIPTIVE,
    &[
        Anydata, Anyxml, Choice, Container, Grouping, Leaf, LeafList, List, Must, Typedef, Uses,
    ],
    NONE,
    NONE,
);

const MODULE_BODY: &[Keyword] = &[
    Anydata,
    Anyxml,
    Augment,
    Choice,
    Container,
    Deviation,
    Extension,
    Feature,
    Grouping,
    Identity,
    Import,
    Include,
    Leaf,
    LeafList,
    List,
    Notification,
    Revision,
    Rpc,
    Typedef,
    Uses,
];

const MODULE_HEADER: &[Keyword] = &[Contact, Description, Organization, Reference, YangVersion];

/// Child cardinalities of `parent` as laid down by RFC 7950.
#[must_use]
pub fn cardinality(parent: Keyword) -> Cardinality {
    match parent {
        Action | Rpc => OPERATION,
        Anydata | Anyxml => ANY,
        Augment => table(
            &[Description, Reference, Status, When],
            &[
                Action,
                Anydata,
                Anyxml,
                Case,
                Choice,
                Container,
                IfFeature,
                Leaf,
                LeafList,
                List,
                Notification,
                Uses,
            ],
            NONE,
            NONE,
        ),
        BelongsTo => table(NONE, NONE, &[Prefix], NONE),
        Bit => table(
            &[Description, Position, Reference, Status],
            ENUM_OR_BIT_COMMON,
            NONE,
            NONE,
        ),
        Enum => table(
            &[Description, Value, Reference, Status],
            ENUM_OR_BIT_COMMON,
            NONE,
            NONE,
        ),
        Case => table(
            &[Description, Reference, Status, When],
            &[
                Anydata, Anyxml, Choice, Container, IfFeature, Leaf, LeafList, List, Uses,
            ],
            NONE,
            NONE,
        ),
        Choice => table(
            &[
                Config,
                Default,
                Description,
                Mandatory,
                Reference,
                Status,
                When,
            ],
            &[
                Anydata, Anyxml, Case, Choice, Container, IfFeature, Leaf, LeafList, List,
            ],
            NONE,
            NONE,
        ),
        Container => table(
            &[Config, Description, Presence, Reference, Status, When],
            &[
                Action,
                Anydata,
                Anyxml,
                Choice,
                Container,
                Grouping,
                IfFeature,
                Leaf,
                LeafList,
                List,
                Must,
                Notification,
                Typedef,
                Uses,
            ],
            NONE,
            NONE,
        ),
        Deviate => table(
            &[
                Config,
                Description,
                Mandatory,
                MaxElements,
                MinElements,
                Reference,
                Type,
                Units,
            ],
            &[Default, Must, Unique],
            NONE,
            NONE,
        ),
        Deviation => table(DESCRIPTIVE, NONE, NONE, &[Deviate]),
        Extension => table(
            &[Argument, Description, Reference, Status],
            NONE,
            NONE,
            NONE,
        ),
        Feature => table(
            &[Description, Reference, Status],
            &[IfFeature],
            NONE,
            NONE,
        ),
        Grouping => table(
            &[Description, Reference, Status],
            &[
                Action,
                Anydata,
                Anyxml,
                Choice,
                Container,
                Grouping,
                Leaf,
                LeafList,
                List,
                Notification,
                Typedef,
                Uses,
            ],
            NONE,
            NONE,
        ),
        Identity => table(
            &[Description, Reference, Status],
            &[Base, IfFeature],
            NONE,
            NONE,
        ),
        Import => table(
            &[Description, Reference, RevisionDate],
            NONE,
            &[Prefix],
            NONE,
        ),
        Include => table(&[Description, Reference, RevisionDate], NONE, NONE, NONE),
        Input | Output => INPUT_OUTPUT,
        Leaf => table(
            &[
                Config,
                Default,
                Description,
                Mandatory,
                Reference,
                Status,
                Units,
                When,
            ],
            &[IfFeature, Must],
            &[Type],
            NONE,
        ),
        LeafList => table(
            &[
                Config,
                Description,
                MaxElements,
                MinElements,
                OrderedBy,
                Reference,
                Status,
                Units,
                When,
            ],
            &[Default, IfFeature, Must],
            &[Type],
            NONE,
        ),
        Length | Range | Must => CONSTRAINT,
        Pattern => table(
            &[Description, ErrorAppTag, ErrorMessage, Modifier, Reference],
            NONE,
            NONE,
            NONE,
        ),
        List => table(
            &[
                Config,
                Description,
                Key,
                MaxElements,
                MinElements,
                OrderedBy,
                Reference,
                Status,
                When,
            ],
            &[
                Action,
                Anydata,
                Anyxml,
                Choice,
                Container,
                Grouping,
                IfFeature,
                Leaf,
                LeafList,
                List,
                Must,
                Notification,
                Typedef,
                Unique,
                Uses,
            ],
            NONE,
            NONE,
        ),
        Keyword::Module => table(MODULE_HEADER, MODULE_BODY, &[Namespace, Prefix], NONE),
        Keyword::Submodule => table(MODULE_HEADER, MODULE_BODY, &[BelongsTo], NONE),
        Notification => table(
            &[Description, Reference, Status],
            &[
                Anydata, Anyxml, Choice, Container, Grouping, IfFeature, Leaf, LeafList, List,
                Must, Typedef, Uses,
            ],
            NONE,
            NONE,
        ),
        Refine => table(
            &[
                Config,
                Description,
                Mandatory,
                MaxElements,
                MinElements,
                Presence,
                Reference,
            ],
            &[Default, IfFeature, Must],
            NONE,
            NONE,
        ),
        Type => table(
            &[
                Description,
                FractionDigits,
                Length,
                Path,
                Range,
                RequireInstance,
                Reference,
            ],
            &[Base, Bit, Enum, Pattern, Type],
            NONE,
            NONE,
        ),
        Typedef => table(
            &[Default, Description, Reference, Status, Units],
            NONE,
            &[Type],
            NONE,
        ),
        Uses => table(
            &[Description, Reference, Status, When],
            &[Augment, IfFeature, Refine],
            NONE,
            NONE,
        ),
        Description | Reference | Contact | Organization | ErrorMessage => {
            table(NONE, NONE, NONE, NONE)
        }
        _ => table(DESCRIPTIVE, NONE, NONE, NONE),
    }
}

/// Whether `child` may appear under `parent` at all.
#[must_use]
pub fn is_allowed_child(parent: Keyword, child: Keyword) -> bool {
    let c = cardinality(parent);
    c.optional_single.contains(&child)
        || c.optional_multiple.contains(&child)
        || c.mandatory_single.contains(&child)
        || c.mandatory_multiple.contains(&child)
}

#[must_use]
pub fn allowed_children(parent: Keyword) -> Vec<Keyword> {
    let c = cardinality(parent);
    let mut children: Vec<Keyword> = c
        .optional_single
        .iter()
        .chain(c.optional_multiple)
        .chain(c.mandatory_single)
        .chain(c.mandatory_multiple)
        .copied()
        .collect();
    children.sort();
    children.dedup();
    children
}

#[must_use]
pub fn may_have_multiple(parent: Keyword, child: Keyword) -> bool {
    let c = cardinality(parent);
    c.optional_multiple.contains(&child) || c.mandatory_multiple.contains(&child)
}

#[must_use]
pub fn is_mandatory_child(parent: Keyword, child: Keyword) -> bool {
    let c = cardinality(parent);
    c.mandatory_single.contains(&child) || c.mandatory_multiple.contains(&child)
}

#[must_use]
pub fn allows_optional_multiple(parent: Keyword, child: Keyword) -> bool {
    cardinality(parent).optional_multiple.contains(&child)
}
