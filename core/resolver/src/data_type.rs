//! The built-in YANG types and the member numbering of `bits` and
//! `enumeration`.

use rustc_hash::FxHashMap;
use yangkit_schema::{Schema, keyword::Keyword, statement::StatementId};

use crate::boundary::{Limits, Number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    String,
    Boolean,
    Enumeration,
    Bits,
    Binary,
    Leafref,
    Identityref,
    Empty,
    Union,
    InstanceIdentifier,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 19] = [
        BuiltinType::Int8,
        BuiltinType::Int16,
        BuiltinType::Int32,
        BuiltinType::Int64,
        BuiltinType::Uint8,
        BuiltinType::Uint16,
        BuiltinType::Uint32,
        BuiltinType::Uint64,
        BuiltinType::Decimal64,
        BuiltinType::String,
        BuiltinType::Boolean,
        BuiltinType::Enumeration,
        BuiltinType::Bits,
        BuiltinType::Binary,
        BuiltinType::Leafref,
        BuiltinType::Identityref,
        BuiltinType::Empty,
        BuiltinType::Union,
        BuiltinType::InstanceIdentifier,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinType::Int8 => "int8",
            BuiltinType::Int16 => "int16",
            BuiltinType::Int32 => "int32",
            BuiltinType::Int64 => "int64",
            BuiltinType::Uint8 => "uint8",
            BuiltinType::Uint16 => "uint16",
            BuiltinType::Uint32 => "uint32",
            BuiltinType::Uint64 => "uint64",
            BuiltinType::Decimal64 => "decimal64",
            BuiltinType::String => "string",
            BuiltinType::Boolean => "boolean",
            BuiltinType::Enumeration => "enumeration",
            BuiltinType::Bits => "bits",
            BuiltinType::Binary => "binary",
            BuiltinType::Leafref => "leafref",
            BuiltinType::Identityref => "identityref",
            BuiltinType::Empty => "empty",
            BuiltinType::Union => "union",
            BuiltinType::InstanceIdentifier => "instance-identifier",
        }
    }

    /// The built-in type called `name`. Prefixed names are never built-in.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|builtin| builtin.as_str() == name)
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        self.integer_limits().is_some() || self == BuiltinType::Decimal64
    }

    /// Whether a `length` restriction applies.
    #[must_use]
    pub fn takes_length(self) -> bool {
        matches!(self, BuiltinType::String | BuiltinType::Binary)
    }

    fn integer_limits(self) -> Option<(i128, i128)> {
        let limits = match self {
            BuiltinType::Int8 => (i128::from(i8::MIN), i128::from(i8::MAX)),
            BuiltinType::Int16 => (i128::from(i16::MIN), i128::from(i16::MAX)),
            BuiltinType::Int32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
            BuiltinType::Int64 => (i128::from(i64::MIN), i128::from(i64::MAX)),
            BuiltinType::Uint8 => (0, i128::from(u8::MAX)),
            BuiltinType::Uint16 => (0, i128::from(u16::MAX)),
            BuiltinType::Uint32 => (0, i128::from(u32::MAX)),
            BuiltinType::Uint64 => (0, i128::from(u64::MAX)),
            _ => return None,
        };
        Some(limits)
    }

    /// What `min` and `max` mean in a `range` of this type. For `decimal64`
    /// the 64-bit mantissa is scaled by `fraction_digits`.
    #[must_use]
    pub fn range_limits(self, fraction_digits: u32) -> Option<Limits> {
        if self == BuiltinType::Decimal64 {
            return Some(Limits {
                min: Number::new(i128::from(i64::MIN), fraction_digits),
                max: Number::new(i128::from(i64::MAX), fraction_digits),
            });
        }
        self.integer_limits().map(|(min, max)| Limits {
            min: Number::integer(min),
            max: Number::integer(max),
        })
    }
}

#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BuiltinType::from_name(name).is_some()
}

/// A type name that has to be looked up as a `typedef`.
#[must_use]
pub fn is_derived(name: &str) -> bool {
    !name.trim().is_empty() && !is_builtin(name)
}

/// The built-in type a `type` statement names, if any.
#[must_use]
pub fn builtin_of(schema: &Schema, type_statement: StatementId) -> Option<BuiltinType> {
    BuiltinType::from_name(schema.identifier(type_statement))
}

#[must_use]
pub fn fraction_digits(schema: &Schema, type_statement: StatementId) -> u32 {
    schema
        .arena
        .first_child_of_kind(type_statement, Keyword::FractionDigits)
        .and_then(|digits| schema.identifier(digits).parse().ok())
        .unwrap_or(0)
}

/// Position of each `bit`, explicit or one past the highest seen so far.
#[must_use]
pub fn bit_positions(schema: &Schema, type_statement: StatementId) -> FxHashMap<String, i64> {
    member_numbering(schema, type_statement, Keyword::Bit, Keyword::Position)
}

/// Value of each `enum`, explicit or one past the highest seen so far.
#[must_use]
pub fn enum_values(schema: &Schema, type_statement: StatementId) -> FxHashMap<String, i64> {
    member_numbering(schema, type_statement, Keyword::Enum, Keyword::Value)
}

fn member_numbering(
    schema: &Schema,
    type_statement: StatementId,
    member: Keyword,
    number: Keyword,
) -> FxHashMap<String, i64> {
    let mut result = FxHashMap::default();
    let mut highest: Option<i64> = None;
    for child in schema.arena.children_of_kind(type_statement, member) {
        let explicit = schema
            .arena
            .first_child_of_kind(child, number)
            .and_then(|value| schema.identifier(value).parse::<i64>().ok());
        let assigned = explicit.unwrap_or_else(|| highest.map_or(0, |value| value.saturating_add(1)));
        highest = Some(highest.map_or(assigned, |value| value.max(assigned)));
        result.insert(schema.identifier(child).to_string(), assigned);
    }
    result
}

/// Names of the member types of a type, with nested unions expanded in order.
/// A non-union type yields its own name.
#[must_use]
pub fn flattened_type_names(schema: &Schema, type_statement: StatementId) -> Vec<String> {
    if builtin_of(schema, type_statement) != Some(BuiltinType::Union) {
        return vec![schema.identifier(type_statement).to_string()];
    }
    schema
        .arena
        .children_of_kind(type_statement, Keyword::Type)
        .into_iter()
        .flat_map(|member| flattened_type_names(schema, member))
        .collect()
}
