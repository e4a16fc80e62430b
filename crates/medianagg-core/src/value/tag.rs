use crate::value::Value;

///
/// ValueTag
///
/// Stable canonical value-variant tag used by diagnostics and type matching.
///
/// IMPORTANT:
/// Tag values are part of stable behavior and must remain fixed.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueTag {
    Blob = 1,
    Bool = 2,
    Decimal = 3,
    Float64 = 4,
    Int = 5,
    Text = 6,
    Uint = 7,
}

impl ValueTag {
    /// Stable byte tag for this variant.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Stable human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Blob => "Blob",
            Self::Bool => "Bool",
            Self::Decimal => "Decimal",
            Self::Float64 => "Float64",
            Self::Int => "Int",
            Self::Text => "Text",
            Self::Uint => "Uint",
        }
    }
}

/// Stable canonical variant tag for one value.
#[must_use]
pub(super) const fn canonical_tag(value: &Value) -> ValueTag {
    match value {
        Value::Blob(_) => ValueTag::Blob,
        Value::Bool(_) => ValueTag::Bool,
        Value::Decimal(_) => ValueTag::Decimal,
        Value::Float64(_) => ValueTag::Float64,
        Value::Int(_) => ValueTag::Int,
        Value::Text(_) => ValueTag::Text,
        Value::Uint(_) => ValueTag::Uint,
    }
}
