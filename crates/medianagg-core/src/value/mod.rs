mod compare;
mod tag;

#[cfg(test)]
mod tests;

use crate::types::{Decimal, Float64};
use serde::{Deserialize, Serialize};
use std::mem::size_of;

// re-exports
pub use compare::canonical_cmp;
pub use tag::ValueTag;

///
/// Value
///
/// One accumulated, non-null aggregate input.
/// SQL NULL is modelled as `Option::<Value>::None` at the aggregate boundary
/// and never reaches storage.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Blob(Vec<u8>),
    Bool(bool),
    Decimal(Decimal),
    Float64(Float64),
    Int(i64),
    Text(String),
    Uint(u64),
}

impl Value {
    /// Build a `Float64` value, rejecting non-finite input.
    #[must_use]
    pub fn float64(v: f64) -> Option<Self> {
        Float64::try_new(v).map(Self::Float64)
    }

    #[must_use]
    pub const fn tag(&self) -> ValueTag {
        tag::canonical_tag(self)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.tag().label()
    }

    /// Approximate in-memory footprint, used for sort-engine budgeting.
    #[must_use]
    pub const fn estimated_bytes(&self) -> usize {
        let heap = match self {
            Self::Blob(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
            _ => 0,
        };

        size_of::<Self>() + heap
    }

    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<Float64> for Value {
    fn from(v: Float64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}
