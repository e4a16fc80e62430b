use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// Float64
///
/// Finite f64 only; -0.0 canonically stored as 0.0
///

#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Display, Serialize)]
pub struct Float64(f64);

impl Float64 {
    #[must_use]
    /// Fallible constructor that rejects non-finite values and normalizes -0.0.
    pub fn try_new(v: f64) -> Option<Self> {
        if !v.is_finite() {
            return None;
        }

        // canonicalize -0.0 to 0.0 so Eq and Ord are consistent
        Some(Self(if v == 0.0 { 0.0 } else { v }))
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    #[must_use]
    pub const fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_bits().to_be_bytes()
    }

    pub fn try_from_bytes(bytes: &[u8]) -> Result<Self, Float64DecodeError> {
        let buf: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Float64DecodeError::InvalidSize { len: bytes.len() })?;
        let value = f64::from_bits(u64::from_be_bytes(buf));

        Self::try_new(value).ok_or(Float64DecodeError::NonFinite)
    }

    /// Checked sum; `None` when the result leaves the finite range.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        Self::try_new(self.0 + other.0)
    }

    /// Checked quotient; `None` on division by zero or overflow.
    #[must_use]
    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.0 == 0.0 {
            return None;
        }

        Self::try_new(self.0 / other.0)
    }
}

#[derive(Debug, ThisError)]
pub enum Float64DecodeError {
    #[error("invalid float64 length: {len} bytes")]
    InvalidSize { len: usize },
    #[error("non-finite float64 payload")]
    NonFinite,
}

impl From<i32> for Float64 {
    fn from(n: i32) -> Self {
        Self(f64::from(n))
    }
}

impl Eq for Float64 {}

impl PartialEq for Float64 {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Ord for Float64 {
    fn cmp(&self, other: &Self) -> Ordering {
        // no NaN and -0 normalized, so total_cmp agrees with numeric order
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Float64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'de> Deserialize<'de> for Float64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Self::try_new(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid Float64 value: {value}")))
    }
}

///
/// TESTS
///
