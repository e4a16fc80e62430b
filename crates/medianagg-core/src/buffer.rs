//! Module: buffer
//! Responsibility: in-memory accumulation of owned values with geometric growth.
//! Does not own: comparator resolution or median selection.
//! Boundary: storage backend for the in-memory strategy and for decoded states.

use crate::{
    catalog::CompareFn,
    error::{ErrorOrigin, InternalError},
    value::Value,
};

///
/// CONSTANTS
///

/// Capacity allocated for a fresh buffer.
pub const INITIAL_CAPACITY: usize = 8;

/// Capacity multiplier applied when a buffer is full.
pub const GROWTH_FACTOR: usize = 2;

///
/// ValueBuffer
///
/// Growable, insertion-ordered value storage.
///
/// `capacity` is the logical allocation the buffer has committed to; it
/// starts at `INITIAL_CAPACITY` and doubles whenever an append finds the
/// buffer full. Allocation failure is reported, never retried.
///

#[derive(Clone, Debug, Default)]
pub struct ValueBuffer {
    values: Vec<Value>,
    capacity: usize,
}

impl ValueBuffer {
    /// Build an empty buffer with the initial capacity.
    pub fn new() -> Result<Self, InternalError> {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Build an empty buffer sized for exactly `capacity` values.
    pub fn with_capacity(capacity: usize) -> Result<Self, InternalError> {
        let mut values = Vec::new();
        values
            .try_reserve_exact(capacity)
            .map_err(|err| InternalError::allocation(ErrorOrigin::Buffer, err))?;

        Ok(Self { values, capacity })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one owned value, doubling capacity when full.
    pub fn append(&mut self, value: Value) -> Result<(), InternalError> {
        if self.values.len() >= self.capacity {
            let next = self.capacity.max(1).saturating_mul(GROWTH_FACTOR);
            self.grow_to(next)?;
        }
        self.values.push(value);

        Ok(())
    }

    /// Grow to hold exactly `total` values if the buffer is smaller.
    pub fn reserve_exact_total(&mut self, total: usize) -> Result<(), InternalError> {
        if total > self.capacity {
            self.grow_to(total)?;
        }

        Ok(())
    }

    /// Values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Approximate footprint of the buffered values.
    #[must_use]
    pub fn estimated_bytes(&self) -> usize {
        self.values.iter().map(Value::estimated_bytes).sum()
    }

    /// Sort in place and expose the ascending values.
    ///
    /// The sort is unstable; equal elements are interchangeable for the
    /// median so their relative order is not preserved.
    pub fn sorted_view(&mut self, compare: CompareFn) -> &[Value] {
        self.values.sort_unstable_by(compare);

        &self.values
    }

    fn grow_to(&mut self, capacity: usize) -> Result<(), InternalError> {
        let additional = capacity.saturating_sub(self.values.len());
        self.values
            .try_reserve_exact(additional)
            .map_err(|err| InternalError::allocation(ErrorOrigin::Buffer, err))?;
        self.capacity = capacity;

        Ok(())
    }
}

///
/// TESTS
///
