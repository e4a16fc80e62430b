//! Module: catalog
//! Responsibility: capability lookup from a value-type identifier to its
//! comparison, binary encode/decode, and averaging operators.
//! Does not own: operator invocation policy (states decide when to resolve).
//! Boundary: the only place the aggregate learns what a type can do.

mod builtin;

#[cfg(test)]
mod tests;

use crate::{
    error::{ErrorOrigin, InternalError},
    value::{Value, ValueTag},
};
use derive_more::Display;
use std::{cmp::Ordering, collections::BTreeMap, fmt, sync::Arc};

// re-exports
pub use builtin::BuiltinType;

///
/// Operator function shapes
///

pub type CompareFn = fn(&Value, &Value) -> Ordering;
pub type SendFn = fn(&Value, &mut Vec<u8>) -> Result<(), InternalError>;
pub type RecvFn = fn(&[u8]) -> Result<Value, InternalError>;
pub type ArithFn = fn(&Value, &Value) -> Result<Value, InternalError>;

///
/// TypeId
///
/// Stable identifier of one value type inside a catalog.
/// Builtin types use their `ValueTag` byte; host types start at
/// `TypeId::FIRST_CUSTOM`.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("type#{_0}")]
pub struct TypeId(pub u32);

impl TypeId {
    pub const BLOB: Self = Self::for_tag(ValueTag::Blob);
    pub const BOOL: Self = Self::for_tag(ValueTag::Bool);
    pub const DECIMAL: Self = Self::for_tag(ValueTag::Decimal);
    pub const FLOAT64: Self = Self::for_tag(ValueTag::Float64);
    pub const INT: Self = Self::for_tag(ValueTag::Int);
    pub const TEXT: Self = Self::for_tag(ValueTag::Text);
    pub const UINT: Self = Self::for_tag(ValueTag::Uint);

    /// First identifier available to host-registered types.
    pub const FIRST_CUSTOM: Self = Self(1024);

    /// Builtin type identifier for one value variant.
    #[must_use]
    pub const fn for_tag(tag: ValueTag) -> Self {
        Self(tag.to_u8() as u32)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

///
/// OpId
///
/// Stable identifier of one resolved operator.
/// Carried on the wire so independently produced partial states can be
/// checked for operator agreement before they are merged.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("op#{_0}")]
pub struct OpId(pub u32);

impl OpId {
    /// Builtin operator identifier for one type and slot.
    #[must_use]
    pub const fn builtin(type_id: TypeId, slot: OpSlot) -> Self {
        Self(type_id.0 * 16 + slot as u32)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

///
/// OpSlot
///

#[repr(u32)]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum OpSlot {
    Compare = 1,
    Send = 2,
    Recv = 3,
    Plus = 4,
    Divide = 5,
}

///
/// Operator
///
/// One resolved operator handle: identifier plus callable.
///

#[derive(Clone, Copy)]
pub struct Operator<F> {
    pub id: OpId,
    pub func: F,
}

impl<F> Operator<F> {
    pub const fn new(id: OpId, func: F) -> Self {
        Self { id, func }
    }
}

impl<F> fmt::Debug for Operator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Operator").field(&self.id).finish()
    }
}

///
/// TypeLayout
///
/// Physical representation flags of a value type.
/// `width` is the fixed byte width, or -1 for variable-width types.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TypeLayout {
    pub by_value: bool,
    pub width: i16,
}

impl TypeLayout {
    pub const VARIABLE: i16 = -1;

    #[must_use]
    pub const fn fixed(width: i16, by_value: bool) -> Self {
        Self { by_value, width }
    }

    #[must_use]
    pub const fn variable() -> Self {
        Self {
            by_value: false,
            width: Self::VARIABLE,
        }
    }

    #[must_use]
    pub const fn is_variable(self) -> bool {
        self.width == Self::VARIABLE
    }
}

///
/// TypeOps
///
/// Capability table for one value type.
///
/// `compare` must be a total order over the values the type accepts; the
/// median of a partial order is undefined. Averaging operators are optional
/// and only requested when an even-count median must be computed.
///

pub trait TypeOps: Send + Sync {
    fn type_id(&self) -> TypeId;

    fn name(&self) -> &'static str;

    fn layout(&self) -> TypeLayout;

    /// Whether `value` is a member of this type.
    fn accepts(&self, value: &Value) -> bool;

    fn compare(&self) -> Option<Operator<CompareFn>>;

    fn send(&self) -> Operator<SendFn>;

    fn recv(&self) -> Operator<RecvFn>;

    fn plus(&self) -> Option<Operator<ArithFn>> {
        None
    }

    fn divide(&self) -> Option<Operator<ArithFn>> {
        None
    }

    /// Construct the type's representation of a small integer literal.
    fn literal(&self, _n: i64) -> Option<Value> {
        None
    }
}

///
/// TypeCatalog
///
/// Registry of type capability tables keyed by `TypeId`.
///

#[derive(Clone, Default)]
pub struct TypeCatalog {
    entries: BTreeMap<TypeId, Arc<dyn TypeOps>>,
}

impl TypeCatalog {
    /// Build an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog holding one entry per builtin value variant.
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for ty in BuiltinType::ALL {
            catalog.entries.insert(ty.type_id(), Arc::new(ty));
        }

        catalog
    }

    /// Register one type; identifiers are never silently replaced.
    pub fn register(&mut self, ops: Arc<dyn TypeOps>) -> Result<(), InternalError> {
        let id = ops.type_id();
        if let Some(existing) = self.entries.get(&id) {
            return Err(InternalError::configuration(
                ErrorOrigin::Catalog,
                format!(
                    "type id {id} already registered as {}, cannot register {}",
                    existing.name(),
                    ops.name()
                ),
            ));
        }
        self.entries.insert(id, ops);

        Ok(())
    }

    #[must_use]
    pub fn lookup(&self, id: TypeId) -> Option<&Arc<dyn TypeOps>> {
        self.entries.get(&id)
    }

    /// Resolve one type or fail with a configuration error.
    pub fn resolve(&self, id: TypeId) -> Result<Arc<dyn TypeOps>, InternalError> {
        self.lookup(id).cloned().ok_or_else(|| {
            InternalError::configuration(ErrorOrigin::Catalog, format!("unknown input type {id}"))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(id, ops)| (id, ops.name())))
            .finish()
    }
}
