//! Module: state
//! Responsibility: per-group median accumulation state and its lifecycle.
//! Does not own: wire encoding, catalog registration, or sink routing.
//! Boundary: the aggregate session creates, merges and consumes states here.

mod finalize;
mod merge;


use crate::{
    buffer::ValueBuffer,
    catalog::{CompareFn, Operator, RecvFn, SendFn, TypeCatalog, TypeId, TypeLayout, TypeOps},
    config::{MedianConfig, StorageStrategy},
    error::{ErrorOrigin, InternalError},
    obs::sink::{MetricsEvent, record},
    sort::{ExternalSort, SortStats},
    value::Value,
};
use std::{fmt, sync::Arc};

pub(crate) use finalize::finalize;
pub(crate) use merge::{adopt, merge_into};

///
/// ElementType
///
/// Element type of one state, resolved once when the state is created.
/// Caches the comparator and binary codec handles.
///

#[derive(Clone)]
pub struct ElementType {
    ops: Arc<dyn TypeOps>,
    compare: Operator<CompareFn>,
    send: Operator<SendFn>,
    recv: Operator<RecvFn>,
}

impl ElementType {
    /// Resolve a catalog type and its comparator.
    pub fn resolve(catalog: &TypeCatalog, id: TypeId) -> Result<Self, InternalError> {
        Self::from_ops(catalog.resolve(id)?)
    }

    /// Bind a capability table; the type must be ordered.
    pub fn from_ops(ops: Arc<dyn TypeOps>) -> Result<Self, InternalError> {
        let compare = ops.compare().ok_or_else(|| {
            InternalError::configuration(
                ErrorOrigin::Catalog,
                format!(
                    "could not identify a comparison function for type {}",
                    ops.name()
                ),
            )
        })?;
        let send = ops.send();
        let recv = ops.recv();

        Ok(Self {
            ops,
            compare,
            send,
            recv,
        })
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.ops.type_id()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.ops.name()
    }

    #[must_use]
    pub fn layout(&self) -> TypeLayout {
        self.ops.layout()
    }

    #[must_use]
    pub const fn compare(&self) -> Operator<CompareFn> {
        self.compare
    }

    #[must_use]
    pub const fn send(&self) -> Operator<SendFn> {
        self.send
    }

    #[must_use]
    pub const fn recv(&self) -> Operator<RecvFn> {
        self.recv
    }

    #[must_use]
    pub fn ops(&self) -> &dyn TypeOps {
        self.ops.as_ref()
    }

    /// Two element types are interchangeable when both the type and the
    /// ordering agree.
    #[must_use]
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.type_id() == other.type_id() && self.compare.id == other.compare.id
    }

    fn check_accepts(&self, value: &Value) -> Result<(), InternalError> {
        if self.ops.accepts(value) {
            return Ok(());
        }

        Err(InternalError::state_misuse(format!(
            "{} value passed to median over {}",
            value.label(),
            self.name()
        )))
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementType")
            .field("type_id", &self.type_id())
            .field("name", &self.name())
            .field("layout", &self.layout())
            .field("compare", &self.compare)
            .finish_non_exhaustive()
    }
}

///
/// Storage
///
/// Backing store of one state; fixed for the state's lifetime.
///

#[derive(Debug)]
pub(crate) enum Storage {
    Buffer(ValueBuffer),
    Sort(ExternalSort),
}

impl Storage {
    fn allocate(
        element: &ElementType,
        config: &MedianConfig,
        expected_rows: Option<usize>,
    ) -> Result<Self, InternalError> {
        match config.strategy {
            StorageStrategy::InMemory => {
                let buffer = match expected_rows {
                    Some(rows) => ValueBuffer::with_capacity(rows)?,
                    None => ValueBuffer::new()?,
                };
                Ok(Self::Buffer(buffer))
            }
            StorageStrategy::ExternalSort => Ok(Self::Sort(ExternalSort::new(
                element.compare().func,
                element.send().func,
                element.recv().func,
                config,
            ))),
        }
    }

    fn append(&mut self, value: Value) -> Result<(), InternalError> {
        match self {
            Self::Buffer(buffer) => buffer.append(value),
            Self::Sort(sort) => sort.put(value),
        }
    }

    fn len(&self) -> u64 {
        match self {
            Self::Buffer(buffer) => buffer.len() as u64,
            Self::Sort(sort) => sort.len(),
        }
    }

    fn for_each_value(
        &self,
        mut f: impl FnMut(&Value) -> Result<(), InternalError>,
    ) -> Result<(), InternalError> {
        match self {
            Self::Buffer(buffer) => buffer.iter().try_for_each(f),
            Self::Sort(sort) => sort.for_each_staged(&mut f),
        }
    }

    const fn strategy(&self) -> StorageStrategy {
        match self {
            Self::Buffer(_) => StorageStrategy::InMemory,
            Self::Sort(_) => StorageStrategy::ExternalSort,
        }
    }
}

///
/// MedianState
///
/// Accumulated values of one group.
///
/// `row_count` always equals the number of values held by `storage`.
/// Nulls never reach a state. Dropping the state releases its memory and
/// any spill files.
///

#[derive(Debug)]
pub struct MedianState {
    element: ElementType,
    storage: Storage,
    row_count: u64,
}

impl MedianState {
    /// Build an empty state for a new group using the configured strategy.
    pub fn new(element: ElementType, config: &MedianConfig) -> Result<Self, InternalError> {
        let state = Self::allocate(element, config, None)?;
        record(MetricsEvent::StateCreated {
            type_name: state.element.name(),
        });

        Ok(state)
    }

    /// Build an empty state sized for `rows` values when buffer-backed.
    ///
    /// Used for copies of existing partials, so no group creation is recorded.
    pub fn with_expected_rows(
        element: ElementType,
        config: &MedianConfig,
        rows: usize,
    ) -> Result<Self, InternalError> {
        Self::allocate(element, config, Some(rows))
    }

    fn allocate(
        element: ElementType,
        config: &MedianConfig,
        expected_rows: Option<usize>,
    ) -> Result<Self, InternalError> {
        let storage = Storage::allocate(&element, config, expected_rows)?;

        Ok(Self {
            element,
            storage,
            row_count: 0,
        })
    }

    #[must_use]
    pub const fn element(&self) -> &ElementType {
        &self.element
    }

    #[must_use]
    pub const fn row_count(&self) -> u64 {
        self.row_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    #[must_use]
    pub const fn strategy(&self) -> StorageStrategy {
        self.storage.strategy()
    }

    /// Spill activity, for sort-backed states.
    #[must_use]
    pub const fn sort_stats(&self) -> Option<SortStats> {
        match &self.storage {
            Storage::Sort(sort) => Some(sort.stats()),
            Storage::Buffer(_) => None,
        }
    }

    /// Copy one caller-owned value into the state.
    pub fn ingest(&mut self, value: &Value) -> Result<(), InternalError> {
        self.element.check_accepts(value)?;
        self.push(value.clone())?;
        record(MetricsEvent::RowIngested {
            type_name: self.element.name(),
        });

        Ok(())
    }

    /// Move one owned value into the state.
    pub(crate) fn ingest_owned(&mut self, value: Value) -> Result<(), InternalError> {
        self.element.check_accepts(&value)?;
        self.push(value)
    }

    /// Visit every value in storage order.
    pub fn for_each_value(
        &self,
        f: impl FnMut(&Value) -> Result<(), InternalError>,
    ) -> Result<(), InternalError> {
        self.storage.for_each_value(f)
    }

    fn push(&mut self, value: Value) -> Result<(), InternalError> {
        self.storage.append(value)?;
        self.row_count += 1;
        debug_assert_eq!(self.row_count, self.storage.len());

        Ok(())
    }
}
