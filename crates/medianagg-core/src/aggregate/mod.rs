//! Module: aggregate
//! Responsibility: host-facing median aggregate entrypoints over optional states.
//! Does not own: storage, ordering, or wire layout.
//! Boundary: the five calls a host aggregate framework makes per group.

#[cfg(test)]
mod tests;

use crate::{
    catalog::{TypeCatalog, TypeId},
    codec,
    config::MedianConfig,
    error::{ErrorOrigin, InternalError},
    obs::sink::{ExecKind, MetricsEvent, Span, record},
    state::{self, ElementType, MedianState},
    value::Value,
};
use std::sync::Arc;

const UNKNOWN_TYPE_LABEL: &str = "unknown";

///
/// MedianAggregate
///
/// Median aggregate bound to a catalog, a declared input type, and a
/// resource policy.
///
/// States are passed by value in and out of each call. A group that never
/// saw a row has no state (`None`); a group that only saw nulls has an
/// empty state. Finalization consumes the state.
///

#[derive(Clone, Debug)]
pub struct MedianAggregate {
    catalog: Arc<TypeCatalog>,
    input_type: Option<TypeId>,
    config: MedianConfig,
}

impl MedianAggregate {
    /// Build an aggregate; the configuration is validated up front.
    pub fn new(
        catalog: Arc<TypeCatalog>,
        input_type: Option<TypeId>,
        config: MedianConfig,
    ) -> Result<Self, InternalError> {
        config.validate()?;

        Ok(Self {
            catalog,
            input_type,
            config,
        })
    }

    /// In-memory median over one builtin type.
    #[must_use]
    pub fn builtin(input_type: TypeId) -> Self {
        Self {
            catalog: Arc::new(TypeCatalog::builtin()),
            input_type: Some(input_type),
            config: MedianConfig::default(),
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &Arc<TypeCatalog> {
        &self.catalog
    }

    #[must_use]
    pub const fn input_type(&self) -> Option<TypeId> {
        self.input_type
    }

    #[must_use]
    pub const fn config(&self) -> &MedianConfig {
        &self.config
    }

    /// Fold one row into a group's state.
    ///
    /// The first call creates the state, even for a null row. Nulls are
    /// otherwise ignored.
    pub fn transition(
        &self,
        state: Option<MedianState>,
        value: Option<&Value>,
    ) -> Result<MedianState, InternalError> {
        let mut state = match state {
            Some(state) => state,
            None => self.create_state()?,
        };

        match value {
            Some(value) => state.ingest(value)?,
            None => record(MetricsEvent::NullSkipped),
        }

        Ok(state)
    }

    /// Merge a partial state into an accumulating one.
    ///
    /// `src` is only read. Merging the same partial twice counts its rows
    /// twice; callers merge each partial at most once.
    pub fn combine(
        &self,
        dest: Option<MedianState>,
        src: Option<&MedianState>,
    ) -> Result<Option<MedianState>, InternalError> {
        let Some(src) = src else {
            return Ok(dest);
        };

        let mut span = Span::new(ExecKind::Merge, src.element().name());
        span.set_rows(src.row_count());

        match dest {
            None => state::adopt(src, &self.config).map(Some),
            Some(mut dest) => {
                state::merge_into(&mut dest, src)?;
                Ok(Some(dest))
            }
        }
    }

    /// Encode a state for transfer.
    pub fn serialize(&self, state: &MedianState) -> Result<Vec<u8>, InternalError> {
        let mut span = Span::new(ExecKind::Serialize, state.element().name());
        span.set_rows(state.row_count());

        codec::serialize(state)
    }

    /// Decode a transferred state into a buffer-backed state.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<MedianState, InternalError> {
        let mut span = Span::new(ExecKind::Deserialize, self.input_type_label());
        let state = codec::deserialize(&self.catalog, bytes)?;
        span.set_rows(state.row_count());

        if let Some(expected) = self.input_type
            && state.element().type_id() != expected
        {
            return Err(InternalError::state_misuse(format!(
                "received median state over {} ({}), aggregate input is {expected}",
                state.element().name(),
                state.element().type_id(),
            )));
        }

        Ok(state)
    }

    /// Compute the median, consuming the state.
    pub fn finalize(&self, state: Option<MedianState>) -> Result<Option<Value>, InternalError> {
        let Some(state) = state else {
            return Ok(None);
        };

        let mut span = Span::new(ExecKind::Finalize, state.element().name());
        span.set_rows(state.row_count());

        state::finalize(state)
    }

    fn create_state(&self) -> Result<MedianState, InternalError> {
        let input_type = self.input_type.ok_or_else(|| {
            InternalError::configuration(ErrorOrigin::State, "could not determine input data type")
        })?;
        let element = ElementType::resolve(&self.catalog, input_type)?;

        MedianState::new(element, &self.config)
    }

    fn input_type_label(&self) -> &'static str {
        self.input_type
            .and_then(|id| self.catalog.lookup(id))
            .map_or(UNKNOWN_TYPE_LABEL, |ops| ops.name())
    }
}
