use crate::{
    Error,
    core::{
        aggregate::MedianAggregate,
        catalog::{TypeCatalog, TypeId},
        config::MedianConfig,
        error::InternalError,
        state::MedianState,
        value::Value,
    },
};
use std::sync::Arc;

///
/// Median
///
/// Public median aggregate. Same calls as the core `MedianAggregate`,
/// with errors mapped onto the public taxonomy.
///

#[derive(Clone, Debug)]
pub struct Median {
    inner: MedianAggregate,
}

impl Median {
    pub fn new(
        catalog: Arc<TypeCatalog>,
        input_type: Option<TypeId>,
        config: MedianConfig,
    ) -> Result<Self, Error> {
        let inner = MedianAggregate::new(catalog, input_type, config)?;

        Ok(Self { inner })
    }

    /// In-memory median over one builtin type.
    #[must_use]
    pub fn builtin(input_type: TypeId) -> Self {
        Self {
            inner: MedianAggregate::builtin(input_type),
        }
    }

    /// Median over one builtin type with a TOML resource policy.
    pub fn from_toml(input_type: TypeId, config: &str) -> Result<Self, Error> {
        let config = MedianConfig::from_toml_str(config).map_err(InternalError::from)?;

        Self::new(Arc::new(TypeCatalog::builtin()), Some(input_type), config)
    }

    #[must_use]
    pub const fn aggregate(&self) -> &MedianAggregate {
        &self.inner
    }

    pub fn transition(
        &self,
        state: Option<MedianState>,
        value: Option<&Value>,
    ) -> Result<MedianState, Error> {
        Ok(self.inner.transition(state, value)?)
    }

    pub fn combine(
        &self,
        dest: Option<MedianState>,
        src: Option<&MedianState>,
    ) -> Result<Option<MedianState>, Error> {
        Ok(self.inner.combine(dest, src)?)
    }

    pub fn serialize(&self, state: &MedianState) -> Result<Vec<u8>, Error> {
        Ok(self.inner.serialize(state)?)
    }

    pub fn deserialize(&self, bytes: &[u8]) -> Result<MedianState, Error> {
        Ok(self.inner.deserialize(bytes)?)
    }

    pub fn finalize(&self, state: Option<MedianState>) -> Result<Option<Value>, Error> {
        Ok(self.inner.finalize(state)?)
    }

    /// Fold a whole group and finalize it.
    pub fn median_of<'a>(
        &self,
        rows: impl IntoIterator<Item = Option<&'a Value>>,
    ) -> Result<Option<Value>, Error> {
        let mut state = None;
        for row in rows {
            state = Some(self.transition(state, row)?);
        }

        self.finalize(state)
    }
}
