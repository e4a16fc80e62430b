//! Core runtime for MedianAgg: values, the type catalog, accumulation
//! storage, and the mergeable, serializable median aggregate state.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod aggregate;
pub mod buffer;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod obs;
pub mod sort;
pub mod state;
pub mod types;
pub mod value;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, codecs, or storage backends are re-exported here.
///

pub mod prelude {
    pub use crate::{
        aggregate::MedianAggregate,
        catalog::{TypeCatalog, TypeId, TypeOps},
        config::{MedianConfig, StorageStrategy},
        state::MedianState,
        types::{Decimal, Float64},
        value::Value,
    };
}
