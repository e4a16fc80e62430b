//! ## Crate layout
//! - `core`: values, type catalog, accumulation storage, and the median state.
//! - `error`: public error taxonomy mapped from core errors.
//!
//! `Median` is the entry point: fold rows with `transition`, merge partial
//! states with `combine`, move them between workers with `serialize` /
//! `deserialize`, and read the result with `finalize`.

pub use medianagg_core as core;

pub mod error;
mod median;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Error, ErrorKind, ErrorOrigin};
pub use median::Median;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error, Median,
        core::prelude::{
            Decimal, Float64, MedianConfig, MedianState, StorageStrategy, TypeCatalog, TypeId,
            TypeOps, Value,
        },
    };
}
