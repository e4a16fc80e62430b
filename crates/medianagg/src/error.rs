use derive_more::Display;
use medianagg_core::error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(err.class.into(), err.origin.into(), err.message)
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Input type, catalog, or config cannot support the request.
    Configuration,

    /// Memory or temporary storage ran out.
    ResourceExhausted,

    /// Calls arrived out of order or with mismatched states.
    ProtocolMisuse,

    /// A serialized state or spill run failed validation.
    MalformedState,

    /// The type's averaging operators overflowed.
    Arithmetic,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::Configuration => Self::Configuration,
            ErrorClass::ResourceExhausted => Self::ResourceExhausted,
            ErrorClass::ProtocolMisuse => Self::ProtocolMisuse,
            ErrorClass::Corruption => Self::MalformedState,
            ErrorClass::Arithmetic => Self::Arithmetic,
            ErrorClass::Internal => Self::Internal,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Catalog,
    Buffer,
    Sort,
    Spill,
    State,
    Codec,
    Finalize,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Catalog => Self::Catalog,
            CoreErrorOrigin::Buffer => Self::Buffer,
            CoreErrorOrigin::Sort => Self::Sort,
            CoreErrorOrigin::Spill => Self::Spill,
            CoreErrorOrigin::State => Self::State,
            CoreErrorOrigin::Codec => Self::Codec,
            CoreErrorOrigin::Finalize => Self::Finalize,
        }
    }
}

///
/// TESTS
///
