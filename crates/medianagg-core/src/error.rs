use crate::config::ConfigError;
use std::{collections::TryReserveError, fmt, io};
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; the public facade maps it onto its own taxonomy.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a configuration error for a specific origin.
    pub(crate) fn configuration(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Configuration, origin, message)
    }

    /// Construct a resource-exhaustion error for a specific origin.
    pub(crate) fn resource_exhausted(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ResourceExhausted, origin, message)
    }

    /// Construct a protocol-misuse error for a specific origin.
    pub(crate) fn protocol_misuse(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::ProtocolMisuse, origin, message)
    }

    /// Construct a corruption error for a specific origin.
    pub(crate) fn corruption(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, origin, message)
    }

    /// Construct a codec-origin corruption error.
    pub(crate) fn codec_corruption(message: impl Into<String>) -> Self {
        Self::corruption(ErrorOrigin::Codec, message)
    }

    /// Construct a state-origin protocol misuse.
    pub(crate) fn state_misuse(message: impl Into<String>) -> Self {
        Self::protocol_misuse(ErrorOrigin::State, message)
    }

    /// Construct a sort-origin protocol misuse.
    pub(crate) fn sort_misuse(message: impl Into<String>) -> Self {
        Self::protocol_misuse(ErrorOrigin::Sort, message)
    }

    /// Map a failed reservation onto resource exhaustion.
    pub(crate) fn allocation(origin: ErrorOrigin, err: TryReserveError) -> Self {
        Self::resource_exhausted(origin, format!("out of memory: {err}"))
    }

    /// Map a spill-file I/O failure.
    ///
    /// Exhausted temporary storage is a resource error; anything else is
    /// reported as an internal spill failure.
    pub(crate) fn spill_io(context: &str, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::StorageFull
            | io::ErrorKind::QuotaExceeded
            | io::ErrorKind::OutOfMemory
            | io::ErrorKind::FileTooLarge => Self::resource_exhausted(
                ErrorOrigin::Spill,
                format!("temporary storage exhausted while {context}: {err}"),
            ),
            io::ErrorKind::UnexpectedEof => Self::corruption(
                ErrorOrigin::Spill,
                format!("truncated spill run while {context}: {err}"),
            ),
            _ => Self::new(
                ErrorClass::Internal,
                ErrorOrigin::Spill,
                format!("spill i/o failed while {context}: {err}"),
            ),
        }
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self.class, ErrorClass::Configuration)
    }

    #[must_use]
    pub const fn is_protocol_misuse(&self) -> bool {
        matches!(self.class, ErrorClass::ProtocolMisuse)
    }

    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self.class, ErrorClass::Corruption)
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Configuration,
    ResourceExhausted,
    ProtocolMisuse,
    Corruption,
    Arithmetic,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configuration => "configuration",
            Self::ResourceExhausted => "resource_exhausted",
            Self::ProtocolMisuse => "protocol_misuse",
            Self::Corruption => "corruption",
            Self::Arithmetic => "arithmetic",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
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

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Catalog => "catalog",
            Self::Buffer => "buffer",
            Self::Sort => "sort",
            Self::Spill => "spill",
            Self::State => "state",
            Self::Codec => "codec",
            Self::Finalize => "finalize",
        };
        write!(f, "{label}")
    }
}
