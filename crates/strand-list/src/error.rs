//! Sequence-specific error types.

use std::error::Error;
use std::fmt;

use strand_pool::PoolError;

/// Errors that can occur during sequence operations.
///
/// Structural conditions (empty list, value not found, missing anchor) get
/// their own variants; pool failures are wrapped so callers can distinguish
/// structural errors from storage errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListError {
    /// The sequence has not been initialized, or has been cleaned up.
    /// Only `init` is valid in this state.
    Uninitialized,
    /// `init` was called on a sequence that is already active.
    AlreadyInitialized,
    /// A delete was attempted on an empty sequence.
    Empty,
    /// No node with the given value exists.
    ValueNotFound {
        /// The value that was searched for.
        value: u16,
    },
    /// The anchor node for an insert_before was not found by traversal.
    AnchorNotFound,
    /// The underlying pool reported an error (exhaustion, stale reference).
    Pool(PoolError),
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "sequence is not initialized"),
            Self::AlreadyInitialized => write!(f, "sequence is already initialized"),
            Self::Empty => write!(f, "sequence is empty"),
            Self::ValueNotFound { value } => write!(f, "value {value} not found"),
            Self::AnchorNotFound => write!(f, "anchor node not found"),
            Self::Pool(err) => write!(f, "pool error: {err}"),
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PoolError> for ListError {
    fn from(err: PoolError) -> Self {
        Self::Pool(err)
    }
}
