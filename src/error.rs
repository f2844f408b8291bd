//! Error taxonomy shared by every container in the crate.

use thiserror::Error;

/// Failure of a container operation. A failed operation never leaves a
/// partially applied mutation behind.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// `insert` was called with a key that is already present (in either tier).
    #[error("an entry with the same key already exists")]
    DuplicateKey,

    /// A lookup or update that requires the key found nothing.
    #[error("the given key was not present")]
    KeyNotFound,

    /// A fixed-capacity container has no free slot left.
    #[error("fixed capacity of {capacity} exceeded")]
    CapacityExceeded {
        /// Capacity of the container that rejected the insert.
        capacity: usize,
    },

    /// Bad construction parameters or an out-of-range index.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
