//! Error taxonomy shared by views and the global configuration.
//!
//! Stores never fail: their operations report "not found" through `bool` or
//! `Option`. Views may refuse an operation, so their API returns [`Result`].

use thiserror::Error;

/// Errors surfaced by the collection engine.
///
/// Nothing is retried or recovered internally; every error reaches the caller
/// as soon as it is detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A mutating call reached an unmodifiable (or read-only borrowed) view.
    #[error("collection is unmodifiable")]
    Immutable,

    /// The view cannot express the requested operation (e.g. `add` through a
    /// mapped view, whose transform is not invertible).
    #[error("operation not supported by {0} view")]
    Unsupported(&'static str),

    /// Positional access past the end of a table or view.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// [`crate::init`] was called after the configuration was installed.
    #[error("configuration already initialized")]
    AlreadyInitialized,
}

/// Result alias using the crate [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
