//! Error types for the store runtime.

use thiserror::Error;

/// Errors surfaced by store construction.
///
/// Reads, writes and subscriptions never fail: missing properties read as
/// [`Value::Null`](crate::Value::Null) and repeated unsubscribes are no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A store can only wrap an object-shaped value.
    #[error("cannot wrap a {found} value: expected an object")]
    InvalidArgument {
        /// The kind of value that was passed in.
        found: &'static str,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
