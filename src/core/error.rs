// ============================================================================
// event-signals - Errors
// The single error type shared by dispatch, wrappers and the binder
// ============================================================================

use std::error::Error as StdError;

use thiserror::Error;

/// Errors raised by signal dispatch, signaling wrappers and the binder.
///
/// Listener callbacks return this type too, so a failure raised inside a
/// listener reaches the code that fired the signal unchanged.
#[derive(Debug, Error)]
pub enum SignalError {
    /// A non-auto-creating lookup referenced a signal that does not exist.
    #[error("signal `{0}` does not exist")]
    SignalNotFound(String),

    /// `off` referenced a callback that is not connected to the signal.
    #[error("callback is not connected to signal `{0}`")]
    CallbackNotFound(String),

    /// No gettable/settable accessor could be found by name on an object.
    #[error("cannot resolve a signal-capable accessor `{name}` on `{type_name}`")]
    NotResolvable {
        name: String,
        type_name: &'static str,
    },

    /// `unbind` referenced a pair of accessors that were never bound.
    #[error("`{0}` is not bound")]
    NotBound(String),

    /// A property was read before any value was stored and it has no getter or default.
    #[error("property has no value")]
    NoValue,

    /// A property with a getter but no setter was assigned.
    #[error("property is read-only")]
    ReadOnly,

    /// A property without a deleter was deleted.
    #[error("property cannot be deleted")]
    NotDeletable,

    /// An observed object has no method registered under this name.
    #[error("no observed method `{0}`")]
    MethodNotFound(String),

    /// A member exists under this name but with different argument or value types.
    #[error("member `{name}` is not a `{expected}`")]
    TypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// A listener failed with an error from outside this crate.
    #[error("listener failed: {0}")]
    Listener(#[source] Box<dyn StdError + 'static>),

    /// A listener stopped the dispatch with a message.
    #[error("{0}")]
    Aborted(String),
}

impl SignalError {
    /// Wrap an arbitrary error raised inside a listener.
    pub fn listener<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        SignalError::Listener(Box::new(error))
    }

    /// Abort the current dispatch with a message.
    pub fn aborted(message: impl Into<String>) -> Self {
        SignalError::Aborted(message.into())
    }

    /// True for both "signal missing" and "callback missing".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SignalError::SignalNotFound(_) | SignalError::CallbackNotFound(_)
        )
    }
}
