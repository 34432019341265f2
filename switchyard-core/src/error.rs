//! Error types for Switchyard.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`SwitchyardError`] - Top-level error type for all Switchyard operations
//! - [`RegistrationError`] - Errors raised synchronously by `register`/`unregister`
//! - [`DispatchError`] - Errors raised by `send`
//! - [`HandlerFailure`] - A captured error or panic from a single handler

use crate::id::ComponentId;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Switchyard operations.
#[derive(Error, Debug)]
pub enum SwitchyardError {
    /// A component could not be registered.
    #[error("registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// An event could not be dispatched.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors that can occur while changing the component tree.
///
/// These are returned to the caller of `register` and are never routed
/// through events. When one is returned the tree is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A uniqueness constraint would be violated.
    #[error("singleton violation: {0}")]
    Singleton(#[from] SingletonError),

    /// The target parent lives inside the component's own subtree.
    #[error("cannot register {component} ({id}) below its own descendant")]
    Cycle {
        /// Type name of the component being registered.
        component: &'static str,
        /// Identity of the component being registered.
        id: ComponentId,
    },
}

/// A singleton conflict, naming the offending component.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{component} ({id}) conflicts with {existing} ({existing_id}) already in the tree")]
pub struct SingletonError {
    /// Type name of the singleton being registered.
    pub component: &'static str,
    /// Identity of the singleton being registered.
    pub id: ComponentId,
    /// Type name of the component already present.
    pub existing: &'static str,
    /// Identity of the component already present.
    pub existing_id: ComponentId,
}

/// Errors that can occur during `send`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No handler matched the channel/name combination.
    ///
    /// This is distinct from a handler that ran and returned nothing.
    #[error("no handler for event `{name}` on channel `{channel}`")]
    NoHandler {
        /// Channel the event was sent on.
        channel: String,
        /// Name of the event.
        name: String,
    },
}

/// An error or panic captured while invoking a handler.
#[derive(Error, Debug, Clone)]
#[error("handler `{handler}` failed on `{event}`: {message}")]
pub struct HandlerFailure {
    /// Binding name of the failing handler.
    pub handler: String,
    /// Name of the event being handled.
    pub event: String,
    /// Top-level error message (or panic payload).
    pub message: String,
    /// The full error chain, one cause per line.
    pub trace: String,
    /// Whether the failure was a panic rather than a returned error.
    pub panicked: bool,
}

impl HandlerFailure {
    /// Capture a returned error, walking its `source()` chain into the trace.
    pub fn from_error(handler: &str, event: &str, error: &(dyn std::error::Error + 'static)) -> Self {
        let mut trace = format!("{handler}: {error}");
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push_str("\ncaused by: ");
            trace.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            handler: handler.to_string(),
            event: event.to_string(),
            message: error.to_string(),
            trace,
            panicked: false,
        }
    }

    /// Capture a panic payload.
    pub fn from_panic(handler: &str, event: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            handler: handler.to_string(),
            event: event.to_string(),
            trace: format!("{handler} panicked: {message}"),
            message,
            panicked: true,
        }
    }
}

// Convenience conversions
impl From<BoxError> for SwitchyardError {
    fn from(err: BoxError) -> Self {
        SwitchyardError::Custom(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn failure_trace_walks_sources() {
        let err = Outer(std::io::Error::other("disk gone"));
        let failure = HandlerFailure::from_error("Root.index", "request", &err);
        assert_eq!(failure.message, "outer");
        assert!(failure.trace.contains("caused by: disk gone"));
        assert!(!failure.panicked);
    }

    #[test]
    fn failure_from_panic_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        let failure = HandlerFailure::from_panic("Root.index", "request", payload.as_ref());
        assert_eq!(failure.message, "boom");
        assert!(failure.panicked);
    }
}
