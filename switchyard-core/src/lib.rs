//! # switchyard-core
//!
//! Core vocabulary for the Switchyard component/event runtime.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! components and extensions that don't need the full `switchyard-std` runtime.
//!
//! # Building Blocks
//!
//! - [`Event`] - a named event with a type-erased, mutable payload
//! - [`Handler`] / [`DynHandler`] - the unit of work invoked for an event
//! - [`Value`] / [`IntoReply`] - what a handler hands back to the bus
//! - [`channel_matches`] / [`name_matches`] - how events find handlers
//!
//! # Error Types
//!
//! - [`SwitchyardError`] - Top-level error type
//! - [`RegistrationError`] - Tree mutation errors (incl. [`SingletonError`])
//! - [`DispatchError`] - `send` errors
//! - [`HandlerFailure`] - A captured handler error or panic

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod event;
mod handler;
mod id;
mod pattern;
mod value;

// Re-exports
pub use error::{
    BoxError, DispatchError, HandlerFailure, RegistrationError, SingletonError, SwitchyardError,
};
pub use event::Event;
pub use handler::{BoxFuture, DynHandler, FnHandler, Handler, handler_fn};
pub use id::ComponentId;
pub use pattern::{WILDCARD, channel_matches, name_matches};
pub use value::{HandlerOutput, IntoReply, Value};
