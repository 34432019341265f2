//! # switchyard-std
//!
//! The Switchyard runtime: component tree, registration engine, handler
//! registry and event bus.
//!
//! This crate provides:
//! - **Component tree**: [`Component`], [`Manager`], [`Registered`], [`Unregistered`]
//! - **Singletons**: [`Singleton`], checked on every registration
//! - **Handler registry**: [`HandlerTable`], [`HandlerSpec`], [`HandlerMeta`]
//! - **Event bus**: `fire`, `send`, `push`, `flush` on [`Manager`], returning [`Dispatched`]
//! - **Debugging**: the [`Debugger`] component
//! - **Testing**: [`testing`] utilities

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core vocabulary
pub use switchyard_core;

// Modules
pub mod bus;
pub mod debugger;
pub mod handlers;
pub mod singleton;
pub mod testing;
pub mod tree;

pub use bus::{Dispatched, ERROR_EVENT};
pub use debugger::Debugger;
pub use handlers::{BoundHandler, HandlerFlags, HandlerMeta, HandlerSpec, HandlerTable, Method};
pub use singleton::Singleton;
pub use tree::{Component, Manager, Registered, Unregistered};
