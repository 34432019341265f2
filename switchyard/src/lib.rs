//! # switchyard - Component/Event Runtime
//!
//! `switchyard` arranges components in a tree and routes named events between
//! them over channels. Handlers are declared per component type, matched by
//! channel and event name, and run in priority order. The [`web`] module
//! builds an HTTP request pipeline on top of the bus.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::{handlers, Component, Event, HandlerTable, Manager};
//! use switchyard::web::{AppConfig, Application, Environ};
//!
//! struct Root;
//!
//! #[handlers]
//! impl Root {
//!     #[handler("request")]
//!     fn index(&self) -> &'static str {
//!         "Hello World!"
//!     }
//! }
//!
//! impl Component for Root {
//!     fn handlers() -> HandlerTable<Self> {
//!         Self::handler_table()
//!     }
//! }
//!
//! let app = Application::new(AppConfig::new());
//! app.add_child(&Manager::new(Root))?;
//! let response = app.handle(environ).await;
//! ```

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use switchyard_core::{
    // Error types
    BoxError,
    // Handler
    BoxFuture,
    // Identity
    ComponentId,
    DispatchError,
    DynHandler,
    // Event
    Event,
    FnHandler,
    Handler,
    HandlerFailure,
    // Results
    HandlerOutput,
    IntoReply,
    RegistrationError,
    SingletonError,
    SwitchyardError,
    Value,
    // Matching
    WILDCARD,
    channel_matches,
    handler_fn,
    name_matches,
};

// Runtime
pub use switchyard_std::{
    BoundHandler, Component, Debugger, Dispatched, ERROR_EVENT, HandlerFlags, HandlerMeta,
    HandlerSpec, HandlerTable, Manager, Method, Registered, Singleton, Unregistered,
};

/// Testing utilities.
pub mod testing {
    pub use switchyard_std::testing::{CountingHandler, OrderLog, Recorder};
}

pub mod web;

/// Prelude module - common imports for Switchyard.
///
/// # Usage
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Component, Event, Handler, HandlerMeta, HandlerOutput, HandlerSpec, HandlerTable,
        IntoReply, Manager, Singleton, Value,
    };
}

#[cfg(feature = "macros")]
pub use switchyard_macros::{handler, handlers};
