//! Event tracing component.

use crate::{
    handlers::{HandlerSpec, HandlerTable},
    tree::Component,
};
use std::future::ready;
use switchyard_core::{Event, HandlerOutput, WILDCARD};

/// Names the debugger never logs unless asked to.
const NOISY: &[&str] = &["registered", "unregistered"];

/// A component that logs every event dispatched in its tree.
///
/// It listens on every channel for every name at a high priority, so it sees
/// events before other handlers run. Lifecycle notifications are skipped
/// unless [`verbose`](Debugger::verbose) is set.
///
/// Events are logged with `tracing` at `debug` level.
#[derive(Debug, Clone, Default)]
pub struct Debugger {
    verbose: bool,
    ignore: Vec<String>,
}

impl Debugger {
    /// Create a debugger with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log registration notifications.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Skip events with this name.
    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.ignore.push(name.into());
        self
    }

    /// Whether the event would be logged.
    pub fn wants(&self, event: &Event) -> bool {
        let name = event.name();
        if self.ignore.iter().any(|n| n == name) {
            return false;
        }
        self.verbose || !NOISY.contains(&name)
    }

    fn observe(&self, event: &Event) {
        if self.wants(event) {
            tracing::debug!(target: "switchyard::debugger", ?event, "event");
        }
    }
}

impl Component for Debugger {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("observe", |this, event| {
                this.observe(event);
                Box::pin(ready(HandlerOutput::Ok(None)))
            })
            .event(WILDCARD)
            .channel(WILDCARD)
            .with_priority(100.0),
        )
    }
}
