//! # Event bus
//!
//! Dispatch walks the handlers of the whole tree that match an event's
//! channel and name. Filters run first, then normal handlers; within each
//! group higher priorities run first and ties keep tree (registration) order.
//!
//! Handlers run one after another, each to completion. A filter returning a
//! value stops dispatch; with `first_only` so does the first handler that
//! returns a value. A handler error or panic is captured, logged and queued
//! as an `error` event, and dispatch continues with the next handler.

use crate::{
    handlers::BoundHandler,
    tree::{Manager, ResolvedHandlers, flatten_nodes, lock, read, structure_read},
};
use futures::FutureExt;
use std::{fmt, panic::AssertUnwindSafe, sync::Arc};
use switchyard_core::{DispatchError, Event, HandlerFailure, Value};

/// Name of the event queued for every captured handler failure.
pub const ERROR_EVENT: &str = "error";

/// An event waiting in a root queue.
pub(crate) struct Queued {
    event: Event,
    channel: String,
}

impl Queued {
    pub(crate) fn new(event: Event, channel: String) -> Self {
        Self { event, channel }
    }
}

/// The outcome of dispatching one event.
pub struct Dispatched {
    event: Event,
    values: Vec<Value>,
    failures: Vec<HandlerFailure>,
    invoked: usize,
    stopped_by: Option<String>,
}

impl Dispatched {
    /// The event, as left by the handlers.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Take the event back.
    pub fn into_event(self) -> Event {
        self.event
    }

    /// The first non-null handler result.
    pub fn value(&self) -> Option<&Value> {
        self.values.first()
    }

    /// Every non-null handler result, in dispatch order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Failures captured while dispatching.
    pub fn failures(&self) -> &[HandlerFailure] {
        &self.failures
    }

    /// How many handlers were invoked.
    pub fn invoked(&self) -> usize {
        self.invoked
    }

    /// Binding of the handler that cut dispatch short, if any.
    pub fn stopped_by(&self) -> Option<&str> {
        self.stopped_by.as_deref()
    }

    /// Split into event, first value and failures.
    pub fn into_parts(self) -> (Event, Option<Value>, Vec<HandlerFailure>) {
        let value = self.values.into_iter().next();
        (self.event, value, self.failures)
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatched")
            .field("event", &self.event)
            .field("values", &self.values)
            .field("failures", &self.failures)
            .field("invoked", &self.invoked)
            .field("stopped_by", &self.stopped_by)
            .finish()
    }
}

impl Manager {
    /// Handlers of this component's tree that hear `name` on `channel`, in
    /// dispatch order.
    pub fn resolve(&self, channel: &str, name: &str) -> Vec<Arc<BoundHandler>> {
        self.resolve_cached(channel, name).to_vec()
    }

    fn resolve_cached(&self, channel: &str, name: &str) -> ResolvedHandlers {
        let _structure = structure_read();
        let root = self.node.root();
        let key = (channel.to_string(), name.to_string());
        if let Some(hit) = lock(&root.cache).get(&key) {
            return Arc::clone(hit);
        }

        let mut matched: Vec<Arc<BoundHandler>> = Vec::new();
        for node in flatten_nodes(&root) {
            matched.extend(
                read(&node.handlers)
                    .iter()
                    .filter(|h| h.matches(channel, name))
                    .cloned(),
            );
        }
        matched.sort_by(|a, b| {
            b.is_filter()
                .cmp(&a.is_filter())
                .then_with(|| b.priority().total_cmp(&a.priority()))
                .then_with(|| a.sequence().cmp(&b.sequence()))
        });

        let resolved: ResolvedHandlers = matched.into();
        lock(&root.cache).insert(key, Arc::clone(&resolved));
        resolved
    }

    /// Dispatch `event` on `channel` to every matching handler now.
    pub async fn fire(&self, event: Event, channel: &str) -> Dispatched {
        let handlers = self.resolve_cached(channel, event.name());
        self.dispatch(event, channel, &handlers, false).await
    }

    /// Dispatch `event` on `channel`, failing if nothing listens.
    ///
    /// With `first_only` dispatch stops at the first handler that returns a
    /// value. [`DispatchError::NoHandler`] means no handler matched at all;
    /// handlers that ran and returned nothing yield an empty
    /// [`Dispatched::values`].
    pub async fn send(
        &self,
        event: Event,
        channel: &str,
        first_only: bool,
    ) -> Result<Dispatched, DispatchError> {
        let handlers = self.resolve_cached(channel, event.name());
        if handlers.is_empty() {
            return Err(DispatchError::NoHandler {
                channel: channel.to_string(),
                name: event.name().to_string(),
            });
        }
        Ok(self.dispatch(event, channel, &handlers, first_only).await)
    }

    /// Queue `event` on `channel` for the next [`flush`](Manager::flush).
    pub fn push(&self, event: Event, channel: &str) {
        let root = self.node.root();
        lock(&root.queue).push_back(Queued::new(event, channel.to_string()));
    }

    /// Number of events waiting in this tree's queue.
    pub fn pending(&self) -> usize {
        lock(&self.node.root().queue).len()
    }

    /// Fire queued events until the queue is empty, including events queued
    /// while flushing. Returns how many were fired.
    pub async fn flush(&self) -> usize {
        let mut fired = 0;
        loop {
            let next = lock(&self.node.root().queue).pop_front();
            let Some(Queued { event, channel }) = next else {
                break;
            };
            self.fire(event, &channel).await;
            fired += 1;
        }
        fired
    }

    async fn dispatch(
        &self,
        mut event: Event,
        channel: &str,
        handlers: &[Arc<BoundHandler>],
        first_only: bool,
    ) -> Dispatched {
        let mut values = Vec::new();
        let mut failures = Vec::new();
        let mut invoked = 0;
        let mut stopped_by = None;

        tracing::trace!(event = event.name(), channel, handlers = handlers.len(), "dispatch");

        for handler in handlers {
            invoked += 1;
            // Synchronous handlers do their work when called, so the call
            // itself has to happen inside the unwind guard.
            let outcome = AssertUnwindSafe(async { handler.target().handle_dyn(&mut event).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(Some(value))) => {
                    values.push(value);
                    if handler.is_filter() || first_only {
                        stopped_by = Some(handler.binding().to_string());
                        break;
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(error)) => {
                    let failure =
                        HandlerFailure::from_error(handler.binding(), event.name(), &*error);
                    tracing::warn!(
                        handler = handler.binding(),
                        event = event.name(),
                        error = %failure.message,
                        "handler failed"
                    );
                    failures.push(failure);
                }
                Err(payload) => {
                    let failure =
                        HandlerFailure::from_panic(handler.binding(), event.name(), &*payload);
                    tracing::warn!(
                        handler = handler.binding(),
                        event = event.name(),
                        panic = %failure.message,
                        "handler panicked"
                    );
                    failures.push(failure);
                }
            }
        }

        event.mark_done();

        if event.name() != ERROR_EVENT {
            for failure in &failures {
                self.push(Event::new(ERROR_EVENT).with_arg(failure.clone()), channel);
            }
        }

        Dispatched {
            event,
            values,
            failures,
            invoked,
            stopped_by,
        }
    }
}
