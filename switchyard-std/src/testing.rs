//! Testing utilities for Switchyard.
//!
//! # Features
//!
//! - [`Recorder`]: a component that records the names of events it hears
//! - [`CountingHandler`]: a handler that counts invocations and answers with a fixed reply
//! - [`OrderLog`]: a shared log for asserting dispatch order across handlers

use crate::{
    handlers::{HandlerSpec, HandlerTable},
    tree::Component,
};
use std::{
    future::ready,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use switchyard_core::{Event, Handler, HandlerOutput, IntoReply, WILDCARD};

// ============================================================================
// Recorder
// ============================================================================

/// A component that records every event name it hears.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = Recorder::new();
/// let handle = recorder.clone();
/// root.add_child(&Manager::new(recorder))?;
///
/// root.flush().await;
/// assert_eq!(handle.names(), vec!["registered"]);
/// ```
#[derive(Clone, Default)]
pub struct Recorder {
    names: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names recorded so far, in order.
    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether an event with this name was recorded.
    pub fn saw(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.names.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn record(&self, event: &Event) {
        self.names
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.name().to_string());
    }
}

impl Component for Recorder {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("record", |this, event| {
                this.record(event);
                Box::pin(ready(HandlerOutput::Ok(None)))
            })
            .event(WILDCARD),
        )
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts its invocations.
///
/// Answers with `reply` when one is configured, otherwise with nothing.
#[derive(Clone, Default)]
pub struct CountingHandler {
    calls: Arc<AtomicUsize>,
    reply: Option<&'static str>,
}

impl CountingHandler {
    /// A silent counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// A counting handler answering with `reply`.
    pub fn replying(reply: &'static str) -> Self {
        Self {
            calls: Arc::default(),
            reply: Some(reply),
        }
    }

    /// How many times the handler ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Handler for CountingHandler {
    fn handle(&self, _event: &mut Event) -> impl Future<Output = HandlerOutput> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ready(self.reply.into_reply())
    }
}

// ============================================================================
// Order Log
// ============================================================================

/// A shared, append-only log of labels.
#[derive(Clone, Default)]
pub struct OrderLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OrderLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler appending `label` each time it runs.
    pub fn handler(&self, label: impl Into<String>) -> impl Handler {
        LabelHandler {
            log: self.clone(),
            label: label.into(),
        }
    }

    /// Append a label.
    pub fn push(&self, label: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(label.into());
    }

    /// Labels in append order.
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

struct LabelHandler {
    log: OrderLog,
    label: String,
}

impl Handler for LabelHandler {
    fn handle(&self, _event: &mut Event) -> impl Future<Output = HandlerOutput> + Send {
        self.log.push(self.label.clone());
        ready(HandlerOutput::Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handlers::HandlerMeta, tree::Manager};

    #[tokio::test]
    async fn test_recorder_sees_lifecycle() {
        let recorder = Recorder::new();
        let root = Manager::new(recorder.clone());
        let child = Manager::new(Recorder::new());
        root.add_child(&child).unwrap();
        root.flush().await;
        assert_eq!(recorder.names(), vec!["registered"]);
    }

    #[tokio::test]
    async fn test_counting_handler_replies() {
        let root = Manager::new(Recorder::new());
        let counter = CountingHandler::replying("ok");
        root.add_handler(HandlerMeta::new("ping"), counter.clone());
        let dispatched = root.send(Event::new("ping"), "*", true).await.unwrap();
        assert_eq!(counter.calls(), 1);
        assert!(dispatched.value().is_some());
    }

    #[tokio::test]
    async fn test_order_log_records_labels() {
        let root = Manager::new(Recorder::new());
        let log = OrderLog::new();
        root.add_handler(HandlerMeta::new("late").event("go"), log.handler("late"));
        root.add_handler(HandlerMeta::new("early").event("go").with_priority(5.0), log.handler("early"));
        root.fire(Event::new("go"), "*").await;
        assert_eq!(log.entries(), vec!["early", "late"]);
    }
}
