//! # Handlers
//!
//! A handler is the unit of work the bus invokes for a matching event. It
//! receives the in-flight [`Event`] mutably, so filters can rewrite the
//! payload in place, and produces a [`HandlerOutput`].
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Handler`] uses native `async fn` for zero-cost static dispatch.
//! The bus stores handlers as [`DynHandler`] trait objects; every `Handler`
//! gets a `DynHandler` implementation for free.

use crate::{
    event::Event,
    value::{HandlerOutput, IntoReply},
};
use std::{future::Future, pin::Pin};

/// A pinned, boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can handle an event.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an event `Handler`",
    label = "missing `Handler` implementation",
    note = "Handlers must implement `handle`, or be built with `handler_fn`."
)]
pub trait Handler: Send + Sync + 'static {
    /// Called when a matching event is dispatched.
    fn handle(&self, event: &mut Event) -> impl Future<Output = HandlerOutput> + Send;
}

/// Dynamic object-safe version of [`Handler`].
pub trait DynHandler: Send + Sync + 'static {
    /// Called when a matching event is dispatched (dynamic dispatch version).
    fn handle_dyn<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, HandlerOutput>;
}

// Blanket implementation: Any type implementing Handler implements DynHandler automatically.
impl<T: Handler> DynHandler for T {
    fn handle_dyn<'a>(&'a self, event: &'a mut Event) -> BoxFuture<'a, HandlerOutput> {
        Box::pin(self.handle(event))
    }
}

/// A [`Handler`] built from a synchronous closure.
///
/// Created by [`handler_fn`].
#[derive(Clone)]
pub struct FnHandler<F> {
    func: F,
}

/// Wrap a synchronous closure as a [`Handler`].
///
/// # Example
///
/// ```rust,ignore
/// let hello = handler_fn(|_event: &mut Event| "Hello World!");
/// ```
pub fn handler_fn<F, R>(func: F) -> FnHandler<F>
where
    F: Fn(&mut Event) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    FnHandler { func }
}

impl<F, R> Handler for FnHandler<F>
where
    F: Fn(&mut Event) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    fn handle(&self, event: &mut Event) -> impl Future<Output = HandlerOutput> + Send {
        std::future::ready((self.func)(event).into_reply())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Handler for Echo {
        async fn handle(&self, event: &mut Event) -> HandlerOutput {
            event.name().to_string().into_reply()
        }
    }

    #[tokio::test]
    async fn test_handler_through_dyn() {
        let handler: Box<dyn DynHandler> = Box::new(Echo);
        let mut event = Event::new("ping");
        let value = handler.handle_dyn(&mut event).await.unwrap().unwrap();
        assert_eq!(value.downcast::<String>().unwrap(), "ping");
    }

    #[tokio::test]
    async fn test_handler_fn_mutates_event() {
        let handler = handler_fn(|event: &mut Event| {
            if let Some(n) = event.arg_mut::<u32>(0) {
                *n += 1;
            }
        });
        let mut event = Event::new("count").with_arg(1u32);
        assert!(handler.handle(&mut event).await.unwrap().is_none());
        assert_eq!(event.arg::<u32>(0), Some(&2));
    }
}
