//! Response post-processing with guaranteed cleanup.

use super::message::{Request, Response};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use switchyard_core::{BoxError, Event, HandlerOutput};
use switchyard_std::{Component, HandlerSpec, HandlerTable};

/// Rewrites response bodies for a [`Filter`].
pub trait ResponseFilter: Send + Sync + 'static {
    /// The new body for `response`.
    fn process(&self, response: &Response) -> Result<Vec<u8>, BoxError>;
}

impl<F> ResponseFilter for F
where
    F: Fn(&Response) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
{
    fn process(&self, response: &Response) -> Result<Vec<u8>, BoxError> {
        self(response)
    }
}

/// A `response` filter that replaces the body with its processor's output.
///
/// While the processor runs, the request being answered is stashed on the
/// filter and visible through [`in_flight`](Filter::in_flight). The stash is
/// cleared when processing ends, whether it succeeded, failed or panicked.
pub struct Filter<P> {
    processor: P,
    in_flight: Mutex<Option<Arc<Request>>>,
}

impl<P: ResponseFilter> Filter<P> {
    /// Wrap a processor.
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            in_flight: Mutex::new(None),
        }
    }

    /// The request currently being processed, if any.
    pub fn in_flight(&self) -> Option<Arc<Request>> {
        self.slot().clone()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<Request>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on_response(&self, event: &mut Event) -> HandlerOutput {
        let Some(response) = event.arg_mut::<Response>(0) else {
            return Ok(None);
        };

        *self.slot() = Some(Arc::clone(response.request()));
        let _stash = ClearOnDrop(&self.in_flight);

        let body = self.processor.process(response)?;
        response.set_body(body);
        Ok(None)
    }
}

struct ClearOnDrop<'a>(&'a Mutex<Option<Arc<Request>>>);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl<P: ResponseFilter> Component for Filter<P> {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("process", |this, event| {
                Box::pin(std::future::ready(this.on_response(event)))
            })
            .event("response")
            .filter(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::Environ;

    fn response() -> Response {
        let mut response = Response::new(Arc::new(Request::lenient(&Environ::new())));
        response.set_body("hello");
        response
    }

    struct Shout;

    impl ResponseFilter for Shout {
        fn process(&self, response: &Response) -> Result<Vec<u8>, BoxError> {
            Ok(response.body_text().to_uppercase().into_bytes())
        }
    }

    #[test]
    fn test_rewrites_body_and_clears_stash() {
        let filter = Filter::new(Shout);
        let mut event = Event::new("response").with_arg(response());

        assert!(filter.on_response(&mut event).unwrap().is_none());

        assert_eq!(event.arg::<Response>(0).unwrap().body(), b"HELLO");
        assert!(filter.in_flight().is_none());
    }

    #[test]
    fn test_stash_cleared_on_failure() {
        let filter = Filter::new(|_: &Response| -> Result<Vec<u8>, BoxError> {
            Err("cannot process".into())
        });
        let mut event = Event::new("response").with_arg(response());

        assert!(filter.on_response(&mut event).is_err());

        assert!(filter.in_flight().is_none());
        assert_eq!(event.arg::<Response>(0).unwrap().body(), b"hello");
    }

    #[test]
    fn test_stash_cleared_on_panic() {
        let filter = Filter::new(|_: &Response| -> Result<Vec<u8>, BoxError> {
            panic!("processor exploded")
        });
        let mut event = Event::new("response").with_arg(response());

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            filter.on_response(&mut event)
        }));

        assert!(outcome.is_err());
        assert!(filter.in_flight().is_none());
    }
}
