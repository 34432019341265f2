#![allow(dead_code)]

use std::sync::Arc;
use switchyard::{
    Component, HandlerSpec, HandlerTable, IntoReply,
    web::{Environ, HttpError, HttpReply, Request},
};

// ============================================================================
// Transport input
// ============================================================================

pub fn get(path: &str) -> Environ {
    Environ::new()
        .with("REQUEST_METHOD", "GET")
        .with("PATH_INFO", path)
        .with("SERVER_PROTOCOL", "HTTP/1.1")
        .with("SERVER_NAME", "localhost")
        .with("SERVER_PORT", "8000")
}

pub fn get_gzip(path: &str) -> Environ {
    get(path).with("HTTP_ACCEPT_ENCODING", "gzip, deflate")
}

// ============================================================================
// Controllers
// ============================================================================

/// Answers every request with `Hello World!`.
pub struct Hello;

impl Component for Hello {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("index", |_, _| {
                Box::pin(async { "Hello World!".into_reply() })
            })
            .event("request"),
        )
    }
}

/// Routes a few fixed paths to different kinds of answer.
pub struct Paths;

impl Paths {
    async fn route(&self, request: Arc<Request>) -> Option<HttpReply> {
        match request.path.as_str() {
            "/" => Some("index".into()),
            "/teapot" => Some(HttpError::new(418).with_message("short and stout").into()),
            "/moved" => Some(HttpReply::redirect("/")),
            _ => None,
        }
    }
}

impl Component for Paths {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("route", |this, event| {
                let request = event.arg::<Arc<Request>>(0).cloned();
                Box::pin(async move {
                    match request {
                        Some(request) => this.route(request).await.into_reply(),
                        None => Ok(None),
                    }
                })
            })
            .event("request"),
        )
    }
}

/// A request handler whose backend is down.
pub struct Failing;

impl Component for Failing {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("index", |_, _| {
                Box::pin(async { Err::<(), _>("database unreachable").into_reply() })
            })
            .event("request"),
        )
    }
}
