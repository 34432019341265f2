//! Embedding one application inside another.

use super::{
    app::App,
    headers::Headers,
    message::{Request, Response},
    reply::HttpReply,
    status::Status,
};
use std::sync::Arc;
use switchyard_core::{Event, HandlerOutput, IntoReply, WILDCARD};
use switchyard_std::{Component, HandlerSpec, HandlerTable};

/// A request filter that forwards requests to a nested [`App`].
///
/// The nested application's status and headers are folded into the
/// in-flight response and its body becomes the answer, so handlers further
/// down the chain never see the request.
pub struct Gateway {
    app: Arc<dyn App>,
    channel: String,
}

impl Gateway {
    /// Forward every request on any channel.
    pub fn new(app: impl App + 'static) -> Self {
        Self::from_arc(Arc::new(app))
    }

    /// Forward every request on any channel to a shared app.
    pub fn from_arc(app: Arc<dyn App>) -> Self {
        Self {
            app,
            channel: WILDCARD.to_string(),
        }
    }

    /// Only forward requests sent on `channel`.
    pub fn on_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    async fn forward(&self, event: &mut Event) -> HandlerOutput {
        let Some(request) = event.arg::<Arc<Request>>(0).map(Arc::clone) else {
            return Ok(None);
        };

        let mut reported: Option<(Status, Headers)> = None;
        let chunks = self
            .app
            .call(request.to_environ(), &mut |status: &Status, headers: &Headers| {
                reported = Some((status.clone(), headers.clone()));
            })
            .await;

        if let (Some(response), Some((status, headers))) =
            (event.arg_mut::<Response>(1), reported)
        {
            fold(response, status, &headers);
        }

        tracing::debug!(path = %request.path, "forwarded to nested application");
        HttpReply::Body(chunks.concat()).into_reply()
    }
}

/// Fold a nested status and header list into `response`.
///
/// Nested headers replace outer ones of the same name.
fn fold(response: &mut Response, status: Status, headers: &Headers) {
    response.set_status(status);
    for (name, _) in headers.iter() {
        response.headers.remove(name);
    }
    for (name, value) in headers.iter() {
        response.headers.add(name, value);
    }
}

impl Component for Gateway {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("forward", |this, event| Box::pin(this.forward(event)))
                .event("request")
                .filter(),
        )
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}
