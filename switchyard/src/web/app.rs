//! # Request pipeline
//!
//! Every inbound request runs through the same state machine:
//!
//! ```text
//! RECEIVED -> DISPATCHED -> (RESOLVED | ERRORED) -> SENT
//! ```
//!
//! - **received**: the environment is adapted into a [`Request`] and an
//!   empty [`Response`].
//! - **dispatched**: a `request` event is sent on the application channel,
//!   stopping at the first handler that answers.
//! - **resolved**: the answer became the response body or the response
//!   itself.
//! - **errored**: an `httperror` event gives error handlers a chance to
//!   answer; the canned error page stays otherwise.
//! - **sent**: after a `response` event the status, headers and body go back
//!   to the transport.
//!
//! Event payloads:
//!
//! | event       | args                                   |
//! |-------------|----------------------------------------|
//! | `request`   | `Arc<Request>`, `Response`             |
//! | `httperror` | `HttpError`, `Arc<Request>`, `Response` |
//! | `response`  | `Response`                             |

use super::{
    environ::Environ,
    error::PipelineError,
    headers::Headers,
    message::{Request, Response},
    reply::{HttpError, HttpReply, apply_redirect},
    status::Status,
};
use async_trait::async_trait;
use std::{fmt, future::ready, sync::Arc};
use switchyard_core::{DispatchError, Event, HandlerOutput, RegistrationError, WILDCARD};
use switchyard_std::{Component, HandlerSpec, HandlerTable, Manager};
use tracing::Instrument;

/// The transport callback receiving the final status and headers.
pub type StartResponse<'a> = dyn FnMut(&Status, &Headers) + Send + 'a;

/// Something that answers a transport request.
///
/// Implemented by [`Application`]; a [`Gateway`](super::Gateway) embeds any
/// `App` inside another application.
#[async_trait]
pub trait App: Send + Sync {
    /// Answer `environ`, reporting status and headers through
    /// `start_response` before returning the body chunks.
    async fn call(&self, environ: Environ, start_response: &mut StartResponse<'_>) -> Vec<Vec<u8>>;
}

/// Settings of an [`Application`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    channel: String,
    server_version: String,
    gzip: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            channel: WILDCARD.to_string(),
            server_version: concat!("switchyard/", env!("CARGO_PKG_VERSION")).to_string(),
            gzip: true,
        }
    }
}

impl AppConfig {
    /// Default settings: wildcard channel, gzip negotiation on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel the pipeline events are sent on.
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Value of the `X-Powered-By` header.
    pub fn server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = version.into();
        self
    }

    /// Whether to mark responses for gzip when the client accepts it.
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Received,
    Dispatched,
    Resolved,
    Errored,
    Sent,
}

/// The root component of an [`Application`] tree.
///
/// Marks each response done once the `response` event has been handled.
pub struct Finalizer {
    channel: String,
}

impl Component for Finalizer {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(HandlerSpec::<Self>::method("response", |_, event| {
            if let Some(response) = event.arg_mut::<Response>(0) {
                response.done = true;
            }
            Box::pin(ready(HandlerOutput::Ok(None)))
        }))
    }

    fn channel(&self) -> &str {
        &self.channel
    }
}

/// A web application: a component tree answering requests.
///
/// # Example
///
/// ```rust,ignore
/// let app = Application::new(AppConfig::new());
/// app.add_child(&Manager::new(Root))?;
///
/// let response = app.handle(environ).await;
/// ```
#[derive(Clone)]
pub struct Application {
    manager: Manager,
    config: Arc<AppConfig>,
}

impl Application {
    /// Create an application with its own tree.
    pub fn new(config: AppConfig) -> Self {
        let manager = Manager::new(Finalizer {
            channel: config.channel.clone(),
        });
        Self {
            manager,
            config: Arc::new(config),
        }
    }

    /// The root of the application's tree.
    pub fn manager(&self) -> &Manager {
        &self.manager
    }

    /// The configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Register a component into the application.
    pub fn add_child(&self, child: &Manager) -> Result<(), RegistrationError> {
        self.manager.add_child(child)
    }

    fn channel(&self) -> &str {
        &self.config.channel
    }

    fn fresh_response(&self, request: &Arc<Request>) -> Response {
        let mut response = Response::new(Arc::clone(request));
        response
            .headers
            .add("X-Powered-By", self.config.server_version.as_str());
        response.gzip = self.config.gzip && request.accepts_gzip();
        response
    }

    fn enter(&self, stage: Stage, request: &Request) {
        tracing::debug!(?stage, method = %request.method, path = %request.path, "pipeline");
    }

    /// Run one request through the pipeline and return the final response.
    pub async fn handle(&self, environ: Environ) -> Response {
        let span = tracing::debug_span!(
            "request",
            method = environ.get("REQUEST_METHOD").unwrap_or("GET"),
            path = environ.get("PATH_INFO").unwrap_or("/"),
        );
        async move {
            let response = self.run(environ).await;
            self.manager.flush().await;
            response
        }
        .instrument(span)
        .await
    }

    async fn run(&self, environ: Environ) -> Response {
        let (request, adapted) = match Request::from_environ(&environ) {
            Ok(request) => (Arc::new(request), Ok(())),
            Err(error) => (Arc::new(Request::lenient(&environ)), Err(error)),
        };
        self.enter(Stage::Received, &request);
        let response = self.fresh_response(&request);

        if let Err(error) = adapted {
            tracing::warn!(%error, "malformed environ");
            let error = PipelineError::from(error).to_http_error();
            return self.errored(error, request, response).await;
        }

        self.enter(Stage::Dispatched, &request);
        let (resolution, response) = self.dispatch_request(&request, response).await;

        match resolution {
            Ok(HttpReply::Body(body)) => {
                let mut response = response;
                response.set_body(body);
                self.resolved(&request, response).await
            }
            Ok(HttpReply::Response(adopted)) => self.resolved(&request, adopted).await,
            Ok(HttpReply::Redirect { location, status }) => {
                let mut response = response;
                apply_redirect(&mut response, &location, status);
                self.resolved(&request, response).await
            }
            Ok(HttpReply::Error(error)) => self.errored(error, request, response).await,
            Err(error) => self.errored(error.to_http_error(), request, response).await,
        }
    }

    async fn dispatch_request(
        &self,
        request: &Arc<Request>,
        response: Response,
    ) -> (Result<HttpReply, PipelineError>, Response) {
        let not_found = || PipelineError::NotFound {
            method: request.method.clone(),
            path: request.path.clone(),
        };

        let event = Event::new("request")
            .with_arg(Arc::clone(request))
            .with_arg(response);

        let dispatched = match self.manager.send(event, self.channel(), true).await {
            Ok(dispatched) => dispatched,
            Err(DispatchError::NoHandler { .. }) => {
                tracing::debug!("no request handler");
                return (Err(not_found()), self.fresh_response(request));
            }
        };

        let (mut event, value, failures) = dispatched.into_parts();
        let response = event
            .take_arg::<Response>(1)
            .unwrap_or_else(|| self.fresh_response(request));

        if let Some(failure) = failures.into_iter().next() {
            return (Err(PipelineError::UpstreamFailure(failure)), response);
        }
        let Some(value) = value else {
            tracing::debug!("request handlers answered with nothing");
            return (Err(not_found()), response);
        };
        let resolution = HttpReply::from_value(value).map_err(|value| {
            PipelineError::HandlerResultInvalid {
                type_name: value.type_name(),
            }
        });
        (resolution, response)
    }

    async fn resolved(&self, request: &Arc<Request>, response: Response) -> Response {
        self.enter(Stage::Resolved, request);
        self.respond(request, response).await
    }

    async fn errored(
        &self,
        error: HttpError,
        request: Arc<Request>,
        mut response: Response,
    ) -> Response {
        self.enter(Stage::Errored, &request);
        tracing::debug!(%error, "answering with error");
        error.apply(&mut response);

        let event = Event::new("httperror")
            .with_arg(error.clone())
            .with_arg(Arc::clone(&request))
            .with_arg(response);

        let response = match self.manager.send(event, self.channel(), true).await {
            Err(DispatchError::NoHandler { .. }) => {
                let mut response = self.fresh_response(&request);
                error.apply(&mut response);
                response
            }
            Ok(dispatched) => {
                let (mut event, value, failures) = dispatched.into_parts();
                let mut response = event.take_arg::<Response>(2).unwrap_or_else(|| {
                    let mut response = self.fresh_response(&request);
                    error.apply(&mut response);
                    response
                });
                for failure in &failures {
                    tracing::warn!(handler = %failure.handler, "httperror handler failed");
                }
                match value.map(HttpReply::from_value) {
                    None => {}
                    Some(Ok(HttpReply::Body(body))) => response.set_body(body),
                    Some(Ok(HttpReply::Response(adopted))) => response = adopted,
                    Some(Ok(HttpReply::Redirect { location, status })) => {
                        apply_redirect(&mut response, &location, status)
                    }
                    Some(Ok(HttpReply::Error(other))) => other.apply(&mut response),
                    Some(Err(value)) => tracing::warn!(
                        type_name = value.type_name(),
                        "unexpected httperror handler result"
                    ),
                }
                response
            }
        };

        self.respond(&request, response).await
    }

    async fn respond(&self, request: &Arc<Request>, response: Response) -> Response {
        let dispatched = self
            .manager
            .fire(Event::new("response").with_arg(response), self.channel())
            .await;
        let mut event = dispatched.into_event();
        let response = event.take_arg::<Response>(0).unwrap_or_else(|| {
            tracing::warn!("response event lost its response");
            let mut response = self.fresh_response(request);
            HttpError::new(500)
                .with_message("response lost")
                .apply(&mut response);
            response
        });
        self.enter(Stage::Sent, request);
        response
    }
}

#[async_trait]
impl App for Application {
    async fn call(&self, environ: Environ, start_response: &mut StartResponse<'_>) -> Vec<Vec<u8>> {
        let mut response = self.handle(environ).await;
        let body = response.process();
        start_response(&response.status(), &response.headers);
        vec![body]
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("manager", &self.manager)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::handler_fn;
    use switchyard_std::HandlerMeta;

    fn get(path: &str) -> Environ {
        Environ::new()
            .with("REQUEST_METHOD", "GET")
            .with("PATH_INFO", path)
            .with("SERVER_PROTOCOL", "HTTP/1.1")
    }

    #[tokio::test]
    async fn test_unanswered_request_is_404() {
        let app = Application::new(AppConfig::new());
        let response = app.handle(get("/")).await;
        assert_eq!(response.status().to_string(), "404 Not Found");
        assert_eq!(response.headers.get("Connection"), Some("close"));
        assert!(response.body_text().contains("Nothing matches the given URI"));
        assert!(response.done);
    }

    #[tokio::test]
    async fn test_body_answer_and_powered_by() {
        let app = Application::new(AppConfig::new().server_version("test/1"));
        app.manager()
            .add_handler(HandlerMeta::new("request"), handler_fn(|_: &mut Event| "hi"));

        let response = app.handle(get("/")).await;

        assert_eq!(response.status(), Status::OK);
        assert_eq!(response.body(), b"hi");
        assert_eq!(response.headers.get("X-Powered-By"), Some("test/1"));
    }

    #[tokio::test]
    async fn test_invalid_answer_is_500() {
        let app = Application::new(AppConfig::new());
        app.manager().add_handler(
            HandlerMeta::new("request"),
            handler_fn(|_: &mut Event| switchyard_core::Value::new(7u8)),
        );

        let response = app.handle(get("/")).await;

        assert_eq!(response.status().code(), 500);
        assert_eq!(response.status().reason(), "unexpected handler result");
    }

    #[tokio::test]
    async fn test_malformed_environ_is_400() {
        let app = Application::new(AppConfig::new());
        let response = app.handle(Environ::new()).await;
        assert_eq!(response.status().code(), 400);
    }

    #[tokio::test]
    async fn test_call_reports_through_start_response() {
        let app = Application::new(AppConfig::new());
        app.manager()
            .add_handler(HandlerMeta::new("request"), handler_fn(|_: &mut Event| "body"));

        let mut seen = None;
        let chunks = app
            .call(get("/"), &mut |status: &Status, headers: &Headers| {
                seen = Some((status.clone(), headers.get("Content-Length").map(str::to_string)));
            })
            .await;

        assert_eq!(chunks, vec![b"body".to_vec()]);
        assert_eq!(seen, Some((Status::OK, Some("4".to_string()))));
    }
}
