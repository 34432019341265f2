//! What a `request` or `httperror` handler may answer with.

use super::{
    message::Response,
    status::{self, Status},
};
use switchyard_core::{HandlerOutput, IntoReply, Value};
use thiserror::Error;

/// An HTTP error condition.
///
/// Returned by handlers to answer with an error page, produced by the
/// pipeline for unanswered or failed requests, and carried by the
/// `httperror` event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{status} {}", message_or_reason(.message, .status))]
pub struct HttpError {
    /// Status code.
    pub status: u16,
    /// Short message; the standard reason phrase when `None`.
    pub message: Option<String>,
    /// Failure trace shown on the error page.
    pub traceback: Option<String>,
}

impl HttpError {
    /// An error with the standard reason phrase.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: None,
            traceback: None,
        }
    }

    /// `404 Not Found`.
    pub fn not_found() -> Self {
        Self::new(404)
    }

    /// `500 Internal Server Error` with a trace.
    pub fn internal(traceback: impl Into<String>) -> Self {
        Self::new(500).with_traceback(traceback)
    }

    /// Replace the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a trace.
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }

    /// The message, falling back to the reason phrase.
    pub fn message(&self) -> &str {
        message_or_reason(&self.message, &self.status)
    }

    /// Write the canned error page into `response`.
    ///
    /// Sets the body, the status line `"<code> <message>"` and
    /// `Connection: close`.
    pub fn apply(&self, response: &mut Response) {
        let message = self.message();
        response.set_body(status::error_page(
            self.status,
            message,
            self.traceback.as_deref(),
        ));
        response.set_status(Status::with_reason(self.status, message.to_string()));
        response.headers.set("Connection", "close");
    }
}

fn message_or_reason<'a>(message: &'a Option<String>, status: &u16) -> &'a str {
    message.as_deref().unwrap_or_else(|| status::reason(*status))
}

/// A recognised handler answer.
#[derive(Debug, Clone)]
pub enum HttpReply {
    /// Literal response body.
    Body(Vec<u8>),
    /// Redirect the client.
    Redirect {
        /// Target URL.
        location: String,
        /// Status code; `303` (or `302` for HTTP/1.0 clients) when `None`.
        status: Option<u16>,
    },
    /// Answer with an error page.
    Error(HttpError),
    /// Adopt this response wholesale.
    Response(Response),
}

impl HttpReply {
    /// A redirect with the default status for the client's protocol.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            status: None,
        }
    }

    /// Recognise a handler's value.
    ///
    /// Gives the value back when its type is not a recognised answer.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        let value = match value.downcast::<HttpReply>() {
            Ok(reply) => return Ok(reply),
            Err(value) => value,
        };
        let value = match value.downcast::<String>() {
            Ok(body) => return Ok(Self::Body(body.into_bytes())),
            Err(value) => value,
        };
        let value = match value.downcast::<Vec<u8>>() {
            Ok(body) => return Ok(Self::Body(body)),
            Err(value) => value,
        };
        let value = match value.downcast::<HttpError>() {
            Ok(error) => return Ok(Self::Error(error)),
            Err(value) => value,
        };
        value.downcast::<Response>().map(Self::Response)
    }
}

/// Write a redirect into `response`.
pub(crate) fn apply_redirect(response: &mut Response, location: &str, code: Option<u16>) {
    let code = code.unwrap_or(if response.request().protocol >= (1, 1) {
        303
    } else {
        302
    });
    response.set_status(Status::new(code));
    response.headers.set("Location", location);
    response.headers.set("Content-Type", "text/html");
    response.set_body(format!(
        "This resource can be found at <a href=\"{0}\">{0}</a>.",
        status::escape_html(location)
    ));
}

impl From<String> for HttpReply {
    fn from(body: String) -> Self {
        Self::Body(body.into_bytes())
    }
}

impl From<&'static str> for HttpReply {
    fn from(body: &'static str) -> Self {
        Self::Body(body.as_bytes().to_vec())
    }
}

impl From<HttpError> for HttpReply {
    fn from(error: HttpError) -> Self {
        Self::Error(error)
    }
}

impl From<Response> for HttpReply {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl IntoReply for HttpReply {
    fn into_reply(self) -> HandlerOutput {
        Ok(Some(Value::new(self)))
    }
}

impl IntoReply for HttpError {
    fn into_reply(self) -> HandlerOutput {
        Ok(Some(Value::new(self)))
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> HandlerOutput {
        Ok(Some(Value::new(self)))
    }
}
