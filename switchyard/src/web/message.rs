//! The request/response pair carried through the pipeline.

use super::{
    environ::{Environ, EnvironError, header_variable, parse_protocol, translate_headers},
    headers::Headers,
    status::Status,
};
use std::{borrow::Cow, sync::Arc};

/// A network endpoint as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Host {
    /// Address or host name.
    pub address: String,
    /// Port, when known.
    pub port: Option<u16>,
}

impl Host {
    fn from_vars(address: Option<&str>, port: Option<&str>) -> Self {
        Self {
            address: address.unwrap_or_default().to_string(),
            port: port.and_then(|p| p.parse().ok()),
        }
    }
}

/// An inbound request, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// `GET`, `POST`, ...
    pub method: String,
    /// `http` or `https`.
    pub scheme: String,
    /// Path below the script name.
    pub path: String,
    /// Raw query string, without `?`.
    pub query: String,
    /// `(major, minor)` protocol version.
    pub protocol: (u8, u8),
    /// Mount point of the application.
    pub script_name: String,
    /// The client.
    pub remote: Host,
    /// The server that accepted the request.
    pub server: Host,
    /// Request headers.
    pub headers: Headers,
    /// Request body.
    pub body: Vec<u8>,
    environ: Environ,
}

impl Request {
    /// Adapt a transport environment into a request.
    pub fn from_environ(environ: &Environ) -> Result<Self, EnvironError> {
        let protocol = environ
            .get("SERVER_PROTOCOL")
            .ok_or(EnvironError::Missing("SERVER_PROTOCOL"))?;
        let protocol = parse_protocol(protocol)?;
        Ok(Self {
            protocol,
            ..Self::lenient(environ)
        })
    }

    /// Adapt an environment, defaulting anything missing or malformed.
    ///
    /// Used to answer requests whose environment could not be adapted.
    pub fn lenient(environ: &Environ) -> Self {
        let var = |key: &str, default: &str| environ.get(key).unwrap_or(default).to_string();
        Self {
            method: var("REQUEST_METHOD", "GET"),
            scheme: var("URL_SCHEME", "http"),
            path: var("PATH_INFO", "/"),
            query: var("QUERY_STRING", ""),
            protocol: environ
                .get("SERVER_PROTOCOL")
                .and_then(|p| parse_protocol(p).ok())
                .unwrap_or((1, 0)),
            script_name: var("SCRIPT_NAME", ""),
            remote: Host::from_vars(environ.get("REMOTE_ADDR"), environ.get("REMOTE_PORT")),
            server: Host::from_vars(environ.get("SERVER_NAME"), environ.get("SERVER_PORT")),
            headers: translate_headers(environ),
            body: environ.input().to_vec(),
            environ: environ.clone(),
        }
    }

    /// The environment the request was built from.
    pub fn environ(&self) -> &Environ {
        &self.environ
    }

    /// `HTTP/<major>.<minor>`.
    pub fn server_protocol(&self) -> String {
        format!("HTTP/{}.{}", self.protocol.0, self.protocol.1)
    }

    /// Whether the client accepts gzip-encoded bodies.
    pub fn accepts_gzip(&self) -> bool {
        self.headers
            .get("Accept-Encoding")
            .is_some_and(|v| v.contains("gzip"))
    }

    /// A fresh environment describing this request, for a nested application.
    pub fn to_environ(&self) -> Environ {
        let mut environ = Environ::new()
            .with("REQUEST_METHOD", self.method.as_str())
            .with("PATH_INFO", self.path.as_str())
            .with("QUERY_STRING", self.query.as_str())
            .with("SCRIPT_NAME", self.script_name.as_str())
            .with("SERVER_NAME", self.server.address.as_str())
            .with("SERVER_PROTOCOL", self.server_protocol())
            .with("URL_SCHEME", self.scheme.as_str())
            .with_input(self.body.clone());
        if let Some(port) = self.server.port {
            environ.set("SERVER_PORT", port.to_string());
        }
        for (name, value) in self.headers.iter() {
            environ.set(header_variable(name), value);
        }
        environ
    }
}

/// The outbound response being built for a request.
#[derive(Debug, Clone)]
pub struct Response {
    status: Option<Status>,
    /// Response headers.
    pub headers: Headers,
    body: Vec<u8>,
    /// Set once the `response` event has been handled.
    pub done: bool,
    /// Whether the body should be gzip-encoded on the way out.
    pub gzip: bool,
    request: Arc<Request>,
}

impl Response {
    /// A fresh, empty response to `request` with no status set.
    pub fn new(request: Arc<Request>) -> Self {
        Self {
            status: None,
            headers: Headers::new(),
            body: Vec::new(),
            done: false,
            gzip: false,
            request,
        }
    }

    /// The request being answered.
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// The status, `200 OK` while unset.
    pub fn status(&self) -> Status {
        self.status.clone().unwrap_or(Status::OK)
    }

    /// Whether a status was set explicitly.
    pub fn has_status(&self) -> bool {
        self.status.is_some()
    }

    /// Set the status.
    pub fn set_status(&mut self, status: Status) {
        self.status = Some(status);
    }

    /// The body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    /// Finalise headers for sending and return the body bytes.
    pub fn process(&mut self) -> Vec<u8> {
        self.headers.set("Content-Length", self.body.len().to_string());
        self.body.clone()
    }
}
