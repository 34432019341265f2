//! Transport input: a CGI-style environment.
//!
//! A transport hands each inbound request to the pipeline as an [`Environ`]:
//! string variables such as `REQUEST_METHOD`, `PATH_INFO` and `HTTP_*`
//! headers, plus the raw request body.

use super::headers::Headers;
use phf::phf_map;
use std::collections::BTreeMap;
use thiserror::Error;

/// CGI variables whose header names cannot be recovered mechanically.
static HEADER_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "HTTP_CGI_AUTHORIZATION" => "Authorization",
    "CONTENT_LENGTH" => "Content-Length",
    "CONTENT_TYPE" => "Content-Type",
    "REMOTE_HOST" => "Remote-Host",
    "REMOTE_ADDR" => "Remote-Addr",
};

/// Errors turning an [`Environ`] into a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironError {
    /// A required variable is absent.
    #[error("missing environ variable `{0}`")]
    Missing(&'static str),

    /// `SERVER_PROTOCOL` is not of the form `HTTP/<major>.<minor>`.
    #[error("malformed protocol `{0}`")]
    Protocol(String),
}

/// A CGI-style request environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environ {
    vars: BTreeMap<String, String>,
    input: Vec<u8>,
}

impl Environ {
    /// An empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style [`set_input`](Self::set_input).
    pub fn with_input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.set_input(input);
        self
    }

    /// Set a variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Replace the request body.
    pub fn set_input(&mut self, input: impl Into<Vec<u8>>) {
        self.input = input.into();
    }

    /// A variable's value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// The request body.
    pub fn input(&self) -> &[u8] {
        &self.input
    }

    /// Variables in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Recover request headers from the environment.
///
/// Names listed in the translation table map directly; any other
/// `HTTP_FOO_BAR` variable becomes the header `FOO-BAR`. Everything else is
/// not a header.
pub fn translate_headers(environ: &Environ) -> Headers {
    environ
        .iter()
        .filter_map(|(name, value)| {
            if let Some(header) = HEADER_NAMES.get(name) {
                Some(((*header).to_string(), value))
            } else {
                name.strip_prefix("HTTP_")
                    .map(|rest| (rest.replace('_', "-"), value))
            }
        })
        .collect()
}

/// The CGI variable carrying `header`, as [`translate_headers`] expects it.
pub fn header_variable(header: &str) -> String {
    if let Some((cgi, _)) = HEADER_NAMES
        .entries()
        .find(|(_, name)| name.eq_ignore_ascii_case(header))
    {
        return (*cgi).to_string();
    }
    format!("HTTP_{}", header.to_ascii_uppercase().replace('-', "_"))
}

/// Parse `HTTP/1.1` into `(1, 1)`.
pub fn parse_protocol(protocol: &str) -> Result<(u8, u8), EnvironError> {
    let malformed = || EnvironError::Protocol(protocol.to_string());
    let version = protocol.strip_prefix("HTTP/").ok_or_else(malformed)?;
    let (major, minor) = version.split_once('.').ok_or_else(malformed)?;
    Ok((
        major.parse().map_err(|_| malformed())?,
        minor.parse().map_err(|_| malformed())?,
    ))
}
