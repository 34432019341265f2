//! Status codes, reason phrases and the canned error page.

use phf::phf_map;
use std::{borrow::Cow, fmt, str::FromStr};
use thiserror::Error;

/// Reason phrase used for codes missing from [`RESPONSES`].
pub const UNKNOWN_REASON: &str = "???";

/// Reason phrase and explanation per status code.
pub static RESPONSES: phf::Map<u16, (&'static str, &'static str)> = phf_map! {
    100u16 => ("Continue", "Request received, please continue"),
    101u16 => ("Switching Protocols", "Switching to new protocol; obey Upgrade header"),

    200u16 => ("OK", "Request fulfilled, document follows"),
    201u16 => ("Created", "Document created, URL follows"),
    202u16 => ("Accepted", "Request accepted, processing continues off-line"),
    203u16 => ("Non-Authoritative Information", "Request fulfilled from cache"),
    204u16 => ("No Content", "Request fulfilled, nothing follows"),
    205u16 => ("Reset Content", "Clear input form for further input."),
    206u16 => ("Partial Content", "Partial content follows."),

    300u16 => ("Multiple Choices", "Object has several resources -- see URI list"),
    301u16 => ("Moved Permanently", "Object moved permanently -- see URI list"),
    302u16 => ("Found", "Object moved temporarily -- see URI list"),
    303u16 => ("See Other", "Object moved -- see Method and URL list"),
    304u16 => ("Not Modified", "Document has not changed since given time"),
    305u16 => ("Use Proxy", "You must use proxy specified in Location to access this resource."),
    307u16 => ("Temporary Redirect", "Object moved temporarily -- see URI list"),

    400u16 => ("Bad Request", "Bad request syntax or unsupported method"),
    401u16 => ("Unauthorized", "No permission -- see authorization schemes"),
    402u16 => ("Payment Required", "No payment -- see charging schemes"),
    403u16 => ("Forbidden", "Request forbidden -- authorization will not help"),
    404u16 => ("Not Found", "Nothing matches the given URI"),
    405u16 => ("Method Not Allowed", "Specified method is invalid for this resource."),
    406u16 => ("Not Acceptable", "URI not available in preferred format."),
    407u16 => ("Proxy Authentication Required", "You must authenticate with this proxy before proceeding."),
    408u16 => ("Request Timeout", "Request timed out; try again later."),
    409u16 => ("Conflict", "Request conflict."),
    410u16 => ("Gone", "URI no longer exists and has been permanently removed."),
    411u16 => ("Length Required", "Client must specify Content-Length."),
    412u16 => ("Precondition Failed", "Precondition in headers is false."),
    413u16 => ("Request Entity Too Large", "Entity is too large."),
    414u16 => ("Request-URI Too Long", "URI is too long."),
    415u16 => ("Unsupported Media Type", "Entity body in unsupported format."),
    416u16 => ("Requested Range Not Satisfiable", "Cannot satisfy request range."),
    417u16 => ("Expectation Failed", "Expect condition could not be satisfied."),

    500u16 => ("Internal Server Error", "Server got itself in trouble"),
    501u16 => ("Not Implemented", "Server does not support this operation"),
    502u16 => ("Bad Gateway", "Invalid responses from another server/proxy."),
    503u16 => ("Service Unavailable", "The server cannot process the request due to a high load"),
    504u16 => ("Gateway Timeout", "The gateway server did not receive a timely response"),
    505u16 => ("HTTP Version Not Supported", "Cannot fulfill request."),
};

/// Reason phrase of `code`, or [`UNKNOWN_REASON`].
pub fn reason(code: u16) -> &'static str {
    RESPONSES.get(&code).map_or(UNKNOWN_REASON, |&(short, _)| short)
}

/// Long explanation of `code`, or [`UNKNOWN_REASON`].
pub fn explanation(code: u16) -> &'static str {
    RESPONSES.get(&code).map_or(UNKNOWN_REASON, |&(_, long)| long)
}

/// A status code with its reason phrase, rendered as `"404 Not Found"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: u16,
    reason: Cow<'static, str>,
}

impl Status {
    /// `200 OK`.
    pub const OK: Status = Status {
        code: 200,
        reason: Cow::Borrowed("OK"),
    };

    /// A status with the standard reason phrase.
    pub fn new(code: u16) -> Self {
        Self {
            code,
            reason: Cow::Borrowed(reason(code)),
        }
    }

    /// A status with a custom reason phrase.
    pub fn with_reason(code: u16, reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// The numeric code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The reason phrase.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// A status line that does not start with a three-digit code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed status line `{0}`")]
pub struct StatusParseError(pub String);

impl FromStr for Status {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (code, rest) = s.split_once(' ').unwrap_or((s, ""));
        let code: u16 = code
            .parse()
            .ok()
            .filter(|c| (100..1000).contains(c))
            .ok_or_else(|| StatusParseError(s.to_string()))?;
        let rest = rest.trim();
        Ok(if rest.is_empty() {
            Status::new(code)
        } else {
            Status::with_reason(code, rest.to_string())
        })
    }
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// The canned error page for `code`.
///
/// `message` and `traceback` are HTML-escaped.
pub fn error_page(code: u16, message: &str, traceback: Option<&str>) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <title>{code} {message}</title>\n\
         </head>\n\
         <body>\n\
         <h1>{code} {message}</h1>\n\
         <p>{explain}</p>\n\
         <pre>{traceback}</pre>\n\
         </body>\n\
         </html>\n",
        message = escape_html(message),
        explain = escape_html(explanation(code)),
        traceback = escape_html(traceback.unwrap_or("")),
    )
}
