//! # Web request pipeline
//!
//! Turns transport requests into `request`, `httperror` and `response`
//! events on a component tree, and the answers back into responses.
//!
//! - [`Application`] / [`App`]: the pipeline and its transport-facing entry point
//! - [`Environ`]: transport input
//! - [`Request`] / [`Response`] / [`Headers`]: the in-flight pair
//! - [`HttpReply`] / [`HttpError`]: what handlers answer with
//! - [`Gateway`]: nest one application inside another
//! - [`Filter`]: post-process response bodies
//! - `Gzip`: gzip-encode responses (feature `gzip`)

mod app;
mod environ;
mod error;
mod filter;
mod gateway;
#[cfg(feature = "gzip")]
mod gzip;
mod headers;
mod message;
mod reply;
pub mod status;

pub use app::{App, AppConfig, Application, Finalizer, StartResponse};
pub use environ::{Environ, EnvironError, header_variable, parse_protocol, translate_headers};
pub use error::PipelineError;
pub use filter::{Filter, ResponseFilter};
pub use gateway::Gateway;
#[cfg(feature = "gzip")]
pub use gzip::{Gzip, compress, decompress, gzip};
pub use headers::Headers;
pub use message::{Host, Request, Response};
pub use reply::{HttpError, HttpReply};
pub use status::Status;
