//! Gzip response encoding.

use super::message::Response;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::{
    future::ready,
    io::{self, Read, Write},
};
use switchyard_core::{Event, HandlerOutput};
use switchyard_std::{Component, HandlerSpec, HandlerTable};

/// Gzip-compress `data`.
pub fn compress(data: &[u8], level: Compression) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), level);
    encoder.write_all(data)?;
    encoder.finish()
}

/// Inflate gzip-compressed `data`.
pub fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// A gzip-encoded copy of `response`.
pub fn gzip(response: &Response, level: Compression) -> io::Result<Response> {
    let mut encoded = response.clone();
    encoded.set_body(compress(response.body(), level)?);
    encoded.headers.set("Content-Encoding", "gzip");
    encoded.headers.add("Vary", "Accept-Encoding");
    encoded.gzip = false;
    Ok(encoded)
}

/// A component that gzip-encodes responses for clients that accept it.
///
/// Listens on `response` at priority 1.0 and replaces the event's response
/// with an encoded copy when [`Response::gzip`] is set.
#[derive(Debug, Clone)]
pub struct Gzip {
    level: Compression,
}

impl Default for Gzip {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Gzip {
    /// Encode at the default level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode at `level` (0-9).
    pub fn level(mut self, level: u32) -> Self {
        self.level = Compression::new(level);
        self
    }

    fn encode(&self, event: &mut Event) -> HandlerOutput {
        let Some(response) = event.arg::<Response>(0) else {
            return Ok(None);
        };
        if !response.gzip || response.headers.contains("Content-Encoding") {
            return Ok(None);
        }
        let encoded = gzip(response, self.level)?;
        tracing::trace!(
            before = response.body().len(),
            after = encoded.body().len(),
            "gzip"
        );
        event.set_arg(0, encoded);
        Ok(None)
    }
}

impl Component for Gzip {
    fn handlers() -> HandlerTable<Self> {
        HandlerTable::<Self>::new().with(
            HandlerSpec::<Self>::method("encode", |this, event| Box::pin(ready(this.encode(event))))
                .event("response")
                .with_priority(1.0),
        )
    }
}
