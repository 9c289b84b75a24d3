use std::io::{self, Read};

use tokio::runtime::Runtime;
use url::Url;

use crate::errors::Result;
use crate::supply::{ByteSupply, StreamOptions};

/// Streaming HTTP(S) byte source.
///
/// Issues one GET with response streaming and hands the body out chunk
/// by chunk through `std::io::Read`, blocking until the network
/// delivers. Requests are never retried; transport failures surface as
/// read errors.
pub struct HttpSource {
    url: Url,
    runtime: Runtime,
    response: reqwest::Response,
    staged: Vec<u8>,
    consumed: usize,
}

impl HttpSource {
    /// Sends the GET and waits for the response headers. Connection
    /// problems and non-success statuses fail here, before any body
    /// bytes move.
    pub fn get(url: Url) -> Result<Self> {
        let runtime = Runtime::new()?;
        let response = runtime.block_on(async {
            reqwest::get(url.clone()).await?.error_for_status()
        })?;
        log::debug!("GET {} -> {}", url, response.status());

        Ok(Self {
            url,
            runtime,
            response,
            staged: Vec::new(),
            consumed: 0,
        })
    }

    /// Total body length advertised by the server, when it sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Read for HttpSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.consumed == self.staged.len() {
            match self.runtime.block_on(self.response.chunk()) {
                // Transfer encodings may produce empty frames; they do
                // not mean end-of-body.
                Ok(Some(chunk)) if chunk.is_empty() => continue,
                Ok(Some(chunk)) => {
                    self.staged = chunk.to_vec();
                    self.consumed = 0;
                }
                Ok(None) => return Ok(0),
                Err(e) => {
                    return Err(io::Error::new(io::ErrorKind::Other, e))
                }
            }
        }

        let taken = drain_staged(&self.staged, self.consumed, buf);
        self.consumed += taken;
        Ok(taken)
    }
}

/// Copies as much staged data as fits into `buf`, returning the amount.
fn drain_staged(staged: &[u8], consumed: usize, buf: &mut [u8]) -> usize {
    let taken = (staged.len() - consumed).min(buf.len());
    buf[..taken].copy_from_slice(&staged[consumed..consumed + taken]);
    taken
}

/// Opens a progressive stream over `url`: one streaming GET, the
/// buffer pre-sized from `Content-Length` when the server sends it.
pub fn open_stream(url: Url) -> Result<ByteSupply> {
    let source = HttpSource::get(url)?;
    let options = StreamOptions {
        expected_len: source.content_length(),
        ..StreamOptions::default()
    };

    ByteSupply::start_with(source, options)
}
