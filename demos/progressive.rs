//! Streams a GIF over HTTP and decodes frames while the download is
//! still going.
//!
//! Usage: cargo run --example progressive -- <url>

use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context};
use image::codecs::gif::GifDecoder;
use image::AnimationDecoder;
use imagesupply::{ByteSupply, HttpSource, Pulled, StreamEnd, StreamOptions};
use url::Url;

/// Blocking `Read` on top of the pull contract: polls the supply until
/// bytes arrive or the stream finishes. This is what a decoder that
/// insists on a reader looks like from the supply's side.
struct PullReader {
    supply: ByteSupply,
    expected: Option<u64>,
    staged: Vec<u8>,
    consumed: usize,
    done: bool,
}

impl PullReader {
    fn new(supply: ByteSupply, expected: Option<u64>) -> Self {
        Self {
            supply,
            expected,
            staged: Vec::new(),
            consumed: 0,
            done: false,
        }
    }
}

impl Read for PullReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.consumed == self.staged.len() {
            if self.done {
                return Ok(0);
            }
            match self.supply.pull() {
                Pulled::Bytes(bytes) => {
                    self.staged = bytes;
                    self.consumed = 0;
                }
                Pulled::Empty => {
                    if let Some(total) = self.expected {
                        log::debug!(
                            "waiting on the network: {}/{} bytes",
                            self.supply.written(),
                            total
                        );
                    }
                    thread::sleep(Duration::from_millis(5));
                }
                Pulled::Finished(end) => {
                    self.done = true;
                    if let StreamEnd::Failed(e) = end {
                        return Err(io::Error::new(e.kind(), e.to_string()));
                    }
                    return Ok(0);
                }
            }
        }

        let n = (self.staged.len() - self.consumed).min(buf.len());
        buf[..n].copy_from_slice(&self.staged[self.consumed..self.consumed + n]);
        self.consumed += n;
        Ok(n)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: progressive <url>"))?;
    let url = Url::parse(&url).context("not a valid URL")?;

    let source = HttpSource::get(url)?;
    let expected = source.content_length();
    match expected {
        Some(total) => println!("downloading {} bytes...", total),
        None => println!("downloading, length unknown..."),
    }

    let supply = ByteSupply::start_with(
        source,
        StreamOptions {
            expected_len: expected,
            ..StreamOptions::default()
        },
    )?;
    let reader = PullReader::new(supply, expected);

    let decoder = GifDecoder::new(reader).context("could not decode as GIF")?;
    let mut frames = 0usize;
    for frame in decoder.into_frames() {
        let frame = frame.context("frame decode failed")?;
        frames += 1;
        let (numer, denom) = frame.delay().numer_denom_ms();
        println!(
            "frame {}: {}x{}, shown for {}ms",
            frames,
            frame.buffer().width(),
            frame.buffer().height(),
            numer / denom.max(1)
        );
    }
    println!("done: {} frames", frames);

    Ok(())
}
