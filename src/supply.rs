use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::buffer::GrowableBuffer;
use crate::errors::{Result, SupplyError};
use crate::fetch;

/// Amount of bytes requested from the source per read.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

// Largest pre-allocation honored from a length hint; anything bigger
// grows on demand.
const MAX_PREALLOC: usize = 16 * 1024 * 1024;

/// How a finished stream ended.
#[derive(Debug, Clone)]
pub enum StreamEnd {
    /// The source reported end-of-data; every byte of the image has
    /// been fetched.
    Clean,
    /// The source failed, or the stream was cancelled, after delivering
    /// the bytes fetched so far.
    Failed(Arc<std::io::Error>),
}

impl StreamEnd {
    pub fn is_clean(&self) -> bool {
        matches!(self, StreamEnd::Clean)
    }
}

/// Lifecycle of one stream as observed through the lock.
///
/// `Finished` is terminal: once set it never reverts to `Active`.
#[derive(Debug, Clone)]
pub enum StreamStatus {
    Active,
    Finished(StreamEnd),
}

impl StreamStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StreamStatus::Active)
    }
}

/// Outcome of one [`ByteSupply::pull`] call.
#[derive(Debug)]
pub enum Pulled {
    /// Everything appended since the previous call, in stream order.
    Bytes(Vec<u8>),
    /// Nothing new yet, but the stream is still active. Try again
    /// later.
    Empty,
    /// No more data will ever arrive.
    Finished(StreamEnd),
}

/// Tuning knobs for one stream.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Upper bound on bytes requested from the source per read. Must be
    /// non-zero.
    pub chunk_size: usize,
    /// Expected total length when known, e.g. from `Content-Length`.
    /// Used to pre-size the buffer, never to limit it.
    pub expected_len: Option<u64>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            expected_len: None,
        }
    }
}

/// Everything the two threads share, behind one lock. Keeping the
/// status next to the lengths lets a single critical section observe
/// both consistently.
pub(crate) struct SupplyState {
    buffer: GrowableBuffer,
    delivered: usize,
    status: StreamStatus,
}

impl SupplyState {
    fn new(buffer: GrowableBuffer) -> Self {
        Self {
            buffer,
            delivered: 0,
            status: StreamStatus::Active,
        }
    }

    pub(crate) fn append(&mut self, chunk: &[u8]) {
        self.buffer.append(chunk);
    }

    /// Moves the stream to a terminal status. Called at most once per
    /// stream, by the fetcher.
    pub(crate) fn finish(&mut self, end: StreamEnd) {
        debug_assert!(self.status.is_active());
        self.status = StreamStatus::Finished(end);
    }

    pub(crate) fn written(&self) -> usize {
        self.buffer.written()
    }
}

/// Pull-based byte supply over one progressively-downloading image.
///
/// A background thread fetches chunks from the byte source and appends
/// them to a shared growable buffer; [`pull`](Self::pull) drains
/// everything appended since the previous call. One decoder drives
/// `pull` at its own pace, from whatever thread suits it, and never
/// blocks on the network.
pub struct ByteSupply {
    state: Arc<Mutex<SupplyState>>,
    cancel: Arc<AtomicBool>,
    fetcher: Option<JoinHandle<()>>,
}

impl ByteSupply {
    /// Starts supplying from `source` with default options.
    ///
    /// One probing read runs on the calling thread before the fetcher
    /// spawns. A source with nothing to give fails here with
    /// [`SupplyError::InitialRead`] and no supply is created; whoever
    /// holds a `ByteSupply` knows at least one byte arrived.
    pub fn start<S>(source: S) -> Result<Self>
    where
        S: Read + Send + 'static,
    {
        Self::start_with(source, StreamOptions::default())
    }

    /// Same as [`start`](Self::start), with explicit options.
    pub fn start_with<S>(mut source: S, options: StreamOptions) -> Result<Self>
    where
        S: Read + Send + 'static,
    {
        assert!(options.chunk_size > 0, "chunk_size must be non-zero");

        let mut first = vec![0u8; options.chunk_size];
        let read = match source.read(&mut first) {
            Ok(0) => return Err(SupplyError::InitialRead(None)),
            Ok(read) => read,
            Err(e) => return Err(SupplyError::InitialRead(Some(e))),
        };
        first.truncate(read);

        Ok(Self::launch(first, source, options))
    }

    /// Starts around a prefix the caller already read from `source`,
    /// e.g. bytes sniffed for format detection. The seed comes out of
    /// the first [`pull`](Self::pull), ahead of anything the fetcher
    /// appends. An empty seed degenerates to
    /// [`start_with`](Self::start_with).
    pub fn start_seeded<S>(
        seed: Vec<u8>,
        source: S,
        options: StreamOptions,
    ) -> Result<Self>
    where
        S: Read + Send + 'static,
    {
        if seed.is_empty() {
            return Self::start_with(source, options);
        }
        assert!(options.chunk_size > 0, "chunk_size must be non-zero");

        Ok(Self::launch(seed, source, options))
    }

    fn launch<S>(seed: Vec<u8>, source: S, options: StreamOptions) -> Self
    where
        S: Read + Send + 'static,
    {
        let mut buffer = match options.expected_len {
            Some(len) => GrowableBuffer::with_capacity(
                len.min(MAX_PREALLOC as u64) as usize,
            ),
            None => GrowableBuffer::new(),
        };
        buffer.append(&seed);

        log::debug!(
            "starting stream: {} seed bytes, chunks of {}, expecting {:?}",
            seed.len(),
            options.chunk_size,
            options.expected_len
        );

        let state = Arc::new(Mutex::new(SupplyState::new(buffer)));
        let cancel = Arc::new(AtomicBool::new(false));
        let fetcher = fetch::spawn(
            source,
            state.clone(),
            cancel.clone(),
            options.chunk_size,
        );

        Self {
            state,
            cancel,
            fetcher: Some(fetcher),
        }
    }

    /// Hands over everything fetched since the previous call.
    ///
    /// Never blocks beyond a brief critical section; in particular it
    /// never waits for the network. [`Pulled::Empty`] means "nothing
    /// yet, retry later". Once a [`Pulled::Finished`] comes out, every
    /// later call repeats it.
    pub fn pull(&mut self) -> Pulled {
        let mut state = self.state.lock().unwrap();

        let written = state.buffer.written();
        if state.delivered < written {
            let len = written - state.delivered;
            let bytes = state
                .buffer
                .read(state.delivered, len)
                .expect("delivered cursor ran past the written length");
            state.delivered = written;
            log::trace!("pull: {} new bytes, {} delivered in total", len, written);
            return Pulled::Bytes(bytes);
        }

        match &state.status {
            StreamStatus::Active => Pulled::Empty,
            StreamStatus::Finished(end) => Pulled::Finished(end.clone()),
        }
    }

    /// Amount of bytes fetched from the source so far, the seed
    /// included.
    pub fn written(&self) -> usize {
        self.state.lock().unwrap().buffer.written()
    }

    /// Amount of bytes handed to the decoder so far. Never decreases
    /// and never exceeds [`written`](Self::written).
    pub fn delivered(&self) -> usize {
        self.state.lock().unwrap().delivered
    }

    pub fn status(&self) -> StreamStatus {
        self.state.lock().unwrap().status.clone()
    }

    /// Asks the fetcher to stop before its next read. A read already
    /// blocked on the source finishes on its own time; the stream then
    /// ends as failed with [`std::io::ErrorKind::Interrupted`].
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Cancels the stream and waits for the fetcher thread to exit.
    pub fn shutdown(mut self) {
        self.cancel();
        if let Some(fetcher) = self.fetcher.take() {
            if fetcher.join().is_err() {
                log::error!("fetcher thread panicked before shutdown");
            }
        }
    }
}

impl Drop for ByteSupply {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if self.fetcher.take().is_some() {
            log::trace!("supply dropped, fetcher left to wind down");
        }
    }
}
