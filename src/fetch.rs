use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::supply::{StreamEnd, SupplyState};

/// Drives `source` to exhaustion on a dedicated thread, appending every
/// chunk to the shared state. The loop stops when the source ends or
/// errors, or when the cancel flag goes up, and reports how it stopped
/// exactly once.
pub(crate) fn spawn<S>(
    source: S,
    state: Arc<Mutex<SupplyState>>,
    cancel: Arc<AtomicBool>,
    chunk_size: usize,
) -> JoinHandle<()>
where
    S: Read + Send + 'static,
{
    thread::spawn(move || fetch_loop(source, &state, &cancel, chunk_size))
}

fn fetch_loop<S: Read>(
    mut source: S,
    state: &Mutex<SupplyState>,
    cancel: &AtomicBool,
    chunk_size: usize,
) {
    let mut chunk = vec![0u8; chunk_size];
    let mut fetched = 0usize;

    loop {
        if cancel.load(Ordering::Relaxed) {
            log::debug!("fetch cancelled after {} bytes", fetched);
            finish(
                state,
                StreamEnd::Failed(Arc::new(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "stream cancelled",
                ))),
            );
            return;
        }

        // The lock is never held while the source blocks.
        match source.read(&mut chunk) {
            Ok(0) => {
                log::info!("source exhausted after {} bytes", fetched);
                finish(state, StreamEnd::Clean);
                return;
            }
            Ok(read) => {
                fetched += read;
                let mut state = state.lock().unwrap();
                state.append(&chunk[..read]);
                log::trace!(
                    "fetched {} bytes, {} written in total",
                    read,
                    state.written()
                );
            }
            Err(e) => {
                log::warn!("source failed after {} bytes: {}", fetched, e);
                finish(state, StreamEnd::Failed(Arc::new(e)));
                return;
            }
        }
    }
}

fn finish(state: &Mutex<SupplyState>, end: StreamEnd) {
    state.lock().unwrap().finish(end);
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::supply::{ByteSupply, Pulled, StreamOptions};

    /// Endless drip of bytes, one per read, never reporting
    /// end-of-data. Only cancellation stops a stream over it.
    struct EndlessSource;

    impl Read for EndlessSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            thread::sleep(Duration::from_millis(1));
            buf[0] = 0xAB;
            Ok(1)
        }
    }

    #[test]
    fn cancel_ends_the_stream_as_interrupted() {
        let mut supply = ByteSupply::start(EndlessSource)
            .expect("the drip always has a byte");

        supply.cancel();

        let deadline = Instant::now() + Duration::from_secs(10);
        let end = loop {
            match supply.pull() {
                Pulled::Finished(end) => break end,
                _ => {
                    assert!(
                        Instant::now() < deadline,
                        "cancel was not observed within 10s"
                    );
                    thread::sleep(Duration::from_millis(1));
                }
            }
        };

        match end {
            StreamEnd::Failed(e) => {
                assert_eq!(e.kind(), io::ErrorKind::Interrupted)
            }
            StreamEnd::Clean => panic!("cancel reported as clean finish"),
        }
    }

    #[test]
    fn shutdown_joins_the_fetcher_thread() {
        let supply = ByteSupply::start(EndlessSource)
            .expect("the drip always has a byte");

        // Returns only after the fetcher thread is gone.
        supply.shutdown();
    }

    #[test]
    fn short_reads_accumulate_in_stream_order() {
        let payload: Vec<u8> = (0..100u8).collect();
        let mut supply = ByteSupply::start_with(
            Cursor::new(payload.clone()),
            StreamOptions {
                chunk_size: 3,
                expected_len: None,
            },
        )
        .expect("cursor always has bytes");

        let deadline = Instant::now() + Duration::from_secs(10);
        let mut got = Vec::new();
        loop {
            match supply.pull() {
                Pulled::Bytes(bytes) => got.extend_from_slice(&bytes),
                Pulled::Empty => {
                    assert!(Instant::now() < deadline, "stream stalled");
                    thread::sleep(Duration::from_millis(1));
                }
                Pulled::Finished(end) => {
                    assert!(end.is_clean());
                    break;
                }
            }
        }
        assert_eq!(got, payload);
    }
}
