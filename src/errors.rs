use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SupplyError>;

#[derive(Error, Debug)]
pub enum SupplyError {
    /// The very first read from the byte source produced nothing, so
    /// there is no image to decode.
    #[error("failed to read initial bytes of image")]
    InitialRead(#[source] Option<io::Error>),
    /// A read outside the written part of the buffer. This is a bug in
    /// the caller, not a condition worth recovering from.
    #[error("range [{from}, {from} + {len}) exceeds the {written} bytes written")]
    OutOfRange {
        from: usize,
        len: usize,
        written: usize,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
