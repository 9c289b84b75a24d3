//! Byte supply for images that decode while they download.
//!
//! A background fetcher pulls chunks from a byte source (usually HTTP)
//! into a growable buffer; the decoder calls [`ByteSupply::pull`]
//! whenever it wants more and gets everything new since its last call,
//! exactly once and in order, without ever blocking on the network.
//!
//! ```no_run
//! use imagesupply::{source, Pulled, StreamEnd};
//! use url::Url;
//!
//! # fn main() -> imagesupply::Result<()> {
//! let url = Url::parse("https://example.com/animation.gif").unwrap();
//! let mut supply = source::open_stream(url)?;
//!
//! let mut image_bytes = Vec::new();
//! loop {
//!     match supply.pull() {
//!         Pulled::Bytes(chunk) => image_bytes.extend_from_slice(&chunk),
//!         Pulled::Empty => {
//!             // Decode what is already there, come back later.
//!             std::thread::sleep(std::time::Duration::from_millis(10));
//!         }
//!         Pulled::Finished(end) => {
//!             if let StreamEnd::Failed(e) = end {
//!                 eprintln!("download broke off: {e}");
//!             }
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod errors;
pub mod source;

mod fetch;
mod supply;

pub use buffer::GrowableBuffer;
pub use errors::{Result, SupplyError};
pub use source::{open_stream, HttpSource};
pub use supply::{
    ByteSupply, Pulled, StreamEnd, StreamOptions, StreamStatus,
    DEFAULT_CHUNK_SIZE,
};
