//! Byte sources a stream can fetch from.
//!
//! Anything `std::io::Read + Send + 'static` works, an open file as
//! well as a cursor over in-memory bytes. This module adds the
//! streaming HTTP source the supply layer was built around.

mod http;

pub use http::{open_stream, HttpSource};
