//! Wire transports. Framed NDJSON over byte streams, plus an optional HTTP
//! binding behind the `http` feature.

pub mod framed;
#[cfg(feature = "http")]
pub mod http;

pub use framed::{split_tcp, MessageReader, MessageWriter, DEFAULT_MAX_FRAME_BYTES};
#[cfg(feature = "http")]
pub use http::HttpTransport;
