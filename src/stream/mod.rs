//! Client side of the streaming message protocol.
//!
//! The server answers a posted message with newline delimited records of the
//! form `data: <json>`. [`decode_stream`] turns the raw body into
//! [`StreamEvent`](crate::models::StreamEvent)s and [`StreamSession`] drives
//! one exchange end to end.

pub mod decoder;
pub mod session;

pub use decoder::{DATA_PREFIX, decode_stream, parse_line};
pub use session::{SessionOutcome, StreamObserver, StreamSession};
