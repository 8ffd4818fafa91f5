//! The COPY text sub-protocol: line codec and streaming sessions.

pub mod line;
mod stream_from;
mod stream_query;
mod stream_to;

pub use stream_from::StreamFrom;
pub use stream_query::StreamQuery;
pub use stream_to::StreamTo;
