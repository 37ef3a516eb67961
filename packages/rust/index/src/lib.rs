//! Index-document streaming: download, decompression, framing, parsing.
//!
//! This crate turns the HTTP byte stream of a gzip-compressed,
//! newline-delimited index into a sequence of [`PlanRecord`]s without ever
//! holding more than a bounded window of the stream in memory:
//! - [`source`] — HTTP source with a blocking `Read` bridge for the decoder
//! - [`decompress`] — [`ChunkedDecompressor`], bounded decompressed chunks
//! - [`framer`] — [`LineFramer`], line reassembly across chunk boundaries
//! - [`record`] — marker filter and line-to-record parsing
//!
//! [`PlanRecord`]: mrfscan_shared::PlanRecord

pub mod decompress;
pub mod framer;
pub mod record;
pub mod source;

pub use decompress::ChunkedDecompressor;
pub use framer::LineFramer;
pub use record::{RECORD_MARKER, is_record_line, parse_record};
pub use source::{ByteReader, IndexSource, build_client};
