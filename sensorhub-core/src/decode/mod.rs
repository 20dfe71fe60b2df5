//! Device log decoding: line grammar, fixed wire layouts and the channel registry.

pub mod cursor;
pub mod lines;
pub mod merge;
pub mod record;
pub mod records;
pub mod registry;

pub use lines::{LineDecoder, PartialResult, TypeTally, parse_lines};
pub use record::{Cell, Record, Row};
pub use registry::{CHANNELS, Channel, DataType, MergeStrategy};

/// Per-line inputs shared by every decoder.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Text timestamp from field 0, copied verbatim.
    pub timestamp: &'a str,
    pub unix_timestamp: i64,
    pub label_hr: i64,
    /// Line carried the 243-field v2 header.
    pub v2: bool,
    pub offset: usize,
}
