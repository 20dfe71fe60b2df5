use crate::error::Result;
use std::io::Read;

/// Frame codec. Frames are compressed one buffer at a time so each can be
/// decompressed on its own; a whole blob is still a valid concatenated stream.
pub trait Compressor: Send + Sync {
    fn compress_frame(&self, src: &[u8], level: i32) -> Result<Vec<u8>>;
    /// `capacity` is the exact decompressed length recorded in the frame index.
    fn decompress_frame(&self, src: &[u8], capacity: usize) -> Result<Vec<u8>>;
    /// Streaming reader over a whole blob.
    fn decoder<'a>(&self, src: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>>;
}

pub mod zstdc;
