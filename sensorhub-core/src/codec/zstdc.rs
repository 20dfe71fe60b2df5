use super::Compressor;
use crate::error::{HubError, Result};
use std::io::Read;

pub struct ZstdCompressor;

impl Compressor for ZstdCompressor {
    fn compress_frame(&self, src: &[u8], level: i32) -> Result<Vec<u8>> {
        Ok(zstd::bulk::compress(src, level.max(1))?)
    }

    fn decompress_frame(&self, src: &[u8], capacity: usize) -> Result<Vec<u8>> {
        let mut dec = zstd::bulk::Decompressor::new()?;
        let out = dec.decompress(src, capacity)?;
        if out.len() != capacity {
            return Err(HubError::Format(format!(
                "frame decompressed to {} bytes, index says {}",
                out.len(),
                capacity
            )));
        }
        Ok(out)
    }

    fn decoder<'a>(&self, src: Box<dyn Read + 'a>) -> Result<Box<dyn Read + 'a>> {
        Ok(Box::new(zstd::stream::Decoder::new(src)?))
    }
}
