use std::io::{self, Write};

use md5::{Digest, Md5};

use super::frame::{Frame, FrameIndex, frame_boundary};
use crate::codec::Compressor;
use crate::config::FrameConfig;
use crate::error::Result;
use crate::hash::md5::ContentHash;
use crate::util::counting::CountingWriter;

/// Streaming framer: hashes plain input, cuts it into line-aligned frames and
/// writes each as an independent compressed frame.
///
/// Holds at most `max_frame_size` plain bytes at a time.
pub struct FrameWriter<'c, W: Write> {
    out: CountingWriter<W>,
    codec: &'c dyn Compressor,
    cfg: FrameConfig,
    hasher: Md5,
    buf: Vec<u8>,
    frames: Vec<Frame>,
    plain_off: u64,
}

pub struct FrameWriterOutput<W> {
    pub hash: ContentHash,
    pub index: FrameIndex,
    pub inner: W,
}

impl<'c, W: Write> FrameWriter<'c, W> {
    pub fn new(inner: W, codec: &'c dyn Compressor, cfg: FrameConfig) -> Self {
        let cfg = cfg.normalized();
        Self {
            out: CountingWriter::new(inner),
            codec,
            cfg,
            hasher: Md5::new(),
            buf: Vec::with_capacity(cfg.max_frame_size),
            frames: Vec::new(),
            plain_off: 0,
        }
    }

    fn emit_frame(&mut self) -> Result<()> {
        let (end, nl) = frame_boundary(&self.buf, self.cfg.min_frame_size, self.cfg.max_frame_size);
        let compressed = self.codec.compress_frame(&self.buf[..end], self.cfg.level)?;
        let cs = self.out.n;
        self.out.write_all(&compressed)?;
        self.frames.push(Frame {
            cs,
            cl: compressed.len() as u64,
            ds: self.plain_off,
            dl: end as u64,
            nl,
        });
        self.plain_off += end as u64;
        self.buf.drain(..end);
        Ok(())
    }

    /// Flush the tail and return the hash and index. Empty input yields no frames.
    pub fn finish(mut self) -> Result<FrameWriterOutput<W>> {
        while !self.buf.is_empty() {
            self.emit_frame()?;
        }
        self.out.flush()?;
        let index = FrameIndex::new(&self.cfg, self.frames);
        Ok(FrameWriterOutput {
            hash: ContentHash::from_hasher(self.hasher),
            index,
            inner: self.out.into_inner(),
        })
    }
}

impl<'c, W: Write> Write for FrameWriter<'c, W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = self.cfg.max_frame_size - self.buf.len();
        let take = data.len().min(room);
        self.buf.extend_from_slice(&data[..take]);
        self.hasher.update(&data[..take]);
        if self.buf.len() >= self.cfg.max_frame_size {
            self.emit_frame().map_err(io::Error::other)?;
        }
        Ok(take)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::zstdc::ZstdCompressor;

    fn small_cfg() -> FrameConfig {
        FrameConfig {
            min_frame_size: 64,
            max_frame_size: 128,
            level: 3,
        }
    }

    fn frame_all(data: &[u8], cfg: FrameConfig) -> (FrameWriterOutput<Vec<u8>>, Vec<u8>) {
        let codec = ZstdCompressor;
        let mut w = FrameWriter::new(Vec::new(), &codec, cfg);
        // odd write sizes so frames straddle write calls
        for chunk in data.chunks(37) {
            w.write_all(chunk).unwrap();
        }
        let out = w.finish().unwrap();
        let blob = out.inner.clone();
        (out, blob)
    }

    fn sample_lines(n: usize) -> Vec<u8> {
        let mut v = Vec::new();
        for i in 0..n {
            v.extend_from_slice(format!("2024-01-01 00:00:{i:02},line number {i}\n").as_bytes());
        }
        v
    }

    #[test]
    fn empty_input_has_no_frames() {
        let (out, blob) = frame_all(b"", small_cfg());
        assert!(out.index.frames.is_empty());
        assert!(blob.is_empty());
        assert_eq!(out.hash, ContentHash::compute(b""));
    }

    #[test]
    fn frames_are_contiguous_and_line_aligned() {
        let data = sample_lines(200);
        let (out, blob) = frame_all(&data, small_cfg());
        let idx = &out.index;

        assert!(idx.frames.len() > 1);
        assert_eq!(idx.frames[0].cs, 0);
        assert_eq!(idx.frames[0].ds, 0);
        for pair in idx.frames.windows(2) {
            assert_eq!(pair[0].cs + pair[0].cl, pair[1].cs);
            assert_eq!(pair[0].ds + pair[0].dl, pair[1].ds);
        }
        assert_eq!(idx.compressed_size, blob.len() as u64);
        assert_eq!(idx.original_size, data.len() as u64);
        assert!(idx.frames.iter().all(|f| f.nl));
        assert!(idx.frames.iter().all(|f| f.dl <= 128));
    }

    #[test]
    fn each_frame_decodes_alone() {
        let data = sample_lines(120);
        let (out, blob) = frame_all(&data, small_cfg());
        let codec = ZstdCompressor;
        let mut rebuilt = Vec::new();
        for f in &out.index.frames {
            let part = &blob[f.cs as usize..(f.cs + f.cl) as usize];
            rebuilt.extend(codec.decompress_frame(part, f.dl as usize).unwrap());
        }
        assert_eq!(rebuilt, data);
        assert_eq!(out.hash, ContentHash::compute(&data));
    }

    #[test]
    fn long_line_is_hard_cut() {
        let mut data = vec![b'x'; 300];
        data.push(b'\n');
        let (out, _) = frame_all(&data, small_cfg());
        let nl: Vec<bool> = out.index.frames.iter().map(|f| f.nl).collect();
        let dl: Vec<u64> = out.index.frames.iter().map(|f| f.dl).collect();
        assert_eq!(dl, vec![128, 128, 45]);
        assert_eq!(nl, vec![false, false, true]);
    }

    #[test]
    fn framing_is_deterministic() {
        let data = sample_lines(150);
        let (a, blob_a) = frame_all(&data, small_cfg());
        let (b, blob_b) = frame_all(&data, small_cfg());
        assert_eq!(a.index, b.index);
        assert_eq!(blob_a, blob_b);
    }
}
