use serde::{Deserialize, Serialize};

use crate::config::FrameConfig;

pub const FRAME_INDEX_VERSION: u32 = 2;

/// One independently compressed frame of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Compressed start offset in the blob file.
    pub cs: u64,
    /// Compressed length.
    pub cl: u64,
    /// Decompressed start offset.
    pub ds: u64,
    /// Decompressed length.
    pub dl: u64,
    /// The frame ends on a line boundary.
    pub nl: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameIndex {
    pub version: u32,
    pub frame_size: u64,
    pub max_frame_size: u64,
    pub line_aligned: bool,
    pub original_size: u64,
    pub compressed_size: u64,
    pub frames: Vec<Frame>,
}

impl FrameIndex {
    pub fn new(cfg: &FrameConfig, frames: Vec<Frame>) -> Self {
        let original_size = frames.iter().map(|f| f.dl).sum();
        let compressed_size = frames.iter().map(|f| f.cl).sum();
        Self {
            version: FRAME_INDEX_VERSION,
            frame_size: cfg.min_frame_size as u64,
            max_frame_size: cfg.max_frame_size as u64,
            line_aligned: true,
            original_size,
            compressed_size,
            frames,
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        // A struct of plain integers and bools always serializes.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Where the frame starting at the head of `buf` ends.
///
/// `buf` holds everything from the frame start up to the known end of input
/// (or at least `max` bytes while more input may follow). Returns the exclusive
/// end and whether the frame closes on a newline.
pub fn frame_boundary(buf: &[u8], min: usize, max: usize) -> (usize, bool) {
    let total = buf.len();
    let mut end = min.min(total);
    let mut nl = false;
    if end < total {
        let max_end = max.min(total);
        match buf[end..max_end].iter().position(|&b| b == b'\n') {
            Some(p) => {
                end += p + 1;
                nl = true;
            }
            None => end = max_end,
        }
    }
    if !nl && end > 0 && buf[end - 1] == b'\n' {
        nl = true;
    }
    (end, nl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_on_first_newline_past_min() {
        let buf = b"aaaa\nbbbb\ncc";
        assert_eq!(frame_boundary(buf, 3, 8), (5, true));
        assert_eq!(frame_boundary(buf, 6, 12), (10, true));
    }

    #[test]
    fn hard_cut_at_max_without_newline() {
        let buf = b"abcdefghij";
        assert_eq!(frame_boundary(buf, 2, 4), (4, false));
    }

    #[test]
    fn tail_shorter_than_min_is_one_frame() {
        assert_eq!(frame_boundary(b"abc\n", 8, 16), (4, true));
        assert_eq!(frame_boundary(b"abc", 8, 16), (3, false));
    }

    #[test]
    fn min_landing_right_after_newline_counts() {
        // end == min and byte end-1 is '\n', but more data follows: still searches forward
        let buf = b"abc\ndefgh\nij";
        assert_eq!(frame_boundary(buf, 4, 6), (6, false));
        assert_eq!(frame_boundary(buf, 4, 12), (10, true));
    }

    #[test]
    fn index_json_uses_camel_case() {
        let cfg = FrameConfig::default();
        let idx = FrameIndex::new(
            &cfg,
            vec![Frame {
                cs: 0,
                cl: 10,
                ds: 0,
                dl: 20,
                nl: true,
            }],
        );
        let v = idx.to_value();
        assert_eq!(v["version"], 2);
        assert_eq!(v["frameSize"], 2 * 1024 * 1024);
        assert_eq!(v["maxFrameSize"], 4 * 1024 * 1024);
        assert_eq!(v["lineAligned"], true);
        assert_eq!(v["originalSize"], 20);
        assert_eq!(v["compressedSize"], 10);
        assert_eq!(v["frames"][0]["dl"], 20);
    }
}
