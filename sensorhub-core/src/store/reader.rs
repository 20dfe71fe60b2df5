use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::frame::Frame;
use crate::codec::Compressor;
use crate::error::Result;

/// Seek to one frame and decompress it, bounded by its recorded plain length.
pub fn read_frame(file: &mut File, frame: &Frame, codec: &dyn Compressor) -> Result<Vec<u8>> {
    file.seek(SeekFrom::Start(frame.cs))?;
    let mut buf = vec![0u8; frame.cl as usize];
    file.read_exact(&mut buf)?;
    codec.decompress_frame(&buf, frame.dl as usize)
}

/// Plain bytes of a contiguous frame run, concatenated in order.
pub fn read_frames(path: &Path, frames: &[Frame], codec: &dyn Compressor) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let total: u64 = frames.iter().map(|f| f.dl).sum();
    let mut out = Vec::with_capacity(total as usize);
    for f in frames {
        out.extend(read_frame(&mut file, f, codec)?);
    }
    Ok(out)
}

/// Line reader over a whole blob, ignoring any frame index.
pub struct BlobLines<'a> {
    inner: BufReader<Box<dyn Read + 'a>>,
    buf: Vec<u8>,
}

impl BlobLines<'static> {
    pub fn open(path: &Path, codec: &dyn Compressor) -> Result<Self> {
        let file = File::open(path)?;
        let dec = codec.decoder(Box::new(file))?;
        Ok(BlobLines {
            inner: BufReader::with_capacity(1 << 20, dec),
            buf: Vec::new(),
        })
    }
}

impl<'a> BlobLines<'a> {
    pub fn from_reader(r: Box<dyn Read + 'a>) -> Self {
        Self {
            inner: BufReader::new(r),
            buf: Vec::new(),
        }
    }
}

impl Iterator for BlobLines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Split decoded bytes into lossy UTF-8 lines the same way [`BlobLines`] does.
pub fn split_lines(bytes: &[u8]) -> impl Iterator<Item = std::borrow::Cow<'_, str>> {
    let trimmed = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let empty = bytes.is_empty();
    trimmed
        .split(|&b| b == b'\n')
        .filter(move |_| !empty)
        .map(String::from_utf8_lossy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_matches_streaming_lines() {
        let cases: [&[u8]; 5] = [b"", b"a\nb\n", b"a\nb", b"\n\nx\n", b"only"];
        for c in cases {
            let split: Vec<String> = split_lines(c).map(|s| s.into_owned()).collect();
            let streamed: Vec<String> = BlobLines::from_reader(Box::new(c))
                .map(|l| l.unwrap())
                .collect();
            assert_eq!(split, streamed, "input {:?}", String::from_utf8_lossy(c));
        }
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let lines: Vec<String> = split_lines(b"ok\n\xff\xfe\n").map(|s| s.into_owned()).collect();
        assert_eq!(lines[0], "ok");
        assert!(lines[1].contains('\u{FFFD}'));
    }
}
