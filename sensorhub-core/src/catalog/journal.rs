use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::domain::{LogicalFile, ParseResult, PhysicalBlob};
use crate::error::{HubError, Result};
use crate::hash::md5::ContentHash;
use crate::observability::{log_debug, log_warn};

const MAGIC: &[u8; 8] = b"SHCATLG\0";
const VERSION: u8 = 1;
const HEADER_LEN: u64 = MAGIC.len() as u64 + 1;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum LogRecord {
    PutBlob(PhysicalBlob),
    SetFrameIndex {
        hash: ContentHash,
        index: serde_json::Value,
        size: u64,
    },
    DeleteBlob {
        hash: ContentHash,
    },
    PutFile(LogicalFile),
    DeleteFile {
        id: String,
    },
    PutParseResult(ParseResult),
    DeleteParseResult {
        file_id: String,
    },
}

/// Records committed together. A transaction is one journal entry, so it is
/// either replayed whole or not at all.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Txn {
    pub at: i64,
    pub records: Vec<LogRecord>,
}

pub struct Journal {
    f: File,
    path: PathBuf,
}

enum Next {
    Txn(Txn),
    End,
    Torn,
}

fn read_next(f: &mut File) -> Result<Next> {
    let len = match get_uvarint(f) {
        Ok(Some(n)) => n,
        Ok(None) => return Ok(Next::End),
        Err(HubError::Journal(_)) => return Ok(Next::Torn),
        Err(e) => return Err(e),
    };
    // A length past the end of the file is a torn tail.
    let left = f.metadata()?.len().saturating_sub(f.stream_position()?);
    if len > left {
        return Ok(Next::Torn);
    }
    let mut buf = vec![0u8; len as usize];
    if let Err(e) = f.read_exact(&mut buf) {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            return Ok(Next::Torn);
        }
        return Err(e.into());
    }
    let txn: Txn =
        ciborium::from_reader(&buf[..]).map_err(|e| HubError::Journal(e.to_string()))?;
    Ok(Next::Txn(txn))
}

fn put_uvarint(out: &mut Vec<u8>, mut x: u64) {
    while x >= 0x80 {
        out.push((x as u8) | 0x80);
        x >>= 7;
    }
    out.push(x as u8);
}

/// `Ok(None)` at a clean end of file. A varint cut short also reads as the end;
/// the caller sees the leftover bytes as a torn tail.
fn get_uvarint<R: Read>(r: &mut R) -> Result<Option<u64>> {
    let mut x: u64 = 0;
    let mut s: u32 = 0;
    for _ in 0..10 {
        let mut b = [0u8; 1];
        match r.read(&mut b) {
            Ok(0) => return Ok(None),
            Ok(_) => {
                let byte = b[0];
                if byte < 0x80 {
                    x |= (byte as u64) << s;
                    return Ok(Some(x));
                }
                x |= ((byte & 0x7f) as u64) << s;
                s += 7;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(HubError::Journal("varint too long".into()))
}

fn write_header(f: &mut File) -> Result<()> {
    f.write_all(MAGIC)?;
    f.write_all(&[VERSION])?;
    Ok(())
}

fn frame(txn: &Txn) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(256);
    ciborium::into_writer(txn, &mut payload).map_err(|e| HubError::Journal(e.to_string()))?;
    let mut out = Vec::with_capacity(payload.len() + 10);
    put_uvarint(&mut out, payload.len() as u64);
    out.extend_from_slice(&payload);
    Ok(out)
}

impl Journal {
    /// Open or create the journal at `path`. A file with a foreign header is
    /// rejected rather than overwritten.
    pub fn open(path: &Path) -> Result<Self> {
        let mut f = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if f.metadata()?.len() == 0 {
            write_header(&mut f)?;
            f.sync_all()?;
        } else {
            let mut magic = [0u8; 8];
            let mut ver = [0u8; 1];
            f.read_exact(&mut magic)
                .and_then(|_| f.read_exact(&mut ver))
                .map_err(|_| HubError::Journal(format!("{}: truncated header", path.display())))?;
            if &magic != MAGIC {
                return Err(HubError::Journal(format!(
                    "{}: not a catalog journal",
                    path.display()
                )));
            }
            if ver[0] != VERSION {
                return Err(HubError::Journal(format!(
                    "{}: unsupported version {}",
                    path.display(),
                    ver[0]
                )));
            }
        }
        f.seek(SeekFrom::End(0))?;
        Ok(Self {
            f,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one transaction and sync it.
    pub fn append(&mut self, txn: &Txn) -> Result<()> {
        self.f.write_all(&frame(txn)?)?;
        self.f.sync_data()?;
        Ok(())
    }

    /// Replace the whole journal with a single `snapshot` entry. The new file
    /// is synced and renamed over the old one, so a crash leaves one or the
    /// other intact.
    pub fn rewrite(&mut self, snapshot: &Txn) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        write_header(tmp.as_file_mut())?;
        tmp.as_file_mut().write_all(&frame(snapshot)?)?;
        tmp.as_file().sync_all()?;
        let mut f = tmp.persist(&self.path).map_err(|e| HubError::Io(e.error))?;
        f.seek(SeekFrom::End(0))?;
        self.f = f;
        Ok(())
    }

    /// Read every committed transaction. A torn tail is cut off so later
    /// appends start on a clean boundary.
    pub fn replay(&mut self) -> Result<Vec<Txn>> {
        self.f.seek(SeekFrom::Start(HEADER_LEN))?;
        let mut out = Vec::new();
        let mut good = HEADER_LEN;
        loop {
            match read_next(&mut self.f)? {
                Next::Txn(t) => {
                    out.push(t);
                    good = self.f.stream_position()?;
                }
                Next::End => break,
                Next::Torn => break,
            }
        }
        let len = self.f.metadata()?.len();
        if len > good {
            log_warn!(
                component = "catalog",
                event = "torn_tail_truncated",
                path = %self.path.display(),
                offset = good,
                dropped = len - good
            );
            self.f.set_len(good)?;
        }
        self.f.seek(SeekFrom::End(0))?;
        log_debug!(component = "catalog", event = "journal_replayed", txns = out.len());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str) -> Txn {
        Txn {
            at: 1,
            records: vec![LogRecord::DeleteFile { id: id.into() }],
        }
    }

    #[test]
    fn appended_transactions_replay_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.log");
        {
            let mut j = Journal::open(&path).unwrap();
            j.append(&note("a")).unwrap();
            j.append(&note("b")).unwrap();
        }
        let mut j = Journal::open(&path).unwrap();
        assert_eq!(j.replay().unwrap(), vec![note("a"), note("b")]);
    }

    #[test]
    fn torn_tail_is_dropped_and_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.log");
        {
            let mut j = Journal::open(&path).unwrap();
            j.append(&note("a")).unwrap();
        }
        let good_len = std::fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            // Length says 40 bytes, only 3 follow.
            f.write_all(&[40, 1, 2, 3]).unwrap();
        }
        let mut j = Journal::open(&path).unwrap();
        assert_eq!(j.replay().unwrap(), vec![note("a")]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);

        j.append(&note("b")).unwrap();
        let mut j = Journal::open(&path).unwrap();
        assert_eq!(j.replay().unwrap().len(), 2);
    }

    #[test]
    fn oversized_length_prefix_is_a_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.log");
        {
            let mut j = Journal::open(&path).unwrap();
            j.append(&note("a")).unwrap();
        }
        let good_len = std::fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            // ~64 GiB length followed by a few garbage bytes.
            let mut tail = Vec::new();
            put_uvarint(&mut tail, 1 << 36);
            tail.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
            f.write_all(&tail).unwrap();
        }
        let mut j = Journal::open(&path).unwrap();
        assert_eq!(j.replay().unwrap(), vec![note("a")]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), good_len);
    }

    #[test]
    fn overlong_varint_is_a_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.log");
        {
            let mut j = Journal::open(&path).unwrap();
            j.append(&note("a")).unwrap();
            j.f.write_all(&[0xff; 12]).unwrap();
        }
        let mut j = Journal::open(&path).unwrap();
        assert_eq!(j.replay().unwrap(), vec![note("a")]);
    }

    #[test]
    fn rewrite_replaces_history_with_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.log");
        let mut j = Journal::open(&path).unwrap();
        for id in ["a", "b", "c"] {
            j.append(&note(id)).unwrap();
        }
        j.rewrite(&note("snap")).unwrap();
        j.append(&note("d")).unwrap();
        drop(j);

        let mut j = Journal::open(&path).unwrap();
        assert_eq!(j.replay().unwrap(), vec![note("snap"), note("d")]);
    }

    #[test]
    fn foreign_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.log");
        std::fs::write(&path, b"not a journal at all").unwrap();
        assert!(matches!(Journal::open(&path), Err(HubError::Journal(_))));
    }

    #[test]
    fn uvarint_boundaries() {
        for x in [0u64, 127, 128, 16_383, 16_384, u32::MAX as u64] {
            let mut buf = Vec::new();
            put_uvarint(&mut buf, x);
            assert_eq!(get_uvarint(&mut &buf[..]).unwrap(), Some(x));
        }
    }
}
