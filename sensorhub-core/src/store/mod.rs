//! Content-addressed blob store.
//!
//! Layout under the storage root:
//!
//! ```text
//! raw/<hash>.raw.zst      line-aligned zstd frames, concatenated
//! processed/<hash>/       materialized tables + manifest.json
//! ```

pub mod frame;
pub mod reader;
pub mod writer;

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::Compressor;
use crate::codec::zstdc::ZstdCompressor;
use crate::config::FrameConfig;
use crate::error::{HubError, Result};
use crate::hash::md5::ContentHash;
use crate::observability::{log_info, log_warn};
use frame::FrameIndex;
use writer::FrameWriter;

pub const RAW_DIR: &str = "raw";
pub const PROCESSED_DIR: &str = "processed";
pub const RAW_SUFFIX: &str = ".raw.zst";

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub hash: ContentHash,
    /// `None` when a deduplicated blob on disk was framed differently.
    pub frame_index: Option<FrameIndex>,
    /// Size of the blob file on disk.
    pub compressed_size: u64,
    pub original_size: u64,
    pub deduplicated: bool,
    pub path: PathBuf,
}

/// A framed upload waiting in a temp file. Dropping it removes the file.
#[derive(Debug)]
pub struct Staged {
    tmp_path: tempfile::TempPath,
    pub hash: ContentHash,
    pub index: FrameIndex,
}

#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub valid: bool,
    pub rebuilt: bool,
    pub frame_index: FrameIndex,
    /// Compressed size after rebuild.
    pub size: u64,
    /// Decompressed size.
    pub file_size_bytes: u64,
}

pub struct FrameStore {
    root: PathBuf,
    frames: FrameConfig,
    codec: Arc<dyn Compressor>,
}

impl FrameStore {
    pub fn open(root: impl Into<PathBuf>, frames: FrameConfig) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(RAW_DIR))?;
        fs::create_dir_all(root.join(PROCESSED_DIR))?;
        Ok(Self {
            root,
            frames: frames.normalized(),
            codec: Arc::new(ZstdCompressor),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn codec(&self) -> &dyn Compressor {
        self.codec.as_ref()
    }

    pub fn frame_config(&self) -> FrameConfig {
        self.frames
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join(RAW_DIR)
    }

    pub fn processed_root(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    pub fn read_path(&self, hash: &ContentHash) -> PathBuf {
        self.raw_dir().join(format!("{hash}{RAW_SUFFIX}"))
    }

    /// `processed/<hash>/`, created if missing.
    pub fn output_dir(&self, hash: &ContentHash) -> Result<PathBuf> {
        let dir = self.processed_root().join(hash.to_hex());
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// True when `processed/<hash>/` exists and holds at least one entry.
    pub fn has_output(&self, hash: &ContentHash) -> bool {
        let dir = self.processed_root().join(hash.to_hex());
        fs::read_dir(dir)
            .map(|mut it| it.next().is_some())
            .unwrap_or(false)
    }

    pub fn physical_size(&self, hash: &ContentHash) -> Result<u64> {
        Ok(fs::metadata(self.read_path(hash))?.len())
    }

    /// Frame, hash and store an uncompressed stream. An existing blob with the
    /// same hash wins and the new bytes are dropped.
    pub fn write<R: Read>(&self, src: R) -> Result<WriteOutcome> {
        self.place(self.stage(src)?)
    }

    /// Frame and hash `src` into a temp file under `raw/`. Nothing is visible
    /// under the blob's name until [`FrameStore::place`].
    pub fn stage<R: Read>(&self, mut src: R) -> Result<Staged> {
        let tmp = tempfile::Builder::new()
            .prefix("ingest-")
            .suffix(".tmp")
            .tempfile_in(self.raw_dir())?;
        let (file, tmp_path) = tmp.into_parts();

        let mut fw = FrameWriter::new(BufWriter::new(file), self.codec(), self.frames);
        std::io::copy(&mut src, &mut fw)?;
        let out = fw.finish()?;
        out.inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;

        Ok(Staged {
            tmp_path,
            hash: out.hash,
            index: out.index,
        })
    }

    /// Move a staged blob to `raw/<hash>.raw.zst`, or drop it when that blob
    /// already exists.
    pub fn place(&self, staged: Staged) -> Result<WriteOutcome> {
        let Staged {
            tmp_path,
            hash,
            index,
        } = staged;
        let target = self.read_path(&hash);
        let original_size = index.original_size;
        if target.exists() {
            let existing = fs::metadata(&target)?.len();
            drop(tmp_path);
            log_info!(component = "store", event = "blob_deduplicated", hash = %hash);
            let frame_index = (existing == index.compressed_size).then_some(index);
            return Ok(WriteOutcome {
                hash,
                frame_index,
                compressed_size: existing,
                original_size,
                deduplicated: true,
                path: target,
            });
        }
        tmp_path.persist(&target).map_err(|e| e.error)?;
        log_info!(
            component = "store",
            event = "blob_written",
            hash = %hash,
            frames = index.frames.len(),
            compressed = index.compressed_size,
            original = original_size
        );
        Ok(WriteOutcome {
            hash,
            compressed_size: index.compressed_size,
            frame_index: Some(index),
            original_size,
            deduplicated: false,
            path: target,
        })
    }

    /// Accept a stream that is already zstd-compressed in an unknown layout.
    /// It is spooled, verified against `expected`, re-framed and deduplicated.
    pub fn import_compressed<R: Read>(
        &self,
        src: R,
        expected: &ContentHash,
    ) -> Result<WriteOutcome> {
        self.place(self.stage_compressed(src, expected)?)
    }

    /// Spool and verify a compressed upload without placing it.
    pub fn stage_compressed<R: Read>(&self, mut src: R, expected: &ContentHash) -> Result<Staged> {
        let spool = tempfile::Builder::new()
            .prefix("import-")
            .suffix(".zst")
            .tempfile_in(self.raw_dir())?;
        let (file, spool_path) = spool.into_parts();
        {
            let mut w = BufWriter::new(file);
            std::io::copy(&mut src, &mut w)?;
            w.flush()?;
        }
        // On mismatch the spool is dropped and removed with the error.
        let verified = self.verify_and_rebuild(&spool_path, expected)?;
        Ok(Staged {
            tmp_path: spool_path,
            hash: *expected,
            index: verified.frame_index,
        })
    }

    /// Decompress `path` in full, rehash it and, on a match, replace it with a
    /// freshly framed copy. A mismatch fails without touching `path`.
    pub fn verify_and_rebuild(&self, path: &Path, expected: &ContentHash) -> Result<VerifyOutcome> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::Builder::new()
            .prefix("rebuild-")
            .suffix(".tmp")
            .tempfile_in(dir)?;
        let (file, tmp_path) = tmp.into_parts();

        let mut fw = FrameWriter::new(BufWriter::new(file), self.codec(), self.frames);
        {
            let src = File::open(path)?;
            let mut dec = self.codec.decoder(Box::new(src))?;
            std::io::copy(&mut dec, &mut fw)?;
        }
        let out = fw.finish()?;
        let actual = out.hash;
        if actual != *expected {
            log_warn!(
                component = "store",
                event = "verify_mismatch",
                expected = %expected,
                actual = %actual,
                path = %path.display()
            );
            return Err(HubError::HashMismatch {
                expected: expected.to_hex(),
                actual: actual.to_hex(),
            });
        }
        out.inner.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        tmp_path.persist(path).map_err(|e| e.error)?;

        let index = out.index;
        log_info!(
            component = "store",
            event = "blob_rebuilt",
            hash = %expected,
            frames = index.frames.len()
        );
        Ok(VerifyOutcome {
            valid: true,
            rebuilt: true,
            size: index.compressed_size,
            file_size_bytes: index.original_size,
            frame_index: index,
        })
    }

    /// Remove the blob and its processed directory. Reference counting is the caller's job.
    pub fn delete(&self, hash: &ContentHash) -> Result<()> {
        let raw = self.read_path(hash);
        if raw.exists() {
            fs::remove_file(&raw)?;
            log_info!(component = "store", event = "blob_deleted", hash = %hash);
        }
        let out = self.processed_root().join(hash.to_hex());
        if out.is_dir() {
            fs::remove_dir_all(&out)?;
            log_info!(component = "store", event = "output_deleted", hash = %hash);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::reader::read_frames;
    use tempfile::tempdir;

    fn small() -> FrameConfig {
        FrameConfig {
            min_frame_size: 256,
            max_frame_size: 512,
            level: 3,
        }
    }

    fn sample(n: usize) -> Vec<u8> {
        (0..n)
            .flat_map(|i| format!("2024-05-01 10:00:00,{i:08x},payload\n").into_bytes())
            .collect()
    }

    #[test]
    fn write_then_read_back_every_frame() {
        let dir = tempdir().unwrap();
        let store = FrameStore::open(dir.path(), small()).unwrap();
        let data = sample(300);

        let out = store.write(&data[..]).unwrap();
        assert!(!out.deduplicated);
        assert_eq!(out.hash, ContentHash::compute(&data));
        assert_eq!(out.path, store.read_path(&out.hash));

        let index = out.frame_index.unwrap();
        assert_eq!(store.physical_size(&out.hash).unwrap(), index.compressed_size);
        let back = read_frames(&out.path, &index.frames, store.codec()).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn same_content_is_stored_once() {
        let dir = tempdir().unwrap();
        let store = FrameStore::open(dir.path(), small()).unwrap();
        let data = sample(100);

        let a = store.write(&data[..]).unwrap();
        let b = store.write(&data[..]).unwrap();
        assert_eq!(a.hash, b.hash);
        assert!(b.deduplicated);
        assert_eq!(a.compressed_size, b.compressed_size);

        let raws: Vec<_> = fs::read_dir(store.raw_dir()).unwrap().collect();
        assert_eq!(raws.len(), 1, "temp files must not linger");
    }

    #[test]
    fn rebuild_is_stable() {
        let dir = tempdir().unwrap();
        let store = FrameStore::open(dir.path(), small()).unwrap();
        let data = sample(250);
        let out = store.write(&data[..]).unwrap();
        let first = out.frame_index.unwrap();

        let v1 = store.verify_and_rebuild(&out.path, &out.hash).unwrap();
        let v2 = store.verify_and_rebuild(&out.path, &out.hash).unwrap();
        assert!(v1.valid && v1.rebuilt);
        assert_eq!(v1.frame_index, first);
        assert_eq!(v1.frame_index, v2.frame_index);
        assert_eq!(v2.file_size_bytes, data.len() as u64);
    }

    #[test]
    fn verify_mismatch_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let store = FrameStore::open(dir.path(), small()).unwrap();
        let out = store.write(&sample(40)[..]).unwrap();
        let before = fs::read(&out.path).unwrap();

        let wrong = ContentHash::compute(b"something else");
        let err = store.verify_and_rebuild(&out.path, &wrong).unwrap_err();
        assert!(matches!(err, HubError::HashMismatch { .. }));
        assert_eq!(fs::read(&out.path).unwrap(), before);
        assert_eq!(fs::read_dir(store.raw_dir()).unwrap().count(), 1);
    }

    #[test]
    fn import_reframes_a_single_stream() {
        let dir = tempdir().unwrap();
        let store = FrameStore::open(dir.path(), small()).unwrap();
        let data = sample(200);
        let whole = zstd::encode_all(&data[..], 3).unwrap();
        let hash = ContentHash::compute(&data);

        let out = store.import_compressed(&whole[..], &hash).unwrap();
        assert_eq!(out.hash, hash);
        let index = out.frame_index.unwrap();
        assert!(index.frames.len() > 1);
        assert_eq!(read_frames(&out.path, &index.frames, store.codec()).unwrap(), data);

        let bad = store.import_compressed(&whole[..], &ContentHash::compute(b"x"));
        assert!(matches!(bad, Err(HubError::HashMismatch { .. })));
        assert_eq!(fs::read_dir(store.raw_dir()).unwrap().count(), 1);
    }

    #[test]
    fn delete_removes_blob_and_output() {
        let dir = tempdir().unwrap();
        let store = FrameStore::open(dir.path(), small()).unwrap();
        let out = store.write(&sample(10)[..]).unwrap();
        let od = store.output_dir(&out.hash).unwrap();
        fs::write(od.join("manifest.json"), "{}").unwrap();
        assert!(store.has_output(&out.hash));

        store.delete(&out.hash).unwrap();
        assert!(!out.path.exists());
        assert!(!od.exists());
        assert!(!store.has_output(&out.hash));
    }
}
