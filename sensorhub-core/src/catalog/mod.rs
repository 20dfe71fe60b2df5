//! Durable catalog of blobs, logical files and parse results.
//!
//! Every change is a transaction: staged against a copy of the index under the
//! writer lock, appended to the journal as one entry, then swapped in.

pub mod index;
pub mod journal;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{
    DeviceKind, LogicalFile, ParsePatch, ParseResult, ParseStatus, PhysicalBlob, now_unix,
};
use crate::error::{HubError, Result};
use crate::hash::md5::ContentHash;
use crate::observability::{log_debug, log_info};
use crate::stats::CatalogStats;
use index::CatalogIndex;
use journal::{Journal, LogRecord, Txn};

pub const CATALOG_FILE: &str = "catalog.log";

/// Journals holding more transactions than this are compacted on open.
pub const COMPACT_AFTER_TXNS: usize = 256;

/// Working copy for one transaction.
pub struct Staging {
    view: CatalogIndex,
    records: Vec<LogRecord>,
}

impl Staging {
    pub fn view(&self) -> &CatalogIndex {
        &self.view
    }

    pub fn stage(&mut self, rec: LogRecord) {
        self.view.apply(&rec);
        self.records.push(rec);
    }
}

struct Inner {
    journal: Journal,
    index: CatalogIndex,
}

pub struct Catalog {
    inner: Mutex<Inner>,
}

/// Result of [`Catalog::register_file`].
#[derive(Debug, Clone)]
pub struct Registered {
    pub file: LogicalFile,
    /// False when an entry with the same hash and filename already existed.
    pub created: bool,
}

/// What [`Catalog::delete_file`] left behind.
#[derive(Debug, Clone)]
pub struct Deleted {
    pub file: LogicalFile,
    /// Set when no other file references the blob any more.
    pub orphaned: Option<ContentHash>,
}

impl Catalog {
    /// Open `<root>/catalog.log` and replay it.
    pub fn open(root: &Path) -> Result<Self> {
        Self::open_path(&root.join(CATALOG_FILE))
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        let mut journal = Journal::open(path)?;
        let mut index = CatalogIndex::default();
        let txns = journal.replay()?;
        for txn in &txns {
            for rec in &txn.records {
                index.apply(rec);
            }
        }
        log_info!(
            component = "catalog",
            event = "opened",
            path = %path.display(),
            txns = txns.len(),
            blobs = index.blobs.len(),
            files = index.files.len()
        );
        let catalog = Self {
            inner: Mutex::new(Inner { journal, index }),
        };
        if txns.len() > COMPACT_AFTER_TXNS {
            catalog.compact()?;
        }
        Ok(catalog)
    }

    /// Rewrite the journal as one snapshot transaction of the current state.
    /// Returns the number of records in the snapshot.
    pub fn compact(&self) -> Result<usize> {
        let mut g = self.lock();
        let records = g.index.snapshot();
        let n = records.len();
        let before = std::fs::metadata(g.journal.path())?.len();
        g.journal.rewrite(&Txn {
            at: now_unix(),
            records,
        })?;
        let after = std::fs::metadata(g.journal.path())?.len();
        log_info!(
            component = "catalog",
            event = "compacted",
            records = n,
            bytes_before = before,
            bytes_after = after
        );
        Ok(n)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against a working copy. Staged records are committed as one
    /// journal entry when `f` succeeds; nothing is written when it fails.
    pub fn transact<T>(&self, f: impl FnOnce(&mut Staging) -> Result<T>) -> Result<T> {
        let mut g = self.lock();
        let mut st = Staging {
            view: g.index.clone(),
            records: Vec::new(),
        };
        let out = f(&mut st)?;
        if !st.records.is_empty() {
            g.journal.append(&Txn {
                at: now_unix(),
                records: st.records,
            })?;
            g.index = st.view;
        }
        Ok(out)
    }

    fn read<T>(&self, f: impl FnOnce(&CatalogIndex) -> T) -> T {
        f(&self.lock().index)
    }

    /// Insert a blob record if absent. An existing record without a frame
    /// index picks up the new one.
    pub fn put_blob(&self, blob: PhysicalBlob) -> Result<PhysicalBlob> {
        self.transact(|st| Ok(stage_blob(st, blob)))
    }

    pub fn update_frame_index(&self, hash: &ContentHash, index: serde_json::Value, size: u64) -> Result<()> {
        self.transact(|st| {
            if !st.view().blobs.contains_key(hash) {
                return Err(HubError::NotFound(format!("blob {hash}")));
            }
            st.stage(LogRecord::SetFrameIndex {
                hash: *hash,
                index,
                size,
            });
            Ok(())
        })
    }

    /// Add a logical file for `hash`. Same hash and same filename returns the
    /// existing entry untouched.
    pub fn register_file(
        &self,
        hash: &ContentHash,
        filename: &str,
        file_size_bytes: u64,
        device: DeviceKind,
        has_output: bool,
    ) -> Result<Registered> {
        self.transact(|st| Ok(stage_file(st, hash, filename, file_size_bytes, device, has_output)))
    }

    /// Record a stored blob and a file referencing it in one transaction, so
    /// no reader ever sees the file without its blob.
    pub fn register_upload(
        &self,
        blob: PhysicalBlob,
        filename: &str,
        file_size_bytes: u64,
        device: DeviceKind,
        has_output: bool,
    ) -> Result<Registered> {
        self.transact(|st| {
            let hash = blob.hash;
            stage_blob(st, blob);
            Ok(stage_file(st, &hash, filename, file_size_bytes, device, has_output))
        })
    }

    pub fn next_naming_suffix(&self, filename: &str) -> String {
        self.read(|ix| naming_suffix(ix, filename))
    }

    /// Remove a file and its parse result, and the blob record too when this
    /// was its last reference. Files on disk are the caller's job.
    pub fn delete_file(&self, id: &str) -> Result<Deleted> {
        self.transact(|st| {
            let file = st
                .view()
                .files
                .get(id)
                .cloned()
                .ok_or_else(|| HubError::NotFound(format!("file {id}")))?;
            st.stage(LogRecord::DeleteFile { id: id.to_string() });
            if st.view().results.contains_key(id) {
                st.stage(LogRecord::DeleteParseResult {
                    file_id: id.to_string(),
                });
            }
            let refs = st.view().ref_count(&file.hash);
            let orphaned = if refs == 0 {
                st.stage(LogRecord::DeleteBlob { hash: file.hash });
                Some(file.hash)
            } else {
                None
            };
            log_info!(
                component = "catalog",
                event = "file_deleted",
                id,
                hash = %file.hash,
                remaining_refs = refs
            );
            Ok(Deleted { file, orphaned })
        })
    }

    /// Create or update the parse result for `file_id`.
    pub fn upsert_parse_result(&self, file_id: &str, patch: ParsePatch) -> Result<ParseResult> {
        self.transact(|st| {
            if !st.view().files.contains_key(file_id) {
                return Err(HubError::NotFound(format!("file {file_id}")));
            }
            let now = now_unix();
            let mut r = st
                .view()
                .results
                .get(file_id)
                .cloned()
                .unwrap_or_else(|| ParseResult::new(file_id, ParseStatus::Idle, now));
            patch.apply(&mut r, now);
            st.stage(LogRecord::PutParseResult(r.clone()));
            Ok(r)
        })
    }

    /// Reset parses left `processing` by a previous run. Returns how many.
    pub fn recover_stale(&self) -> Result<usize> {
        self.transact(|st| {
            let now = now_unix();
            let stale: Vec<ParseResult> = st
                .view()
                .results
                .values()
                .filter(|r| r.status == ParseStatus::Processing)
                .cloned()
                .collect();
            for mut r in stale.iter().cloned() {
                ParsePatch {
                    status: Some(ParseStatus::Idle),
                    progress: Some(None),
                    error_message: Some(None),
                    ..Default::default()
                }
                .apply(&mut r, now);
                st.stage(LogRecord::PutParseResult(r));
            }
            if !stale.is_empty() {
                log_info!(component = "catalog", event = "stale_recovered", count = stale.len());
            }
            Ok(stale.len())
        })
    }

    pub fn files_by_hash(&self, hash: &ContentHash) -> Vec<LogicalFile> {
        self.read(|ix| ix.files_by_hash(hash).cloned().collect())
    }

    pub fn get_file(&self, id: &str) -> Option<LogicalFile> {
        self.read(|ix| ix.files.get(id).cloned())
    }

    /// Newest upload first.
    pub fn list_files(&self) -> Vec<LogicalFile> {
        let mut files: Vec<LogicalFile> = self.read(|ix| ix.files.values().cloned().collect());
        files.sort_by(|a, b| {
            b.uploaded_at
                .cmp(&a.uploaded_at)
                .then_with(|| a.display_name().cmp(&b.display_name()))
        });
        files
    }

    pub fn get_blob(&self, hash: &ContentHash) -> Option<PhysicalBlob> {
        self.read(|ix| ix.blobs.get(hash).cloned())
    }

    pub fn get_parse_result(&self, file_id: &str) -> Option<ParseResult> {
        self.read(|ix| ix.results.get(file_id).cloned())
    }

    pub fn stats(&self) -> CatalogStats {
        self.read(CatalogStats::collect)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.lock().journal.path().to_path_buf()
    }
}

fn stage_blob(st: &mut Staging, blob: PhysicalBlob) -> PhysicalBlob {
    let Some(existing) = st.view().blobs.get(&blob.hash).cloned() else {
        st.stage(LogRecord::PutBlob(blob.clone()));
        return blob;
    };
    if existing.frame_index.is_none() {
        if let Some(index) = blob.frame_index {
            st.stage(LogRecord::SetFrameIndex {
                hash: blob.hash,
                index,
                size: blob.size,
            });
        }
    }
    st.view().blobs.get(&blob.hash).cloned().unwrap_or(existing)
}

fn stage_file(
    st: &mut Staging,
    hash: &ContentHash,
    filename: &str,
    file_size_bytes: u64,
    device: DeviceKind,
    has_output: bool,
) -> Registered {
    if let Some(f) = st.view().files_by_hash(hash).find(|f| f.filename == filename) {
        log_debug!(component = "catalog", event = "exact_match_skip", id = %f.id, filename);
        return Registered {
            file: f.clone(),
            created: false,
        };
    }
    let now = now_unix();
    let file = LogicalFile {
        id: uuid::Uuid::new_v4().to_string(),
        hash: *hash,
        filename: filename.to_string(),
        name_suffix: naming_suffix(st.view(), filename),
        size: human_size(file_size_bytes),
        file_size_bytes,
        device,
        uploaded_at: now,
    };
    let status = if has_output {
        ParseStatus::Processed
    } else {
        ParseStatus::Idle
    };
    st.stage(LogRecord::PutFile(file.clone()));
    st.stage(LogRecord::PutParseResult(ParseResult::new(&file.id, status, now)));
    log_info!(
        component = "catalog",
        event = "file_registered",
        id = %file.id,
        name = %file.display_name(),
        hash = %hash,
        status = %status
    );
    Registered {
        file,
        created: true,
    }
}

fn naming_suffix(ix: &CatalogIndex, filename: &str) -> String {
    let mut any = false;
    let mut has_plain = false;
    let mut max = 0u64;
    for f in ix.files.values().filter(|f| f.filename == filename) {
        any = true;
        if f.name_suffix.is_empty() {
            has_plain = true;
        } else if let Some(n) = parse_suffix(&f.name_suffix) {
            max = max.max(n);
        }
    }
    if !any || !has_plain {
        return String::new();
    }
    format!(" ({})", max + 1)
}

/// `" (12)"` to 12.
fn parse_suffix(s: &str) -> Option<u64> {
    let digits = s.strip_prefix(" (")?.strip_suffix(')')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `512 B`, `1.5 KB`, `12.0 MB`, `2.3 GB`.
pub fn human_size(bytes: u64) -> String {
    const K: f64 = 1024.0;
    let b = bytes as f64;
    if bytes < 1024 {
        format!("{bytes} B")
    } else if b < K * K {
        format!("{:.1} KB", b / K)
    } else if b < K * K * K {
        format!("{:.1} MB", b / (K * K))
    } else {
        format!("{:.1} GB", b / (K * K * K))
    }
}
