use std::collections::{BTreeMap, HashMap};

use super::journal::LogRecord;
use crate::domain::{LogicalFile, ParseResult, PhysicalBlob};
use crate::hash::md5::ContentHash;

/// Catalog state rebuilt from the journal.
#[derive(Clone, Debug, Default)]
pub struct CatalogIndex {
    pub blobs: HashMap<ContentHash, PhysicalBlob>,
    pub files: BTreeMap<String, LogicalFile>,
    pub results: HashMap<String, ParseResult>,
}

impl CatalogIndex {
    pub fn apply(&mut self, rec: &LogRecord) {
        match rec {
            LogRecord::PutBlob(b) => {
                self.blobs.insert(b.hash, b.clone());
            }
            LogRecord::SetFrameIndex { hash, index, size } => {
                if let Some(b) = self.blobs.get_mut(hash) {
                    b.frame_index = Some(index.clone());
                    b.size = *size;
                }
            }
            LogRecord::DeleteBlob { hash } => {
                self.blobs.remove(hash);
            }
            LogRecord::PutFile(f) => {
                self.files.insert(f.id.clone(), f.clone());
            }
            LogRecord::DeleteFile { id } => {
                self.files.remove(id);
            }
            LogRecord::PutParseResult(r) => {
                self.results.insert(r.file_id.clone(), r.clone());
            }
            LogRecord::DeleteParseResult { file_id } => {
                self.results.remove(file_id);
            }
        }
    }

    pub fn files_by_hash<'a>(&'a self, hash: &'a ContentHash) -> impl Iterator<Item = &'a LogicalFile> {
        self.files.values().filter(move |f| f.hash == *hash)
    }

    /// Records that rebuild this index from empty.
    pub fn snapshot(&self) -> Vec<LogRecord> {
        let blobs = self.blobs.values().cloned().map(LogRecord::PutBlob);
        let files = self.files.values().cloned().map(LogRecord::PutFile);
        let results = self.results.values().cloned().map(LogRecord::PutParseResult);
        blobs.chain(files).chain(results).collect()
    }

    pub fn ref_count(&self, hash: &ContentHash) -> usize {
        self.files_by_hash(hash).count()
    }
}
