use serde::Serialize;

use crate::catalog::index::CatalogIndex;
use crate::domain::ParseStatus;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    pub files: u64,
    pub blobs: u64,
    /// Sum of decompressed sizes over logical files.
    pub logical_bytes: u64,
    /// Sum of blob sizes on disk.
    pub physical_bytes: u64,
    /// logical / physical; 0 when nothing is stored.
    pub dedup_ratio: f32,
    pub idle: u64,
    pub processing: u64,
    pub processed: u64,
    pub error: u64,
}

impl CatalogStats {
    pub fn collect(ix: &CatalogIndex) -> Self {
        let mut s = Self {
            files: ix.files.len() as u64,
            blobs: ix.blobs.len() as u64,
            logical_bytes: ix.files.values().map(|f| f.file_size_bytes).sum(),
            physical_bytes: ix.blobs.values().map(|b| b.size).sum(),
            ..Default::default()
        };
        if s.physical_bytes > 0 {
            s.dedup_ratio = s.logical_bytes as f32 / s.physical_bytes as f32;
        }
        for r in ix.results.values() {
            match r.status {
                ParseStatus::Idle => s.idle += 1,
                ParseStatus::Processing => s.processing += 1,
                ParseStatus::Processed => s.processed += 1,
                ParseStatus::Error => s.error += 1,
            }
        }
        s
    }
}
