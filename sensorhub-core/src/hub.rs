//! `SensorHub`: storage, catalog and parse jobs behind one handle.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::catalog::{Catalog, Deleted};
use crate::config::Settings;
use crate::decode::PartialResult;
use crate::dispatch::Dispatcher;
use crate::domain::{
    DeviceKind, LogicalFile, ParsePatch, ParseResult, ParseStatus, PhysicalBlob, now_unix,
};
use crate::error::{HubError, Result};
use crate::hash::md5::ContentHash;
use crate::materialize::manifest::{
    Manifest, Packet, RawFileRef, duration_seconds, format_duration, packets,
};
use crate::materialize::write_tables;
use crate::observability::{log_error, log_info, log_warn};
use crate::plan::{Batch, plan_batches, validate};
use crate::progress::{ProgressStore, Subscription};
use crate::store::{FrameStore, RAW_SUFFIX, Staged, VerifyOutcome};

pub const TABLES_WRITTEN_PROGRESS: u8 = 95;
pub const MANIFEST_WRITTEN_PROGRESS: u8 = 98;

/// content_meta keys owned by the parser. Dropped before a re-parse.
const GENERATED_META: [&str; 4] = ["manifest", "parse_summary", "duration_seconds", "raw_file_size"];

/// What an upload turned into.
#[derive(Debug, Clone)]
pub struct Ingested {
    pub file: LogicalFile,
    /// False when the same content was already registered under this name.
    pub created: bool,
    pub deduplicated: bool,
    pub compressed_size: u64,
}

/// Output of one parse of a blob.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    pub dir: PathBuf,
    pub manifest: Manifest,
    pub packets: Vec<Packet>,
}

/// Extra context written into the manifest.
#[derive(Debug, Clone, Default)]
pub struct ParseContext {
    pub file_id: Option<String>,
    pub filename: Option<String>,
    pub content_meta: Map<String, Value>,
}

pub struct SensorHub {
    settings: Settings,
    store: FrameStore,
    catalog: Catalog,
    progress: ProgressStore,
    blob_locks: DashMap<ContentHash, Arc<Mutex<()>>>,
}

impl SensorHub {
    /// Open the storage root named in `settings` and reset stale parses.
    pub fn open(settings: Settings) -> Result<Self> {
        let root = settings.storage.root.clone();
        let store = FrameStore::open(&root, settings.frames)?;
        let catalog = Catalog::open(&root)?;
        let progress = ProgressStore::new(Duration::from_secs(settings.progress.heartbeat_secs));
        let hub = Self {
            settings,
            store,
            catalog,
            progress,
            blob_locks: DashMap::new(),
        };
        hub.recover()?;
        Ok(hub)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// Frame, hash and store an uncompressed upload, then register it under
    /// `filename`. `device` defaults to a guess from the name.
    pub fn ingest<R: Read>(
        &self,
        src: R,
        filename: &str,
        device: Option<DeviceKind>,
    ) -> Result<Ingested> {
        let staged = self.store.stage(src)?;
        self.register(staged, filename, device)
    }

    /// Store an upload that is already zstd-compressed, checking it against
    /// `expected` before anything is registered.
    pub fn import_compressed<R: Read>(
        &self,
        src: R,
        expected: &ContentHash,
        filename: &str,
        device: Option<DeviceKind>,
    ) -> Result<Ingested> {
        let staged = self.store.stage_compressed(src, expected)?;
        self.register(staged, filename, device)
    }

    /// Place the blob and record it under the blob lock, so a concurrent
    /// delete can't collect the bytes between dedup and registration.
    fn register(&self, staged: Staged, filename: &str, device: Option<DeviceKind>) -> Result<Ingested> {
        let lock = self.blob_lock(&staged.hash);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let out = self.store.place(staged)?;
        let ratio = (out.compressed_size > 0)
            .then(|| format!("{:.2}", out.original_size as f64 / out.compressed_size as f64));
        let blob = PhysicalBlob {
            hash: out.hash,
            size: out.compressed_size,
            path: out.path.clone(),
            frame_index: out.frame_index.as_ref().map(|i| i.to_value()),
            compression_ratio: ratio,
            created_at: now_unix(),
        };
        let device = device.unwrap_or_else(|| DeviceKind::from_filename(filename));
        let reg = self.catalog.register_upload(
            blob,
            filename,
            out.original_size,
            device,
            self.store.has_output(&out.hash),
        )?;
        Ok(Ingested {
            file: reg.file,
            created: reg.created,
            deduplicated: out.deduplicated,
            compressed_size: out.compressed_size,
        })
    }

    fn blob(&self, hash: &ContentHash) -> Result<PhysicalBlob> {
        self.catalog
            .get_blob(hash)
            .ok_or_else(|| HubError::NotFound(format!("blob {hash}")))
    }

    fn file(&self, id: &str) -> Result<LogicalFile> {
        self.catalog
            .get_file(id)
            .ok_or_else(|| HubError::NotFound(format!("file {id}")))
    }

    /// Re-hash a stored blob and re-frame it in place, recording the new index.
    pub fn verify(&self, hash: &ContentHash) -> Result<VerifyOutcome> {
        let lock = self.blob_lock(hash);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let blob = self.blob(hash)?;
        let path = self.store.read_path(&blob.hash);
        let v = self.store.verify_and_rebuild(&path, hash)?;
        self.catalog
            .update_frame_index(hash, v.frame_index.to_value(), v.size)?;
        Ok(v)
    }

    /// The batches a parallel parse of `hash` would use. Empty when the stored
    /// index would force the single-stream path.
    pub fn plan(&self, hash: &ContentHash) -> Result<Vec<Batch>> {
        let blob = self.blob(hash)?;
        let size = self.store.physical_size(hash)?;
        match validate(blob.frame_index.as_ref(), size) {
            Ok(frames) => Ok(plan_batches(&frames, self.settings.parse.min_batch_frames.max(1))),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Serializes upload, parse, verify and delete of one blob.
    fn blob_lock(&self, hash: &ContentHash) -> Arc<Mutex<()>> {
        self.blob_locks.entry(*hash).or_default().clone()
    }

    /// Decode a blob and write its tables and manifest to
    /// `processed/<hash>/`. The previous output is replaced only on success.
    /// `progress` sees values in `[0, 98]`.
    pub fn parse(
        &self,
        hash: &ContentHash,
        device: DeviceKind,
        ctx: ParseContext,
        progress: &mut dyn FnMut(u8),
    ) -> Result<ParseOutput> {
        let lock = self.blob_lock(hash);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let blob = self.blob(hash)?;
        let blob_path = self.store.read_path(hash);
        let physical_size = self.store.physical_size(hash)?;
        let parsed = Dispatcher::new(self.store.codec(), self.settings.parse).parse(
            &blob_path,
            blob.frame_index.as_ref(),
            physical_size,
            device,
            progress,
        )?;

        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(self.store.processed_root())?;
        let (manifest, packets) = self.materialize(hash, device, ctx, physical_size, &parsed, staging.path(), progress)?;

        let target = self.store.processed_root().join(hash.to_hex());
        swap_into_place(staging.path(), &target)?;
        log_info!(
            component = "hub",
            event = "parse_output_ready",
            hash = %hash,
            dir = %target.display(),
            tables = manifest.keys.0.len(),
            rows = manifest.summary.total_rows
        );
        Ok(ParseOutput {
            dir: target,
            manifest,
            packets,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn materialize(
        &self,
        hash: &ContentHash,
        device: DeviceKind,
        ctx: ParseContext,
        physical_size: u64,
        parsed: &PartialResult,
        dir: &Path,
        progress: &mut dyn FnMut(u8),
    ) -> Result<(Manifest, Vec<Packet>)> {
        let summary = write_tables(parsed, dir)?;
        progress(TABLES_WRITTEN_PROGRESS);

        let seconds = duration_seconds(parsed.channel("base_info"));
        let packets = packets(&parsed.data_types, device);
        let parsed_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| HubError::Format(e.to_string()))?;
        let manifest = Manifest {
            file_hash: hash.to_hex(),
            sensor_file_id: ctx.file_id,
            filename: ctx.filename,
            parsed_at,
            duration: format_duration(seconds),
            duration_seconds: seconds,
            is_ring: device.is_ring(),
            raw_file_size: physical_size,
            raw_file: RawFileRef {
                name: format!("{hash}{RAW_SUFFIX}"),
                compressed_size: physical_size,
            },
            keys: summary.keys,
            summary: summary.summary,
            data_types: parsed.data_types.to_json(),
            labels: parsed.labels.clone(),
            content_meta: ctx.content_meta,
        };
        manifest.write_to(dir)?;
        progress(MANIFEST_WRITTEN_PROGRESS);
        Ok((manifest, packets))
    }

    /// Parse a logical file end to end, recording the outcome in the catalog
    /// and publishing progress. `device` overrides the file's own kind.
    pub fn parse_file(&self, file_id: &str, device: Option<DeviceKind>) -> Result<ParseResult> {
        let file = self.file(file_id)?;
        let device = device.unwrap_or(file.device);
        let mut meta = self
            .catalog
            .get_parse_result(file_id)
            .map(|r| r.content_meta)
            .unwrap_or_default();
        for k in GENERATED_META {
            meta.remove(k);
        }

        self.catalog.upsert_parse_result(
            file_id,
            ParsePatch {
                status: Some(ParseStatus::Processing),
                progress: Some(None),
                device_type_used: Some(device),
                error_message: Some(None),
                ..Default::default()
            },
        )?;
        self.progress.update(file_id, 0, ParseStatus::Processing);
        log_info!(
            component = "hub",
            event = "parse_started",
            file_id,
            hash = %file.hash,
            device = %device
        );

        let mut last = 0u8;
        let mut report = |p: u8| {
            if p > last {
                last = p;
                self.progress.update(file_id, p, ParseStatus::Processing);
            }
        };
        let ctx = ParseContext {
            file_id: Some(file_id.to_string()),
            filename: Some(file.filename.clone()),
            content_meta: meta.clone(),
        };
        let started = std::time::Instant::now();

        match self.parse(&file.hash, device, ctx, &mut report) {
            Ok(out) => {
                let mut merged = meta;
                merged.insert("manifest".into(), serde_json::to_value(&out.manifest)?);
                merged.insert(
                    "parse_summary".into(),
                    serde_json::to_value(out.manifest.parse_summary())?,
                );
                merged.insert("duration_seconds".into(), out.manifest.duration_seconds.into());
                merged.insert("raw_file_size".into(), out.manifest.raw_file_size.into());

                let result = self.catalog.upsert_parse_result(
                    file_id,
                    ParsePatch {
                        status: Some(ParseStatus::Processed),
                        progress: Some(None),
                        duration: Some(out.manifest.duration.clone()),
                        packets: Some(serde_json::to_string(&out.packets)?),
                        content_meta: Some(merged),
                        processed_dir: Some(Some(out.dir.clone())),
                        error_message: Some(None),
                        ..Default::default()
                    },
                )?;
                self.progress.update(file_id, 100, ParseStatus::Processed);
                log_info!(
                    component = "hub",
                    event = "parse_completed",
                    file_id,
                    duration = %result.duration,
                    elapsed_ms = started.elapsed().as_millis() as u64
                );
                Ok(result)
            }
            Err(e) => {
                log_error!(component = "hub", event = "parse_failed", file_id, error = %e);
                self.catalog.upsert_parse_result(
                    file_id,
                    ParsePatch {
                        status: Some(ParseStatus::Error),
                        progress: Some(None),
                        error_message: Some(Some(e.to_string())),
                        ..Default::default()
                    },
                )?;
                self.progress.update(file_id, 0, ParseStatus::Error);
                Err(e)
            }
        }
    }

    /// Drop a logical file. The blob and its processed output go with the
    /// last reference.
    pub fn delete_file(&self, id: &str) -> Result<Deleted> {
        let deleted = self.catalog.delete_file(id)?;
        self.progress.remove(id);
        if let Some(hash) = deleted.orphaned {
            self.collect_blob(&hash)?;
        }
        Ok(deleted)
    }

    /// Remove an orphaned blob from disk unless an upload re-registered it
    /// after the catalog dropped it. Returns whether the bytes were removed.
    fn collect_blob(&self, hash: &ContentHash) -> Result<bool> {
        let lock = self.blob_lock(hash);
        let _held = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let refs = self.catalog.files_by_hash(hash).len();
        if refs > 0 || self.catalog.get_blob(hash).is_some() {
            log_info!(component = "hub", event = "blob_revived", hash = %hash, refs);
            return Ok(false);
        }
        self.store.delete(hash)?;
        log_info!(component = "hub", event = "blob_collected", hash = %hash);
        Ok(true)
    }

    /// Reset parses interrupted by a previous run.
    pub fn recover(&self) -> Result<usize> {
        let n = self.catalog.recover_stale()?;
        if n > 0 {
            log_warn!(component = "hub", event = "stale_parses_reset", count = n);
        }
        Ok(n)
    }

    pub fn subscribe(&self, file_id: &str) -> Subscription<'_> {
        self.progress.subscribe(file_id)
    }
}

/// Replace `target` with `staging`. The old directory is removed only once the
/// new one is in place.
fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
    if !target.exists() {
        fs::rename(staging, target)?;
        return Ok(());
    }
    let retired = target.with_file_name(format!(".retired-{}", uuid::Uuid::new_v4()));
    fs::rename(target, &retired)?;
    if let Err(e) = fs::rename(staging, target) {
        // Put the previous output back.
        if let Err(restore) = fs::rename(&retired, target) {
            log_warn!(
                component = "hub",
                event = "output_restore_failed",
                target = %target.display(),
                retired = %retired.display(),
                swap_error = %e,
                restore_error = %restore
            );
        }
        return Err(e.into());
    }
    fs::remove_dir_all(&retired)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrameConfig, ParseConfig};
    use crate::decode::lines::tests::{acc_v2_line, sensor_line};
    use crate::materialize::manifest::MANIFEST_FILE;

    fn settings(root: &Path) -> Settings {
        let mut s = Settings::default();
        s.storage.root = root.to_path_buf();
        s.frames = FrameConfig {
            min_frame_size: 256,
            max_frame_size: 512,
            level: 3,
        };
        s.parse = ParseConfig {
            min_batch_frames: 2,
            max_workers: 2,
        };
        s
    }

    fn log(n: u32) -> Vec<u8> {
        let mut lines = Vec::new();
        for i in 0..n {
            lines.push(sensor_line("00", 1_700_000_000 + i, &[0u8; 128]));
            lines.push(acc_v2_line(i as u8, 1_700_000_000 + i, 2));
        }
        (lines.join("\n") + "\n").into_bytes()
    }

    #[test]
    fn ingest_then_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let up = hub.ingest(&log(40)[..], "Ring_a.rawdata", None).unwrap();
        assert!(up.created);
        assert_eq!(up.file.device, DeviceKind::Ring);
        assert_eq!(
            hub.catalog().get_parse_result(&up.file.id).unwrap().status,
            ParseStatus::Idle
        );

        let r = hub.parse_file(&up.file.id, Some(DeviceKind::Watch)).unwrap();
        assert_eq!(r.status, ParseStatus::Processed);
        assert_eq!(r.duration, "39s");
        assert_eq!(r.device_type_used, Some(DeviceKind::Watch));
        assert_eq!(r.content_meta["duration_seconds"], 39);
        assert_eq!(r.content_meta["parse_summary"]["keys"]["base_info"]["rows"], 40);
        let dir = r.processed_dir.unwrap();
        assert!(dir.join(MANIFEST_FILE).is_file());
        assert!(dir.join("acc.parquet").is_file());

        let packets: Vec<Value> = serde_json::from_str(&r.packets).unwrap();
        assert_eq!(packets[0]["type"], "00");
        assert_eq!(packets[1]["type"], "18");
        assert_eq!(
            hub.progress().get(&up.file.id).map(|s| (s.progress, s.status)),
            Some((100, ParseStatus::Processed))
        );
    }

    #[test]
    fn reparse_keeps_user_meta_and_replaces_output() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let up = hub.ingest(&log(10)[..], "a.rawdata", None).unwrap();
        hub.parse_file(&up.file.id, None).unwrap();

        let mut meta = hub.catalog().get_parse_result(&up.file.id).unwrap().content_meta;
        meta.insert("tester".into(), "李四".into());
        hub.catalog()
            .upsert_parse_result(
                &up.file.id,
                ParsePatch {
                    content_meta: Some(meta),
                    ..Default::default()
                },
            )
            .unwrap();

        let r = hub.parse_file(&up.file.id, None).unwrap();
        assert_eq!(r.content_meta["tester"], "李四");
        assert_eq!(r.content_meta["manifest"]["content_meta"]["tester"], "李四");
        assert!(r.content_meta["manifest"]["content_meta"].get("manifest").is_none());

        let leftovers: Vec<_> = fs::read_dir(hub.store().processed_root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec![up.file.hash.to_hex()]);
    }

    #[test]
    fn failed_parse_records_error_and_keeps_meta() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let up = hub.ingest(&log(10)[..], "a.rawdata", None).unwrap();
        hub.catalog()
            .upsert_parse_result(
                &up.file.id,
                ParsePatch {
                    content_meta: Some(Map::from_iter([("tester".to_string(), Value::from("x"))])),
                    ..Default::default()
                },
            )
            .unwrap();
        fs::write(hub.store().read_path(&up.file.hash), b"not zstd").unwrap();

        assert!(hub.parse_file(&up.file.id, None).is_err());
        let r = hub.catalog().get_parse_result(&up.file.id).unwrap();
        assert_eq!(r.status, ParseStatus::Error);
        assert!(r.error_message.is_some());
        assert_eq!(r.content_meta["tester"], "x");
        assert_eq!(
            hub.progress().get(&up.file.id).map(|s| s.status),
            Some(ParseStatus::Error)
        );
        assert!(!hub.store().has_output(&up.file.hash));
    }

    #[test]
    fn second_upload_sees_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let data = log(5);
        let a = hub.ingest(&data[..], "a.rawdata", None).unwrap();
        hub.parse_file(&a.file.id, None).unwrap();

        let again = hub.ingest(&data[..], "a.rawdata", None).unwrap();
        assert!(!again.created);
        assert_eq!(again.file.id, a.file.id);

        let b = hub.ingest(&data[..], "b.rawdata", None).unwrap();
        assert!(b.deduplicated);
        assert_eq!(
            hub.catalog().get_parse_result(&b.file.id).unwrap().status,
            ParseStatus::Processed
        );
    }

    #[test]
    fn delete_collects_blob_with_last_reference() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let data = log(5);
        let a = hub.ingest(&data[..], "a.rawdata", None).unwrap();
        let b = hub.ingest(&data[..], "b.rawdata", None).unwrap();
        hub.parse_file(&a.file.id, None).unwrap();
        let raw = hub.store().read_path(&a.file.hash);

        hub.delete_file(&a.file.id).unwrap();
        assert!(raw.exists());
        hub.delete_file(&b.file.id).unwrap();
        assert!(!raw.exists());
        assert!(!hub.store().has_output(&a.file.hash));
        assert!(hub.catalog().get_blob(&a.file.hash).is_none());
    }

    #[test]
    fn reupload_after_catalog_delete_keeps_blob() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let data = log(5);
        let a = hub.ingest(&data[..], "a.rawdata", None).unwrap();
        let raw = hub.store().read_path(&a.file.hash);

        // The catalog drops the last reference, then the same bytes arrive
        // again before the blob is collected.
        let deleted = hub.catalog().delete_file(&a.file.id).unwrap();
        assert_eq!(deleted.orphaned, Some(a.file.hash));
        let again = hub.ingest(&data[..], "again.rawdata", None).unwrap();
        assert!(again.deduplicated);

        assert!(!hub.collect_blob(&a.file.hash).unwrap());
        assert!(raw.exists());
        assert!(hub.catalog().get_blob(&a.file.hash).is_some());
        hub.parse_file(&again.file.id, None).unwrap();

        hub.delete_file(&again.file.id).unwrap();
        assert!(!raw.exists());
    }

    #[test]
    fn concurrent_ingest_and_delete_never_strand_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let data = log(5);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..40 {
                    hub.ingest(&data[..], &format!("up-{i}.rawdata"), None).unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..40 {
                    for f in hub.catalog().list_files() {
                        // The other thread may not have registered yet, or
                        // the file may already be gone.
                        let _ = hub.delete_file(&f.id);
                    }
                    std::thread::yield_now();
                }
            });
        });

        for f in hub.catalog().list_files() {
            assert!(hub.catalog().get_blob(&f.hash).is_some(), "{} lost its blob record", f.id);
            assert!(hub.store().read_path(&f.hash).exists(), "{} lost its bytes", f.id);
        }
    }

    #[test]
    fn failed_swap_restores_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("manifest.json"), b"{}").unwrap();

        let missing = dir.path().join("never-staged");
        assert!(swap_into_place(&missing, &target).is_err());
        assert!(target.join("manifest.json").exists());
        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().file_name().to_string_lossy().starts_with(".retired-"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn verify_refreshes_frame_index() {
        let dir = tempfile::tempdir().unwrap();
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        let up = hub.ingest(&log(30)[..], "a.rawdata", None).unwrap();
        hub.catalog()
            .update_frame_index(&up.file.hash, Value::Null, 0)
            .unwrap();
        assert!(hub.plan(&up.file.hash).unwrap().is_empty());

        let v = hub.verify(&up.file.hash).unwrap();
        assert!(v.valid);
        assert!(!hub.plan(&up.file.hash).unwrap().is_empty());
    }

    #[test]
    fn open_resets_interrupted_parse() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let hub = SensorHub::open(settings(dir.path())).unwrap();
            let up = hub.ingest(&log(3)[..], "a.rawdata", None).unwrap();
            hub.catalog()
                .upsert_parse_result(
                    &up.file.id,
                    ParsePatch {
                        status: Some(ParseStatus::Processing),
                        ..Default::default()
                    },
                )
                .unwrap();
            up.file.id
        };
        let hub = SensorHub::open(settings(dir.path())).unwrap();
        assert_eq!(
            hub.catalog().get_parse_result(&id).unwrap().status,
            ParseStatus::Idle
        );
    }
}
