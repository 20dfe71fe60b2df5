//! Fan a stored log out over a bounded decode pool.
//!
//! With a usable frame index the blob is cut into newline-safe batches and
//! each batch is decoded independently. Otherwise the whole blob is streamed
//! through one decoder.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::channel;
use serde_json::Value;

use crate::codec::Compressor;
use crate::config::ParseConfig;
use crate::decode::{LineDecoder, PartialResult, parse_lines};
use crate::domain::DeviceKind;
use crate::error::{HubError, Result};
use crate::observability::{log_error, log_info, log_warn};
use crate::plan::{Batch, plan_batches, validate};
use crate::progress::map_parallel_progress;
use crate::store::frame::Frame;
use crate::store::reader::{BlobLines, read_frames, split_lines};

/// Progress reserved for decoding; the rest belongs to materialization.
pub const DECODE_PROGRESS_MAX: u8 = 90;
const SINGLE_START_PROGRESS: u8 = 10;

/// Everything a worker needs, owned.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub blob_path: PathBuf,
    pub batch: Batch,
    pub device: DeviceKind,
}

impl BatchJob {
    /// Read, decompress and decode one batch without merging fragments.
    pub fn run(&self, codec: &dyn Compressor) -> Result<PartialResult> {
        let plain = read_frames(&self.blob_path, &self.batch.frames, codec).map_err(|e| {
            HubError::Batch {
                batch_id: self.batch.batch_id,
                first_frame: self.batch.start_frame_idx + 1,
                last_frame: self.batch.end_frame_idx + 1,
                source: Box::new(e),
            }
        })?;
        Ok(parse_lines(split_lines(&plain), self.device, false))
    }
}

pub struct Dispatcher<'c> {
    codec: &'c dyn Compressor,
    cfg: ParseConfig,
}

impl<'c> Dispatcher<'c> {
    pub fn new(codec: &'c dyn Compressor, cfg: ParseConfig) -> Self {
        Self { codec, cfg }
    }

    /// Decode a blob, in parallel when `frame_index` validates.
    /// `progress` receives values in `[0, 90]`.
    pub fn parse(
        &self,
        blob_path: &Path,
        frame_index: Option<&Value>,
        physical_size: u64,
        device: DeviceKind,
        progress: &mut dyn FnMut(u8),
    ) -> Result<PartialResult> {
        match validate(frame_index, physical_size) {
            Ok(frames) => self.parse_parallel(blob_path, &frames, device, progress),
            Err(reason) => {
                log_warn!(
                    component = "dispatch",
                    event = "single_fallback",
                    path = %blob_path.display(),
                    size = physical_size,
                    reason = %reason
                );
                self.parse_single(blob_path, device, progress)
            }
        }
    }

    /// One streaming decompressor, fragments merged as they arrive.
    pub fn parse_single(
        &self,
        blob_path: &Path,
        device: DeviceKind,
        progress: &mut dyn FnMut(u8),
    ) -> Result<PartialResult> {
        progress(SINGLE_START_PROGRESS);
        let mut dec = LineDecoder::new(device, true);
        for line in BlobLines::open(blob_path, self.codec)? {
            dec.feed(&line?);
        }
        let out = dec.finish();
        progress(DECODE_PROGRESS_MAX);
        log_info!(
            component = "dispatch",
            event = "single_done",
            records = out.record_count(),
            labels = out.labels.len()
        );
        Ok(out)
    }

    pub fn parse_parallel(
        &self,
        blob_path: &Path,
        frames: &[Frame],
        device: DeviceKind,
        progress: &mut dyn FnMut(u8),
    ) -> Result<PartialResult> {
        let batches = plan_batches(frames, self.cfg.min_batch_frames.max(1));
        let total = batches.len();
        if total == 0 {
            return Err(HubError::Format("no batches generated from frame index".into()));
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let workers = self.cfg.max_workers.max(1).min(cpus).min(total);
        log_info!(
            component = "dispatch",
            event = "parallel_start",
            frames = frames.len(),
            batches = total,
            workers,
            min_batch_frames = self.cfg.min_batch_frames
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("sensorhub-decode-{i}"))
            .build()?;
        let cancelled = AtomicBool::new(false);
        let (tx, rx) = channel::unbounded::<(usize, Result<PartialResult>)>();

        let mut slots: Vec<Option<PartialResult>> = vec![None; total];
        let codec = self.codec;
        let outcome = pool.in_place_scope(|s| -> Result<()> {
            for batch in batches {
                let job = BatchJob {
                    blob_path: blob_path.to_path_buf(),
                    batch,
                    device,
                };
                let tx = tx.clone();
                let cancelled = &cancelled;
                s.spawn(move |_| {
                    if cancelled.load(Ordering::Relaxed) {
                        return;
                    }
                    let _ = tx.send((job.batch.batch_id, job.run(codec)));
                });
            }
            drop(tx);

            let mut done = 0usize;
            for (batch_id, res) in rx.iter() {
                match res {
                    Ok(part) => {
                        if let Some(slot) = slots.get_mut(batch_id) {
                            *slot = Some(part);
                        }
                        done += 1;
                        let pct = map_parallel_progress(done, total, 0, DECODE_PROGRESS_MAX);
                        log_info!(
                            component = "dispatch",
                            event = "batch_done",
                            batch = batch_id + 1,
                            total,
                            progress = pct
                        );
                        progress(pct);
                    }
                    Err(e) => {
                        cancelled.store(true, Ordering::Relaxed);
                        log_error!(component = "dispatch", event = "batch_failed", error = %e);
                        return Err(e);
                    }
                }
            }
            Ok(())
        });
        outcome?;

        let mut ordered = Vec::with_capacity(total);
        for (batch_id, slot) in slots.into_iter().enumerate() {
            ordered.push(slot.ok_or(HubError::MissingBatch(batch_id))?);
        }
        progress(DECODE_PROGRESS_MAX);
        Ok(PartialResult::merge_partials(ordered))
    }
}
