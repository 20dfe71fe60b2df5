//! Background device-log downloads feeding [`SensorHub::ingest`].
//!
//! A fixed pool of worker threads takes jobs off one queue. Every task shares a
//! single cancellation flag that is checked before each chunk read, so a stop
//! request lets the in-flight chunk finish and then abandons the upload.

use std::collections::BTreeMap;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use dashmap::DashMap;
use serde::Serialize;

use crate::config::DownloadConfig;
use crate::error::{HubError, Result};
use crate::hub::SensorHub;
use crate::observability::{log_error, log_info, log_warn};

/// Where downloads come from.
pub trait Source: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>>;
}

/// Plain HTTP(S) GET.
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Source for HttpSource {
    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        let resp = self.client.get(url).send()?.error_for_status()?;
        Ok(Box::new(resp))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Queued,
    Processing,
    Cancelled,
    Success,
    Failed,
}

/// Reads at most `chunk` bytes at a time and fails once `cancel` is set.
struct CancelReader<'a, R> {
    inner: R,
    cancel: &'a AtomicBool,
    chunk: usize,
}

impl<R: Read> Read for CancelReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.load(Ordering::Relaxed) {
            // Not `Interrupted`: io::copy would retry that.
            return Err(io::Error::other("download cancelled"));
        }
        let n = buf.len().min(self.chunk);
        self.inner.read(&mut buf[..n])
    }
}

struct Job {
    url: String,
    filename: String,
}

struct Shared {
    hub: Arc<SensorHub>,
    source: Arc<dyn Source>,
    cancel: AtomicBool,
    tasks: DashMap<String, TaskState>,
    chunk_size: usize,
}

impl Shared {
    fn set(&self, filename: &str, state: TaskState) {
        self.tasks.insert(filename.to_string(), state);
    }

    fn run(&self, job: Job) {
        if self.cancel.load(Ordering::Relaxed) {
            self.set(&job.filename, TaskState::Cancelled);
            return;
        }
        self.set(&job.filename, TaskState::Processing);
        log_info!(component = "download", event = "started", filename = %job.filename, url = %job.url);

        let res = self.source.open(&job.url).and_then(|body| {
            let reader = CancelReader {
                inner: body,
                cancel: &self.cancel,
                chunk: self.chunk_size.max(1),
            };
            self.hub.ingest(reader, &job.filename, None)
        });
        match res {
            Ok(ing) => {
                self.set(&job.filename, TaskState::Success);
                log_info!(
                    component = "download",
                    event = "registered",
                    filename = %job.filename,
                    id = %ing.file.id,
                    deduplicated = ing.deduplicated
                );
            }
            Err(_) if self.cancel.load(Ordering::Relaxed) => {
                self.set(&job.filename, TaskState::Cancelled);
                log_warn!(component = "download", event = "cancelled", filename = %job.filename);
            }
            Err(e) => {
                self.set(&job.filename, TaskState::Failed);
                log_error!(component = "download", event = "failed", filename = %job.filename, error = %e);
            }
        }
    }
}

pub struct DownloadManager {
    shared: Arc<Shared>,
    queue: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl DownloadManager {
    /// HTTP downloads with the pool size and timeout from `cfg`.
    pub fn new(hub: Arc<SensorHub>, cfg: DownloadConfig) -> Result<Self> {
        let source = HttpSource::new(Duration::from_secs(cfg.timeout_secs))?;
        Self::with_source(hub, Arc::new(source), cfg)
    }

    pub fn with_source(hub: Arc<SensorHub>, source: Arc<dyn Source>, cfg: DownloadConfig) -> Result<Self> {
        let shared = Arc::new(Shared {
            hub,
            source,
            cancel: AtomicBool::new(false),
            tasks: DashMap::new(),
            chunk_size: cfg.chunk_size,
        });
        let (tx, rx) = channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(cfg.workers.max(1));
        for i in 0..cfg.workers.max(1) {
            let rx = rx.clone();
            let shared = Arc::clone(&shared);
            let handle = std::thread::Builder::new()
                .name(format!("sensorhub-download-{i}"))
                .spawn(move || {
                    for job in rx.iter() {
                        shared.run(job);
                    }
                })
                .map_err(|e| HubError::Pool(e.to_string()))?;
            workers.push(handle);
        }
        Ok(Self {
            shared,
            queue: Some(tx),
            workers,
        })
    }

    /// Queue a download. A later call with the same filename overwrites its
    /// state entry.
    pub fn start_download(&self, url: &str, filename: &str) -> Result<()> {
        let queue = self
            .queue
            .as_ref()
            .ok_or_else(|| HubError::Download("download manager is shut down".into()))?;
        self.shared.set(filename, TaskState::Queued);
        queue
            .send(Job {
                url: url.to_string(),
                filename: filename.to_string(),
            })
            .map_err(|e| HubError::Download(e.to_string()))
    }

    pub fn stop_all(&self) {
        log_info!(component = "download", event = "stop_all", tasks = self.shared.tasks.len());
        self.shared.cancel.store(true, Ordering::Relaxed);
    }

    /// Clear the cancel flag and forget every task.
    pub fn reset(&self) {
        self.shared.cancel.store(false, Ordering::Relaxed);
        self.shared.tasks.clear();
    }

    /// Clear the cancel flag, keeping task history.
    pub fn reset_cancel(&self) {
        self.shared.cancel.store(false, Ordering::Relaxed);
    }

    pub fn tasks(&self) -> BTreeMap<String, TaskState> {
        self.shared
            .tasks
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    /// Close the queue and wait for every queued task to finish.
    pub fn join(mut self) -> BTreeMap<String, TaskState> {
        self.shutdown();
        self.tasks()
    }

    fn shutdown(&mut self) {
        self.queue = None;
        for w in self.workers.drain(..) {
            if w.join().is_err() {
                log_error!(component = "download", event = "worker_panicked");
            }
        }
    }
}

impl Drop for DownloadManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crossbeam::channel::Receiver;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Instant;

    struct MemSource(HashMap<String, Vec<u8>>);

    impl Source for MemSource {
        fn open(&self, url: &str) -> Result<Box<dyn Read + Send>> {
            let body = self
                .0
                .get(url)
                .cloned()
                .ok_or_else(|| HubError::NotFound(url.to_string()))?;
            Ok(Box::new(io::Cursor::new(body)))
        }
    }

    /// Hands out one reader that blocks until the test feeds it.
    struct GatedSource(Mutex<Option<Receiver<Vec<u8>>>>);

    struct GatedReader {
        rx: Receiver<Vec<u8>>,
        pending: io::Cursor<Vec<u8>>,
    }

    impl Read for GatedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            loop {
                let n = self.pending.read(buf)?;
                if n > 0 {
                    return Ok(n);
                }
                match self.rx.recv() {
                    Ok(next) => self.pending = io::Cursor::new(next),
                    Err(_) => return Ok(0),
                }
            }
        }
    }

    impl Source for GatedSource {
        fn open(&self, _url: &str) -> Result<Box<dyn Read + Send>> {
            let rx = self
                .0
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| HubError::Download("already opened".into()))?;
            Ok(Box::new(GatedReader {
                rx,
                pending: io::Cursor::new(Vec::new()),
            }))
        }
    }

    fn hub(root: &std::path::Path) -> Arc<SensorHub> {
        let mut s = Settings::default();
        s.storage.root = root.to_path_buf();
        Arc::new(SensorHub::open(s).unwrap())
    }

    fn cfg() -> DownloadConfig {
        DownloadConfig {
            workers: 2,
            chunk_size: 16,
            timeout_secs: 5,
        }
    }

    fn wait_for(m: &DownloadManager, name: &str, state: TaskState) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while m.tasks().get(name) != Some(&state) {
            assert!(Instant::now() < deadline, "{name} never reached {state:?}");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn downloads_are_registered() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(dir.path());
        let src = MemSource(HashMap::from([
            ("mem://a".to_string(), b"line one\nline two\n".to_vec()),
            ("mem://b".to_string(), b"other\n".to_vec()),
        ]));
        let m = DownloadManager::with_source(Arc::clone(&hub), Arc::new(src), cfg()).unwrap();
        m.start_download("mem://a", "Ring_a.rawdata").unwrap();
        m.start_download("mem://b", "b.rawdata").unwrap();
        m.start_download("mem://missing", "c.rawdata").unwrap();

        let tasks = m.join();
        assert_eq!(tasks["Ring_a.rawdata"], TaskState::Success);
        assert_eq!(tasks["b.rawdata"], TaskState::Success);
        assert_eq!(tasks["c.rawdata"], TaskState::Failed);

        let files = hub.catalog().list_files();
        assert_eq!(files.len(), 2);
        let ring = files.iter().find(|f| f.filename == "Ring_a.rawdata").unwrap();
        assert!(ring.device.is_ring());
        assert_eq!(ring.file_size_bytes, 18);
    }

    #[test]
    fn stop_before_start_cancels_queued_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(dir.path());
        let src = MemSource(HashMap::from([("mem://a".to_string(), b"x\n".to_vec())]));
        let m = DownloadManager::with_source(Arc::clone(&hub), Arc::new(src), cfg()).unwrap();
        m.stop_all();
        m.start_download("mem://a", "a.rawdata").unwrap();
        wait_for(&m, "a.rawdata", TaskState::Cancelled);
        assert!(hub.catalog().list_files().is_empty());

        m.reset_cancel();
        m.start_download("mem://a", "a.rawdata").unwrap();
        wait_for(&m, "a.rawdata", TaskState::Success);

        m.reset();
        assert!(m.tasks().is_empty());
    }

    #[test]
    fn cancel_mid_stream_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let hub = hub(dir.path());
        let (tx, rx) = channel::unbounded();
        let src = GatedSource(Mutex::new(Some(rx)));
        let m = DownloadManager::with_source(Arc::clone(&hub), Arc::new(src), cfg()).unwrap();

        m.start_download("gate://", "slow.rawdata").unwrap();
        wait_for(&m, "slow.rawdata", TaskState::Processing);
        m.stop_all();
        tx.send(b"partial line\n".to_vec()).unwrap();
        wait_for(&m, "slow.rawdata", TaskState::Cancelled);
        drop(tx);

        assert!(hub.catalog().list_files().is_empty());
        let raw: Vec<_> = std::fs::read_dir(hub.store().raw_dir()).unwrap().collect();
        assert!(raw.is_empty(), "temp output must be discarded");
    }
}
