//! In-memory parse progress with blocking subscribers.
//!
//! Nothing here survives a restart; the catalog holds the durable status.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

use crate::domain::ParseStatus;
use crate::observability::log_debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressState {
    pub progress: u8,
    pub status: ParseStatus,
    /// Seconds since the epoch, fractional.
    pub updated_at: f64,
}

/// What a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    #[serde(flatten)]
    pub state: ProgressState,
    /// Emitted because the wait timed out rather than on an update.
    pub heartbeat: bool,
}

#[derive(Default)]
struct SlotInner {
    state: Option<ProgressState>,
    seq: u64,
}

#[derive(Default)]
struct Slot {
    inner: Mutex<SlotInner>,
    changed: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct ProgressStore {
    slots: DashMap<String, Arc<Slot>>,
    heartbeat: Duration,
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ProgressStore {
    pub fn new(heartbeat: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            heartbeat,
        }
    }

    fn slot(&self, file_id: &str) -> Arc<Slot> {
        self.slots
            .entry(file_id.to_owned())
            .or_default()
            .value()
            .clone()
    }

    /// Record the latest state and wake every subscriber of `file_id`.
    pub fn update(&self, file_id: &str, progress: u8, status: ParseStatus) {
        let slot = self.slot(file_id);
        {
            let mut g = slot.lock();
            g.state = Some(ProgressState {
                progress,
                status,
                updated_at: now_secs(),
            });
            g.seq += 1;
        }
        slot.changed.notify_all();
        log_debug!(component = "progress", event = "updated", file_id, progress, status = %status);
    }

    pub fn get(&self, file_id: &str) -> Option<ProgressState> {
        self.slots.get(file_id).and_then(|s| s.lock().state)
    }

    pub fn remove(&self, file_id: &str) {
        if let Some(slot) = self.slots.get(file_id).map(|s| s.value().clone()) {
            slot.lock().state = None;
        }
        // Keep the slot while someone still waits on it.
        self.slots
            .remove_if(file_id, |_, s| Arc::strong_count(s) == 1);
    }

    /// Blocking stream of states for `file_id`.
    ///
    /// Yields the current state first, then one state per update or per
    /// heartbeat interval. Ends after a terminal state (removing it) or once
    /// no state is left.
    pub fn subscribe(&self, file_id: &str) -> Subscription<'_> {
        let slot = self.slot(file_id);
        let seen = slot.lock().seq;
        Subscription {
            store: self,
            file_id: file_id.to_owned(),
            slot: Some(slot),
            seen,
            started: false,
        }
    }
}

pub struct Subscription<'a> {
    store: &'a ProgressStore,
    file_id: String,
    slot: Option<Arc<Slot>>,
    seen: u64,
    started: bool,
}

impl Subscription<'_> {
    fn finish(&mut self, terminal: bool) {
        self.slot = None;
        if terminal {
            self.store.remove(&self.file_id);
        } else {
            self.store
                .slots
                .remove_if(&self.file_id, |_, s| Arc::strong_count(s) == 1 && s.lock().state.is_none());
        }
    }
}

impl Iterator for Subscription<'_> {
    type Item = ProgressEvent;

    fn next(&mut self) -> Option<ProgressEvent> {
        let slot = self.slot.clone()?;

        if !self.started {
            self.started = true;
            let current = slot.lock().state;
            if let Some(state) = current {
                drop(slot);
                if state.status.is_terminal() {
                    self.finish(true);
                }
                return Some(ProgressEvent {
                    state,
                    heartbeat: false,
                });
            }
        }

        let seen = self.seen;
        let (state, timed_out) = {
            let g = slot.lock();
            let (g, res) = slot
                .changed
                .wait_timeout_while(g, self.store.heartbeat, |i| i.seq == seen)
                .unwrap_or_else(PoisonError::into_inner);
            self.seen = g.seq;
            (g.state, res.timed_out())
        };
        drop(slot);

        match state {
            Some(state) => {
                if state.status.is_terminal() {
                    self.finish(true);
                }
                Some(ProgressEvent {
                    state,
                    heartbeat: timed_out,
                })
            }
            None => {
                self.finish(false);
                None
            }
        }
    }
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        if self.slot.is_some() {
            self.finish(false);
        }
    }
}

/// Linear map of `done/total` onto `[min, max]`, truncating.
pub fn map_parallel_progress(done: usize, total: usize, min: u8, max: u8) -> u8 {
    if total == 0 || max <= min {
        return min;
    }
    let done = done.min(total);
    let span = (max - min) as usize;
    min + (span * done / total) as u8
}

fn now_secs() -> f64 {
    time::OffsetDateTime::now_utc().unix_timestamp_nanos() as f64 / 1e9
}
