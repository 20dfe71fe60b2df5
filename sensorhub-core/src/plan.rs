//! Frame index validation and batch planning.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::frame::Frame;

/// A contiguous run of frames decoded by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: usize,
    pub start_frame_idx: usize,
    pub end_frame_idx: usize,
    pub compressed_bytes: u64,
    pub frames: Vec<Frame>,
}

/// Why an index can't drive a parallel parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIndex(pub String);

impl std::fmt::Display for InvalidIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn invalid<T>(reason: impl Into<String>) -> Result<T, InvalidIndex> {
    Err(InvalidIndex(reason.into()))
}

/// Check a stored frame index and return its frames.
///
/// The index is taken as untyped JSON because catalog entries may predate the
/// current format. Every frame must end within `physical_size`.
pub fn validate(index: Option<&Value>, physical_size: u64) -> Result<Vec<Frame>, InvalidIndex> {
    let Some(index) = index else {
        return invalid("frame_index is None");
    };
    let Some(obj) = index.as_object() else {
        return invalid("frame_index is not dict");
    };
    let frames = match obj.get("frames").and_then(Value::as_array) {
        Some(f) if !f.is_empty() => f,
        _ => return invalid("frames is empty or invalid"),
    };

    let mut out: Vec<Frame> = Vec::with_capacity(frames.len());
    let mut prev_end = 0u64;
    for (idx, raw) in frames.iter().enumerate() {
        let Some(fobj) = raw.as_object() else {
            return invalid(format!("frame[{idx}] is not dict"));
        };
        let mut nums = [0u64; 3];
        for (slot, key) in ["cs", "cl", "dl"].iter().enumerate() {
            let v = fobj.get(*key);
            match v {
                Some(Value::Number(n)) if n.is_u64() => nums[slot] = n.as_u64().unwrap_or(0),
                Some(Value::Number(n)) if n.is_i64() => {
                    return invalid(format!("frame[{idx}].{key} < 0"));
                }
                _ => return invalid(format!("frame[{idx}].{key} is not int")),
            }
        }
        let [cs, cl, dl] = nums;
        if idx == 0 && cs != 0 {
            return invalid("first frame cs != 0");
        }
        if idx > 0 && cs != prev_end {
            return invalid(format!("frame[{idx}] cs is not contiguous"));
        }
        prev_end = match cs.checked_add(cl) {
            Some(end) if end <= physical_size => end,
            Some(_) => return invalid("frame compressed range exceeds file size"),
            None => return invalid(format!("frame[{idx}] compressed range overflows")),
        };

        let ds = match fobj.get("ds").and_then(Value::as_u64) {
            Some(ds) => ds,
            None => match out.last() {
                Some(f) => match f.ds.checked_add(f.dl) {
                    Some(ds) => ds,
                    None => return invalid(format!("frame[{idx}] plain offset overflows")),
                },
                None => 0,
            },
        };
        let nl = fobj.get("nl").and_then(Value::as_bool).unwrap_or(false);
        out.push(Frame { cs, cl, ds, dl, nl });
    }

    Ok(out)
}

/// Group frames into batches. A batch closes once it holds `min_frames` and its
/// last frame ends on a newline; whatever is left becomes the final batch.
pub fn plan_batches(frames: &[Frame], min_frames: usize) -> Vec<Batch> {
    let mut batches = Vec::new();
    let mut start = 0usize;

    let push = |batches: &mut Vec<Batch>, start: usize, end: usize| {
        let run = &frames[start..=end];
        batches.push(Batch {
            batch_id: batches.len(),
            start_frame_idx: start,
            end_frame_idx: end,
            compressed_bytes: run.iter().map(|f| f.cl).sum(),
            frames: run.to_vec(),
        });
    };

    for (idx, frame) in frames.iter().enumerate() {
        if idx + 1 - start >= min_frames && frame.nl {
            push(&mut batches, start, idx);
            start = idx + 1;
        }
    }
    if start < frames.len() {
        push(&mut batches, start, frames.len() - 1);
    }
    batches
}
