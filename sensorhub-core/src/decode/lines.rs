//! Text line grammar of a device log.
//!
//! Sensor lines look like
//! `2024-05-01 10:00:00.123,<label>,<reserved>,52,<type>,<_>,<t0>,<t1>,<t2>,<t3>,<payload hex>...`
//! and annotation lines are JSON objects carrying `label` and `timestamp`.
//! Anything else is skipped.

use super::DecodeContext;
use super::merge::{Pending, merge_consecutive};
use super::record::Record;
use super::registry::{CHANNELS, DataType, Dispatch, MergeStrategy};
use crate::domain::DeviceKind;
use serde_json::Value;

const SENSOR_PREFIX: &str = "202";
const SENSOR_MARKER: &str = "52";
const MIN_FIELDS: usize = 11;
const V2_FIELDS: usize = 243;

/// Packet counts per raw type code, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTally {
    entries: Vec<(String, u64)>,
}

impl TypeTally {
    pub fn add(&mut self, code: &str, n: u64) {
        match self.entries.iter_mut().find(|(c, _)| c == code) {
            Some((_, count)) => *count += n,
            None => self.entries.push((code.to_owned(), n)),
        }
    }

    pub fn get(&self, code: &str) -> Option<u64> {
        self.entries.iter().find(|(c, _)| c == code).map(|(_, n)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(c, n)| (c.as_str(), *n))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn extend(&mut self, other: &TypeTally) {
        for (code, n) in other.iter() {
            self.add(code, n);
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(c, n)| (c.clone(), Value::from(*n)))
                .collect(),
        )
    }
}

/// Decoded output of one slice of lines.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult {
    /// Records per channel, indexed like [`CHANNELS`].
    pub channels: Vec<Vec<Record>>,
    pub labels: Vec<Value>,
    pub data_types: TypeTally,
    /// Header timestamp of the last sensor line seen.
    pub last_unix_timestamp: Option<i64>,
    /// Labels that arrived before any sensor line. A batch cannot know their
    /// timestamp; the merge fills it in from the batch before.
    pub leading_labels: usize,
}

impl Default for PartialResult {
    fn default() -> Self {
        Self {
            channels: vec![Vec::new(); CHANNELS.len()],
            labels: Vec::new(),
            data_types: TypeTally::default(),
            last_unix_timestamp: None,
            leading_labels: 0,
        }
    }
}

impl PartialResult {
    pub fn channel(&self, key: &str) -> &[Record] {
        CHANNELS
            .iter()
            .position(|ch| ch.key == key)
            .and_then(|i| self.channels.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.channels.iter().map(Vec::len).sum()
    }

    /// Concatenate batch results in order, then recombine fragments that
    /// crossed batch boundaries.
    pub fn merge_partials(parts: impl IntoIterator<Item = PartialResult>) -> PartialResult {
        let mut merged = PartialResult::default();
        for mut part in parts {
            for (dst, src) in merged.channels.iter_mut().zip(part.channels) {
                dst.extend(src);
            }
            match merged.last_unix_timestamp {
                Some(ts) => {
                    for label in part.labels.iter_mut().take(part.leading_labels) {
                        if let Value::Object(obj) = label {
                            obj.insert("unix_timestamp".into(), Value::from(ts));
                        }
                    }
                }
                None => merged.leading_labels += part.leading_labels,
            }
            merged.labels.extend(part.labels);
            merged.data_types.extend(&part.data_types);
            merged.last_unix_timestamp = part.last_unix_timestamp.or(merged.last_unix_timestamp);
        }
        for (ch, items) in CHANNELS.iter().zip(merged.channels.iter_mut()) {
            if ch.merge != MergeStrategy::None {
                *items = merge_consecutive(std::mem::take(items));
            }
        }
        merged
    }
}

/// Streaming line decoder. With `merge_inline` fragments are recombined as
/// they arrive; otherwise the caller merges after concatenating batches.
pub struct LineDecoder {
    dispatch: Dispatch,
    merge_inline: bool,
    pending: Vec<Pending>,
    out: PartialResult,
}

impl LineDecoder {
    pub fn new(device: DeviceKind, merge_inline: bool) -> Self {
        Self {
            dispatch: Dispatch::new(device),
            merge_inline,
            pending: (0..CHANNELS.len()).map(|_| Pending::default()).collect(),
            out: PartialResult::default(),
        }
    }

    pub fn feed(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        if line.starts_with(SENSOR_PREFIX) {
            self.sensor_line(line);
        } else if line.starts_with('{') && line.ends_with('}') {
            self.annotation_line(line);
        }
    }

    pub fn finish(mut self) -> PartialResult {
        for (pending, items) in self.pending.iter_mut().zip(self.out.channels.iter_mut()) {
            pending.flush(items);
        }
        self.out
    }

    fn sensor_line(&mut self, line: &str) {
        let joined = line.replace(", ", ",");
        let fields: Vec<&str> = joined.split(',').collect();
        if fields.len() < MIN_FIELDS || fields[3] != SENSOR_MARKER {
            return;
        }
        let Some((unix_timestamp, label_hr, payload)) = header_and_payload(&fields) else {
            return;
        };
        self.out.last_unix_timestamp = Some(unix_timestamp);

        let type_code = fields[4].to_uppercase();
        self.out.data_types.add(&type_code, 1);
        let Some(slot) = DataType::from_hex(&type_code).and_then(|t| self.dispatch.slot(t)) else {
            return;
        };

        let ch = &CHANNELS[slot];
        let ctx = DecodeContext {
            timestamp: fields[0],
            unix_timestamp,
            label_hr,
            v2: ch.v2 && fields.len() == V2_FIELDS,
            offset: ch.offset,
        };
        let record = (ch.decode)(&payload, &ctx);

        let items = &mut self.out.channels[slot];
        if self.merge_inline && ch.merge != MergeStrategy::None {
            self.pending[slot].push(record, items);
        } else {
            items.push(record);
        }
    }

    fn annotation_line(&mut self, line: &str) {
        let Ok(Value::Object(mut obj)) = serde_json::from_str::<Value>(line) else {
            return;
        };
        if obj.contains_key("label") && obj.contains_key("timestamp") {
            let ts = match self.out.last_unix_timestamp {
                Some(ts) => ts,
                None => {
                    self.out.leading_labels += 1;
                    0
                }
            };
            obj.insert("unix_timestamp".into(), Value::from(ts));
            self.out.labels.push(Value::Object(obj));
        }
    }
}

/// Big-endian unix time from fields 6..10, label from field 2, payload from 10...
fn header_and_payload(fields: &[&str]) -> Option<(i64, i64, Vec<u8>)> {
    let ts_hex: String = fields[6..10].concat();
    let unix_timestamp = i64::from_str_radix(ts_hex.trim(), 16).ok()?;
    let label_hr = i64::from_str_radix(fields[2].trim(), 16).ok()?;
    let payload_hex: String = fields[10..]
        .iter()
        .flat_map(|f| f.chars())
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let payload = hex::decode(payload_hex).ok()?;
    Some((unix_timestamp, label_hr, payload))
}

/// Decode a whole slice of lines.
pub fn parse_lines<I, S>(lines: I, device: DeviceKind, merge_inline: bool) -> PartialResult
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut dec = LineDecoder::new(device, merge_inline);
    for line in lines {
        dec.feed(line.as_ref());
    }
    dec.finish()
}
