//! Decoded records to per-channel parquet tables.

pub mod manifest;
pub mod ppg;
pub mod table;

use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::decode::{CHANNELS, Channel, PartialResult, Record};
use crate::error::Result;
use crate::observability::{log_error, log_info};
use table::Table;

pub const PARQUET_EXT: &str = "parquet";

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub file: String,
    pub size_kb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct Totals {
    pub total_rows: usize,
    pub size_kb: f64,
}

/// Written tables keyed by parquet stem, in channel order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableKeys(pub Vec<(String, TableSummary)>);

impl Serialize for TableKeys {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut m = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            m.serialize_entry(k, v)?;
        }
        m.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct ParseSummary {
    pub keys: TableKeys,
    pub summary: Totals,
}

impl ParseSummary {
    pub fn get(&self, key: &str) -> Option<&TableSummary> {
        self.keys.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Shape one channel's records into its output table.
pub fn build_table(ch: &Channel, records: &[Record]) -> Table {
    let mut t = Table::from_records(records);
    if ch.ts_ms {
        t.add_timestamp_ms();
    }
    if let Some((from, to)) = ch.rename {
        t.rename(from, to);
    }
    if ch.ppg_channel_num >= 0 {
        ppg::deinterleave(&mut t, ch.ppg_channel_num);
    }
    if let Some(n) = ch.force_channel_num {
        ppg::force_channel_num(&mut t, n);
    }
    t
}

/// Write every non-empty channel to `<dir>/<key>.parquet`. A table that fails
/// to write is logged and left out of the summary.
pub fn write_tables(parsed: &PartialResult, dir: &Path) -> Result<ParseSummary> {
    std::fs::create_dir_all(dir)?;
    let mut summary = ParseSummary::default();
    let mut size_kb = 0.0;

    for (ch, records) in CHANNELS.iter().zip(&parsed.channels) {
        if records.is_empty() {
            continue;
        }
        let table = build_table(ch, records);
        let file = format!("{}.{PARQUET_EXT}", ch.key);
        match table.write_parquet(&dir.join(&file)) {
            Ok(bytes) => {
                let kb = round1(bytes as f64 / 1024.0);
                log_info!(
                    component = "materialize",
                    event = "table_written",
                    file = %file,
                    rows = table.rows(),
                    size_kb = kb
                );
                summary.summary.total_rows += table.rows();
                size_kb += kb;
                summary.keys.0.push((
                    ch.key.to_string(),
                    TableSummary {
                        rows: table.rows(),
                        columns: table.column_names(),
                        file,
                        size_kb: kb,
                    },
                ));
            }
            Err(e) => {
                log_error!(
                    component = "materialize",
                    event = "table_failed",
                    file = %file,
                    error = %e
                );
            }
        }
    }
    summary.summary.size_kb = round1(size_kb);
    Ok(summary)
}
