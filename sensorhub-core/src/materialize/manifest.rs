//! `manifest.json`, recording duration and the packet type breakdown.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{ParseSummary, TableKeys, Totals};
use crate::decode::{DataType, Record, TypeTally};
use crate::domain::DeviceKind;
use crate::error::Result;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFileRef {
    pub name: String,
    pub compressed_size: u64,
}

/// Index of one processed directory. Field order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub file_hash: String,
    pub sensor_file_id: Option<String>,
    pub filename: Option<String>,
    pub parsed_at: String,
    pub duration: String,
    pub duration_seconds: Option<i64>,
    pub is_ring: bool,
    pub raw_file_size: u64,
    pub raw_file: RawFileRef,
    pub keys: TableKeys,
    pub summary: Totals,
    pub data_types: Value,
    pub labels: Vec<Value>,
    pub content_meta: Map<String, Value>,
}

impl Manifest {
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(dir.join(MANIFEST_FILE))?);
        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;
        Ok(())
    }

    pub fn parse_summary(&self) -> ParseSummary {
        ParseSummary {
            keys: self.keys.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// Span between the earliest and latest base_info sample, in seconds.
pub fn duration_seconds(base_info: &[Record]) -> Option<i64> {
    let min = base_info.iter().map(Record::unix_timestamp).min()?;
    let max = base_info.iter().map(Record::unix_timestamp).max()?;
    let diff = max - min;
    (diff >= 0).then_some(diff)
}

/// `45s`, `12m 5s`, `3h 42m`, or `--` when unknown.
pub fn format_duration(seconds: Option<i64>) -> String {
    match seconds {
        None => "--".to_string(),
        Some(s) if s < 0 => "--".to_string(),
        Some(s) if s < 60 => format!("{s}s"),
        Some(s) => {
            let (h, m, sec) = (s / 3600, (s % 3600) / 60, s % 60);
            if h > 0 {
                format!("{h}h {m}m")
            } else {
                format!("{m}m {sec}s")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub name_cn: String,
    pub count: u64,
}

/// Packet counts with display names, ordered by numeric type code.
pub fn packets(tally: &TypeTally, device: DeviceKind) -> Vec<Packet> {
    let mut out: Vec<Packet> = tally
        .iter()
        .map(|(code, count)| match DataType::from_hex(code) {
            Some(t) => Packet {
                kind: code.to_string(),
                name: t.name(device).to_string(),
                name_cn: t.name_cn(device).to_string(),
                count,
            },
            None => Packet {
                kind: code.to_string(),
                name: format!("UNKNOWN({code})"),
                name_cn: format!("Unknown({code})"),
                count,
            },
        })
        .collect();
    // Codes that are not hex sort last, in first-seen order.
    out.sort_by_key(|p| u64::from_str_radix(&p.kind, 16).unwrap_or(u64::MAX));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::records::base_info::BaseInfo;

    #[test]
    fn duration_formats() {
        assert_eq!(format_duration(None), "--");
        assert_eq!(format_duration(Some(-1)), "--");
        assert_eq!(format_duration(Some(0)), "0s");
        assert_eq!(format_duration(Some(59)), "59s");
        assert_eq!(format_duration(Some(60)), "1m 0s");
        assert_eq!(format_duration(Some(725)), "12m 5s");
        assert_eq!(format_duration(Some(3 * 3600 + 42 * 60 + 9)), "3h 42m");
    }

    #[test]
    fn duration_from_base_info_span() {
        let rec = |ts| {
            Record::BaseInfo(BaseInfo {
                unix_timestamp: ts,
                ..Default::default()
            })
        };
        assert_eq!(duration_seconds(&[]), None);
        assert_eq!(duration_seconds(&[rec(50), rec(10), rec(30)]), Some(40));
    }

    #[test]
    fn packets_sorted_and_named() {
        let mut tally = TypeTally::default();
        tally.add("82", 2);
        tally.add("1A", 1);
        tally.add("EE", 4);
        tally.add("00", 7);

        let watch = packets(&tally, DeviceKind::Watch);
        let kinds: Vec<&str> = watch.iter().map(|p| p.kind.as_str()).collect();
        assert_eq!(kinds, ["00", "1A", "82", "EE"]);
        assert_eq!(watch[0].name, "BASE_INFO");
        assert_eq!(watch[0].name_cn, "基础信息");
        assert_eq!(watch[2].name, "TYHX_AGC_DATA");
        assert_eq!(watch[3].name, "UNKNOWN(EE)");
        assert_eq!(watch[3].name_cn, "Unknown(EE)");

        let ring = packets(&tally, DeviceKind::Ring);
        assert_eq!(ring[2].name, "TYHX_3697_Data");
        assert_eq!(ring[2].name_cn, "TYHX 3697 数据");

        let json = serde_json::to_string(&ring[0]).unwrap();
        assert_eq!(json, r#"{"type":"00","name":"BASE_INFO","name_cn":"基础信息","count":7}"#);
    }

    #[test]
    fn manifest_keeps_field_order_and_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = Map::new();
        meta.insert("tester".into(), Value::from("张三"));
        let m = Manifest {
            file_hash: "abc".into(),
            sensor_file_id: Some("f1".into()),
            filename: Some("a.rawdata".into()),
            parsed_at: "2024-01-01T00:00:00Z".into(),
            duration: "--".into(),
            duration_seconds: None,
            is_ring: false,
            raw_file_size: 10,
            raw_file: RawFileRef {
                name: "abc.raw.zst".into(),
                compressed_size: 10,
            },
            keys: TableKeys::default(),
            summary: Totals::default(),
            data_types: TypeTally::default().to_json(),
            labels: vec![],
            content_meta: meta,
        };
        m.write_to(dir.path()).unwrap();
        let text = std::fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        assert!(text.contains("张三"));
        let v: Value = serde_json::from_str(&text).unwrap();
        let order: Vec<&String> = v.as_object().unwrap().keys().collect();
        assert_eq!(order[0], "file_hash");
        assert_eq!(order[order.len() - 1], "content_meta");
        assert_eq!(v["raw_file"]["name"], "abc.raw.zst");
    }
}
