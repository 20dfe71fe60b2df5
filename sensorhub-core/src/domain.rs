// sensorhub_core/src/domain.rs
use crate::hash::md5::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Wearable family a log was recorded on. Selects the 0x82 layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    #[default]
    Watch,
    Ring,
}

impl DeviceKind {
    pub fn is_ring(self) -> bool {
        matches!(self, DeviceKind::Ring)
    }

    /// Guess from an upload name: `Watch` or `Ring` in the name, else Watch.
    pub fn from_filename(name: &str) -> Self {
        if name.contains("Watch") {
            DeviceKind::Watch
        } else if name.contains("Ring") {
            DeviceKind::Ring
        } else {
            DeviceKind::default()
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Watch => "Watch",
            DeviceKind::Ring => "Ring",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "watch" => Ok(DeviceKind::Watch),
            "ring" => Ok(DeviceKind::Ring),
            other => Err(format!("unknown device kind: {other}")),
        }
    }
}

/// One stored blob. Shared by every LogicalFile with the same content hash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalBlob {
    pub hash: ContentHash,
    /// Compressed bytes on disk.
    pub size: u64,
    pub path: PathBuf,
    /// Kept untyped so a malformed legacy index still reaches validation.
    pub frame_index: Option<serde_json::Value>,
    pub compression_ratio: Option<String>,
    pub created_at: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogicalFile {
    pub id: String,
    pub hash: ContentHash,
    pub filename: String,
    /// `""` or `" (n)"` when the filename is already taken.
    pub name_suffix: String,
    /// Human readable, e.g. "12.5 MB".
    pub size: String,
    pub file_size_bytes: u64,
    pub device: DeviceKind,
    pub uploaded_at: i64,
}

impl LogicalFile {
    pub fn display_name(&self) -> String {
        format!("{}{}", self.filename, self.name_suffix)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStatus {
    #[default]
    Idle,
    Processing,
    Processed,
    Error,
}

impl ParseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ParseStatus::Processed | ParseStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParseStatus::Idle => "idle",
            ParseStatus::Processing => "processing",
            ParseStatus::Processed => "processed",
            ParseStatus::Error => "error",
        }
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of the latest parse of a LogicalFile. At most one per file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub file_id: String,
    pub status: ParseStatus,
    pub progress: Option<u8>,
    pub duration: String,
    /// JSON array text, `[{type, name, name_cn, count}]`.
    pub packets: String,
    pub content_meta: serde_json::Map<String, serde_json::Value>,
    pub processed_dir: Option<PathBuf>,
    pub device_type_used: Option<DeviceKind>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ParseResult {
    pub fn new(file_id: impl Into<String>, status: ParseStatus, now: i64) -> Self {
        Self {
            file_id: file_id.into(),
            status,
            duration: "--".to_string(),
            packets: "[]".to_string(),
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }
}

/// Partial update for [`ParseResult`]. `Some(None)` clears an optional field.
#[derive(Clone, Debug, Default)]
pub struct ParsePatch {
    pub status: Option<ParseStatus>,
    pub progress: Option<Option<u8>>,
    pub duration: Option<String>,
    pub packets: Option<String>,
    pub content_meta: Option<serde_json::Map<String, serde_json::Value>>,
    pub processed_dir: Option<Option<PathBuf>>,
    pub device_type_used: Option<DeviceKind>,
    pub error_message: Option<Option<String>>,
}

impl ParsePatch {
    pub fn apply(self, r: &mut ParseResult, now: i64) {
        if let Some(v) = self.status {
            r.status = v;
        }
        if let Some(v) = self.progress {
            r.progress = v;
        }
        if let Some(v) = self.duration {
            r.duration = v;
        }
        if let Some(v) = self.packets {
            r.packets = v;
        }
        if let Some(v) = self.content_meta {
            r.content_meta = v;
        }
        if let Some(v) = self.processed_dir {
            r.processed_dir = v;
        }
        if let Some(v) = self.device_type_used {
            r.device_type_used = Some(v);
        }
        if let Some(v) = self.error_message {
            r.error_message = v;
        }
        r.updated_at = now;
    }
}

/// Seconds since the Unix epoch.
pub fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_kind_parses_case_insensitively() {
        assert_eq!("RING".parse::<DeviceKind>().unwrap(), DeviceKind::Ring);
        assert_eq!("Watch".parse::<DeviceKind>().unwrap(), DeviceKind::Watch);
        assert!("band".parse::<DeviceKind>().is_err());
    }

    #[test]
    fn device_kind_guessed_from_upload_name() {
        assert_eq!(DeviceKind::from_filename("Ring_0412.rawdata"), DeviceKind::Ring);
        assert_eq!(DeviceKind::from_filename("Watch_Ring.rawdata"), DeviceKind::Watch);
        assert_eq!(DeviceKind::from_filename("log.rawdata"), DeviceKind::Watch);
    }

    #[test]
    fn patch_clears_and_keeps_fields() {
        let mut r = ParseResult::new("f1", ParseStatus::Processing, 10);
        r.error_message = Some("old".into());
        r.content_meta.insert("tester".into(), serde_json::json!("amy"));
        ParsePatch {
            status: Some(ParseStatus::Error),
            error_message: Some(None),
            ..Default::default()
        }
        .apply(&mut r, 20);
        assert_eq!(r.status, ParseStatus::Error);
        assert_eq!(r.error_message, None);
        assert_eq!(r.content_meta["tester"], "amy");
        assert_eq!(r.updated_at, 20);
        assert_eq!(r.created_at, 10);
    }
}
