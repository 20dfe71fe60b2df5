#![forbid(unsafe_code)]

mod observability;

pub mod config;
pub mod domain;
pub mod error;

pub mod util {
    pub mod counting;
}

pub mod hash {
    pub mod md5;
}

pub mod codec;
pub mod store;

pub mod catalog;
pub mod plan;

pub mod decode;
pub mod dispatch;
pub mod materialize;

pub mod progress;
pub mod stats;

pub mod download;
pub mod hub;

// Re-exports: stable API surface
pub use catalog::Catalog;
pub use config::Settings;
pub use domain::{DeviceKind, LogicalFile, ParseResult, ParseStatus, PhysicalBlob};
pub use download::{DownloadManager, HttpSource, Source, TaskState};
pub use error::{HubError, Result};
pub use hash::md5::ContentHash;
pub use hub::{Ingested, ParseOutput, SensorHub};
pub use progress::{ProgressEvent, ProgressStore};
pub use store::FrameStore;
