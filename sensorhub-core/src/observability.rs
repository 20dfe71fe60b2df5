//! Logging macros for sensorhub.
//!
//! Every event goes to target "sensorhub" and carries `component` and a
//! snake_case `event` field. The library never installs a subscriber; the
//! dev CLI does that.

pub(crate) const HUB_TARGET: &str = "sensorhub";

/// Info-level event.
///
/// ```ignore
/// log_info!(component = "store", event = "blob_written", hash = %hash, frames = n);
/// ```
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::HUB_TARGET, $($field)*)
    };
}

macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::HUB_TARGET, $($field)*)
    };
}

macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::HUB_TARGET, $($field)*)
    };
}

macro_rules! log_error {
    ($($field:tt)*) => {
        ::tracing::error!(target: $crate::observability::HUB_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_error;
pub(crate) use log_info;
pub(crate) use log_warn;
