//! Fixed wire layouts, one module per record family.

pub mod base_info;
pub mod psp;
pub mod sensor;
pub mod tyhx;
pub mod wear;

use crate::observability::log_warn;

pub(crate) fn warn_truncated(record: &'static str, len: usize) {
    log_warn!(
        component = "decode",
        event = "record_truncated",
        record,
        payload_len = len
    );
}
