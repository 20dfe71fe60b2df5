//! Raw ACC/PPG sample packets (0x18/0x19/0x1A and 0x15/0x16/0x17/0x26/0x33).
//!
//! Headers are little-endian; the sample arrays are big-endian with a fixed bias.

use super::warn_truncated;
use crate::decode::DecodeContext;
use crate::decode::cursor::Cursor;
use crate::decode::record::{Row, int, ints, opt_int, Cell};

const ACC_BIAS: i32 = 32768;
const PPG_BIAS: i64 = 1_000_000;
const ACC_VALUES_V2: usize = 105;
const ACC_VALUES_V1: usize = 69;
const PPG_VALUES_V2: usize = 52;
const PPG_VALUES_V1: usize = 34;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccRaw {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub serial_number: Option<u8>,
    pub ms: Option<u16>,
    pub acc_scale: Option<u8>,
    pub reserved: [u8; 7],
    pub acc_type: u8,
    pub arr_bit: u8,
    /// Sample triples announced by the header; summed when packets are merged.
    pub arr_size: u32,
    pub freq: u16,
    pub tolerance: u8,
    pub data: [u8; 5],
    pub acc_data: Vec<[i32; 3]>,
}

impl AccRaw {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload), ctx.v2).is_none() {
            warn_truncated("ACC_Raw_Data", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>, v2: bool) -> Option<()> {
        if v2 {
            let mut g = c.group(11)?;
            self.serial_number = Some(g.u8());
            self.ms = Some(g.u16());
            self.acc_scale = Some(g.u8());
            self.reserved = g.u8s();
        }
        let mut g = c.group(12)?;
        self.acc_type = g.u8();
        self.arr_bit = g.u8();
        self.arr_size = g.u16() as u32;
        self.freq = g.u16();
        self.tolerance = g.u8();
        self.data = g.u8s();

        let cap = if v2 { ACC_VALUES_V2 } else { ACC_VALUES_V1 };
        let n = cap.min(self.arr_size as usize * 3);
        if n > 0 {
            let mut g = c.group(n * 2)?;
            let vals: Vec<i32> = (0..n).map(|_| g.u16_be() as i32 - ACC_BIAS).collect();
            self.acc_data = vals.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        }
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("serial_number", opt_int(self.serial_number)),
            ("ms", opt_int(self.ms)),
            ("acc_scale", opt_int(self.acc_scale)),
            ("reserved", ints(&self.reserved)),
            ("acc_type", int(self.acc_type)),
            ("arr_bit", int(self.arr_bit)),
            ("arr_size", int(self.arr_size)),
            ("freq", int(self.freq)),
            ("tolerance", int(self.tolerance)),
            ("data", ints(&self.data)),
            (
                "acc_data",
                Cell::Triples(
                    self.acc_data
                        .iter()
                        .map(|t| [t[0] as i64, t[1] as i64, t[2] as i64])
                        .collect(),
                ),
            ),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PpgRaw {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub serial_number: Option<u8>,
    pub ms: Option<u16>,
    pub reserved: [u8; 8],
    pub ppg_type: u8,
    pub arr_bit: u8,
    pub arr_size: u32,
    pub freq: u16,
    pub tolerance: u8,
    /// `data[0]` carries the interleaved channel count on multi-channel sensors.
    pub data: [u8; 5],
    pub ppg_data: Vec<i64>,
}

impl PpgRaw {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload), ctx.v2).is_none() {
            warn_truncated("PPG_Raw_Data", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>, v2: bool) -> Option<()> {
        if v2 {
            let mut g = c.group(11)?;
            self.serial_number = Some(g.u8());
            self.ms = Some(g.u16());
            self.reserved = g.u8s();
        }
        let mut g = c.group(12)?;
        self.ppg_type = g.u8();
        self.arr_bit = g.u8();
        self.arr_size = g.u16() as u32;
        self.freq = g.u16();
        self.tolerance = g.u8();
        self.data = g.u8s();

        let cap = if v2 { PPG_VALUES_V2 } else { PPG_VALUES_V1 };
        let n = cap.min(self.arr_size as usize);
        if n > 0 {
            let mut g = c.group(n * 4)?;
            self.ppg_data = (0..n).map(|_| g.u32_be() as i64 - PPG_BIAS).collect();
        }
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("serial_number", opt_int(self.serial_number)),
            ("ms", opt_int(self.ms)),
            ("reserved", ints(&self.reserved)),
            ("ppg_type", int(self.ppg_type)),
            ("arr_bit", int(self.arr_bit)),
            ("arr_size", int(self.arr_size)),
            ("freq", int(self.freq)),
            ("tolerance", int(self.tolerance)),
            ("data", ints(&self.data)),
            ("ppg_data", ints(&self.ppg_data)),
        ]
    }
}
