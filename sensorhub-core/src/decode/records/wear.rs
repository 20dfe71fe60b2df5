//! 0x71 wear detection and 0x69 motion recognition.

use super::warn_truncated;
use crate::decode::DecodeContext;
use crate::decode::cursor::Cursor;
use crate::decode::record::{Cell, Row, int, opt_int, opt_ints};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionRecognition {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub error_code: u8,
    pub init_timer: u32,
    pub motion_type_ring: u8,
    pub detection_state: u8,
    pub activity_motion_time_ring: u32,
    pub auto_detect_state: u8,
    pub instant_type: u8,
    pub hr_rising: u8,
    pub hr_avg: u8,
    pub steps_per_minute: u16,
    pub acc_feature: u16,
    pub avg_activity_level: u32,
    pub wear_flag_ring: u8,
    pub unworn_seconds: u16,
}

impl MotionRecognition {
    /// The layout sits at `ctx.offset` inside a larger payload.
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::at(payload, ctx.offset)).is_none() {
            warn_truncated("MotionRecognition", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>) -> Option<()> {
        let mut g = c.group(26)?;
        self.error_code = g.u8();
        self.init_timer = g.u32();
        self.motion_type_ring = g.u8();
        self.detection_state = g.u8();
        self.activity_motion_time_ring = g.u32();
        self.auto_detect_state = g.u8();
        self.instant_type = g.u8();
        self.hr_rising = g.u8();
        self.hr_avg = g.u8();
        self.steps_per_minute = g.u16();
        self.acc_feature = g.u16();
        self.avg_activity_level = g.u32();
        self.wear_flag_ring = g.u8();
        self.unworn_seconds = g.u16();
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("error_code", int(self.error_code)),
            ("init_timer", int(self.init_timer)),
            ("motion_type_ring", int(self.motion_type_ring)),
            ("detection_state", int(self.detection_state)),
            ("activity_motion_time_ring", int(self.activity_motion_time_ring)),
            ("auto_detect_state", int(self.auto_detect_state)),
            ("instant_type", int(self.instant_type)),
            ("hr_rising", int(self.hr_rising)),
            ("hr_avg", int(self.hr_avg)),
            ("steps_per_minute", int(self.steps_per_minute)),
            ("acc_feature", int(self.acc_feature)),
            ("avg_activity_level", int(self.avg_activity_level)),
            ("wear_flag_ring", int(self.wear_flag_ring)),
            ("unworn_seconds", int(self.unworn_seconds)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WearInfo {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub serial_number: Option<u8>,
    /// Up to ten bytes; shorter when the payload ends early.
    pub reserved: Option<Vec<u8>>,
    pub wear_flag: u8,
    pub error_no: u8,
    pub wear_ir_result: u8,
    pub confusion: u8,
    pub peak_cnt: u8,
    pub wear_rr_hr: u8,
    pub wear_acc_std: u16,
    pub return_type: u8,
    pub green_temp_flag_encode: u16,
    pub init_timer: u8,
    pub amb_std: i32,
    pub ppg_dc_value: i32,
    pub state: u8,
    pub imu_6d_state: u8,
    pub ppg_g_current: u16,
    pub ppg_g_idac: u16,
    pub ppg_ir_value: i32,
    pub wear_acc_momentum: u16,
    pub entropy_geometric: u32,
    pub zero_crossing_rate: u16,
    pub wear_green_result: u8,
    pub wear_ambient_result: u8,
}

impl WearInfo {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload), ctx.v2).is_none() {
            warn_truncated("WearInfo", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>, v2: bool) -> Option<()> {
        if v2 {
            self.serial_number = Some(c.group(1)?.u8());
            self.reserved = Some(c.take_upto(10).to_vec());
        }

        let mut g = c.group(20)?;
        self.wear_flag = g.u8();
        self.error_no = g.u8();
        self.wear_ir_result = g.u8();
        self.confusion = g.u8();
        self.peak_cnt = g.u8();
        self.wear_rr_hr = g.u8();
        self.wear_acc_std = g.u16();
        self.return_type = g.u8();
        self.green_temp_flag_encode = g.u16();
        self.init_timer = g.u8();
        self.amb_std = g.i32();
        self.ppg_dc_value = g.i32();

        let mut g = c.group(10)?;
        self.state = g.u8();
        self.imu_6d_state = g.u8();
        self.ppg_g_current = g.u16();
        self.ppg_g_idac = g.u16();
        self.ppg_ir_value = g.i32();

        let mut g = c.group(10)?;
        self.wear_acc_momentum = g.u16();
        self.entropy_geometric = g.u32();
        self.zero_crossing_rate = g.u16();
        self.wear_green_result = g.u8();
        self.wear_ambient_result = g.u8();
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("serial_number", opt_int(self.serial_number)),
            ("reserved", opt_ints(self.reserved.as_deref())),
            ("wear_flag", int(self.wear_flag)),
            ("error_no", int(self.error_no)),
            ("wear_ir_result", int(self.wear_ir_result)),
            ("confusion", int(self.confusion)),
            ("peak_cnt", int(self.peak_cnt)),
            ("wear_rr_hr", int(self.wear_rr_hr)),
            ("wear_acc_std", int(self.wear_acc_std)),
            ("return_type", int(self.return_type)),
            ("green_temp_flag_encode", int(self.green_temp_flag_encode)),
            ("init_timer", int(self.init_timer)),
            ("amb_std", int(self.amb_std)),
            ("ppg_dc_value", int(self.ppg_dc_value)),
            ("state", int(self.state)),
            ("imu_6d_state", int(self.imu_6d_state)),
            ("ppg_g_current", int(self.ppg_g_current)),
            ("ppg_g_idac", int(self.ppg_g_idac)),
            ("ppg_ir_value", int(self.ppg_ir_value)),
            ("wear_acc_momentum", int(self.wear_acc_momentum)),
            ("entropy_geometric", int(self.entropy_geometric)),
            ("zero_crossing_rate", int(self.zero_crossing_rate)),
            ("wear_green_result", int(self.wear_green_result)),
            ("wear_ambient_result", int(self.wear_ambient_result)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(v2: bool, offset: usize) -> DecodeContext<'static> {
        DecodeContext {
            timestamp: "t",
            unix_timestamp: 5,
            label_hr: 0,
            v2,
            offset,
        }
    }

    #[test]
    fn motion_reads_at_offset() {
        let mut p = vec![0u8; 149 + 26];
        p[149] = 2; // error_code
        p[150..154].copy_from_slice(&77u32.to_le_bytes());
        p[149 + 24..149 + 26].copy_from_slice(&600u16.to_le_bytes());
        let r = MotionRecognition::decode(&p, &ctx(false, 149));
        assert_eq!(r.error_code, 2);
        assert_eq!(r.init_timer, 77);
        assert_eq!(r.unworn_seconds, 600);
    }

    #[test]
    fn motion_short_payload_is_zeroed() {
        let r = MotionRecognition::decode(&[1u8; 100], &ctx(false, 149));
        assert_eq!(r, MotionRecognition {
            timestamp: "t".into(),
            unix_timestamp: 5,
            ..Default::default()
        });
    }

    #[test]
    fn wear_v2_signed_fields() {
        let mut p = vec![0u8; 11 + 40];
        p[0] = 4;
        p[11] = 1; // wear_flag
        p[11 + 12..11 + 16].copy_from_slice(&(-300i32).to_le_bytes());
        let r = WearInfo::decode(&p, &ctx(true, 0));
        assert_eq!(r.serial_number, Some(4));
        assert_eq!(r.reserved.as_deref(), Some(&[0u8; 10][..]));
        assert_eq!(r.wear_flag, 1);
        assert_eq!(r.amb_std, -300);
    }

    #[test]
    fn wear_reserved_can_be_short() {
        let r = WearInfo::decode(&[8, 1, 2, 3], &ctx(true, 0));
        assert_eq!(r.serial_number, Some(8));
        assert_eq!(r.reserved, Some(vec![1, 2, 3]));
        assert_eq!(r.wear_flag, 0);
    }
}
