//! 0x91 PSP green FIFO and 0x99 CREEK heart-rate results.

use super::warn_truncated;
use crate::decode::DecodeContext;
use crate::decode::cursor::Cursor;
use crate::decode::record::{Cell, Row, int, ints, opt_int};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PspFifo {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub serial_number: Option<u8>,
    pub psp_index: Option<u8>,
    pub psp_id: Option<u8>,
    pub offset: Option<u8>,
    pub exponent: Option<u8>,
    pub ms: Option<u16>,
    pub rhr: Option<u8>,
    pub rhr_qual: Option<u8>,
    pub breathe: Option<u8>,
    pub breathe_qual: Option<u8>,
    pub cnt: u8,
    pub hr: u8,
    pub hr_qual: u8,
    pub spo2: u8,
    pub spo2_qual: u8,
    pub ppg_data: [u16; 32],
    pub adcgain: [u8; 4],
    pub ppg_g_quality: u8,
    pub heartrate: u8,
    pub is_valid: u8,
}

impl PspFifo {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload), ctx.v2).is_none() {
            warn_truncated("PSP_PPG_FIFO", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>, v2: bool) -> Option<()> {
        if v2 {
            let mut g = c.group(11)?;
            self.serial_number = Some(g.u8());
            self.psp_index = Some(g.u8());
            self.psp_id = Some(g.u8());
            self.offset = Some(g.u8());
            self.exponent = Some(g.u8());
            self.ms = Some(g.u16());
            self.rhr = Some(g.u8());
            self.rhr_qual = Some(g.u8());
            self.breathe = Some(g.u8());
            self.breathe_qual = Some(g.u8());
        }
        let mut g = c.group(5)?;
        self.cnt = g.u8();
        self.hr = g.u8();
        self.hr_qual = g.u8();
        self.spo2 = g.u8();
        self.spo2_qual = g.u8();

        self.ppg_data = c.group(64)?.u16s();
        self.adcgain = c.group(4)?.u8s();
        let mut g = c.group(2)?;
        self.ppg_g_quality = g.u8();
        self.heartrate = g.u8();
        self.is_valid = c.group(1)?.u8();
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("serial_number", opt_int(self.serial_number)),
            ("psp_index", opt_int(self.psp_index)),
            ("psp_id", opt_int(self.psp_id)),
            ("offset", opt_int(self.offset)),
            ("exponent", opt_int(self.exponent)),
            ("ms", opt_int(self.ms)),
            ("rhr", opt_int(self.rhr)),
            ("rhr_qual", opt_int(self.rhr_qual)),
            ("breathe", opt_int(self.breathe)),
            ("breathe_qual", opt_int(self.breathe_qual)),
            ("cnt", int(self.cnt)),
            ("hr", int(self.hr)),
            ("hr_qual", int(self.hr_qual)),
            ("spo2", int(self.spo2)),
            ("spo2_qual", int(self.spo2_qual)),
            ("ppg_data", ints(&self.ppg_data)),
            ("adcgain", ints(&self.adcgain)),
            ("ppg_g_quality", int(self.ppg_g_quality)),
            ("heartrate", int(self.heartrate)),
            ("is_valid", int(self.is_valid)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreekHr {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub serial_number: Option<u8>,
    pub reserved: [u8; 10],
    pub code: u8,
    pub ppg_size: u8,
    pub ppg_channel: u8,
    pub acc_size: u8,
    pub activity_level: u8,
    pub test_mode: u8,
    pub sport_type: u8,
    pub wear_flag: u8,
    pub step_freq: u8,
    pub distance_cm: u32,
    pub gnss_enable: u8,
    pub philips_hr_activity: u8,
    pub philips_hr_qi_activity: u8,
    pub barograph_altitude_cm: i32,
    pub reserved_2: [u8; 20],
    pub ppg_g_quality: u8,
    pub heartrate: u8,
    pub is_valid: u8,
    pub sport_time: u32,
    pub xyz_momentum: u32,
    pub step_freq_result: u8,
    pub avg_distance_cm: u32,
    pub speed_perkm: u32,
    pub philips_hr_result: u8,
    pub philips_hr_qi_result: u8,
    pub init_heartrate: u8,
    pub tcn_heartrate: u8,
    pub current_distance_cm: u32,
    pub signal_status: u8,
    pub no_confidence_score: u16,
    pub batter_signal_heartrate: u8,
    pub max_signal_heartrate: u8,
    pub acc_main_freq: u8,
    pub result_type: u8,
    pub signal_type: u8,
    pub up_down_status: i8,
    pub ppg_peaks_cnt: i8,
    pub acc_peaks_cnt: i8,
}

impl CreekHr {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload), ctx.v2).is_none() {
            warn_truncated("CREEK_HR_Data", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>, v2: bool) -> Option<()> {
        if v2 {
            let mut g = c.group(11)?;
            self.serial_number = Some(g.u8());
            self.reserved = g.u8s();
        }
        let mut g = c.group(4)?;
        self.code = g.u8();
        self.ppg_size = g.u8();
        self.ppg_channel = g.u8();
        self.acc_size = g.u8();

        let mut g = c.group(16)?;
        self.activity_level = g.u8();
        self.test_mode = g.u8();
        self.sport_type = g.u8();
        self.wear_flag = g.u8();
        self.step_freq = g.u8();
        self.distance_cm = g.u32();
        self.gnss_enable = g.u8();
        self.philips_hr_activity = g.u8();
        self.philips_hr_qi_activity = g.u8();
        self.barograph_altitude_cm = g.i32();

        self.reserved_2 = c.group(20)?.u8s();

        let mut g = c.group(29)?;
        self.ppg_g_quality = g.u8();
        self.heartrate = g.u8();
        self.is_valid = g.u8();
        self.sport_time = g.u32();
        self.xyz_momentum = g.u32();
        self.step_freq_result = g.u8();
        self.avg_distance_cm = g.u32();
        self.speed_perkm = g.u32();
        self.philips_hr_result = g.u8();
        self.philips_hr_qi_result = g.u8();
        self.init_heartrate = g.u8();
        self.tcn_heartrate = g.u8();
        self.current_distance_cm = g.u32();
        self.signal_status = g.u8();

        let mut g = c.group(10)?;
        self.no_confidence_score = g.u16();
        self.batter_signal_heartrate = g.u8();
        self.max_signal_heartrate = g.u8();
        self.acc_main_freq = g.u8();
        self.result_type = g.u8();
        self.signal_type = g.u8();
        self.up_down_status = g.i8();
        self.ppg_peaks_cnt = g.i8();
        self.acc_peaks_cnt = g.i8();
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("serial_number", opt_int(self.serial_number)),
            ("reserved", ints(&self.reserved)),
            ("code", int(self.code)),
            ("ppg_size", int(self.ppg_size)),
            ("ppg_channel", int(self.ppg_channel)),
            ("acc_size", int(self.acc_size)),
            ("activity_level", int(self.activity_level)),
            ("test_mode", int(self.test_mode)),
            ("sport_type", int(self.sport_type)),
            ("wear_flag", int(self.wear_flag)),
            ("step_freq", int(self.step_freq)),
            ("distance_cm", int(self.distance_cm)),
            ("gnss_enable", int(self.gnss_enable)),
            ("philips_hr_activity", int(self.philips_hr_activity)),
            ("philips_hr_qi_activity", int(self.philips_hr_qi_activity)),
            ("barograph_altitude_cm", int(self.barograph_altitude_cm)),
            ("reserved_2", ints(&self.reserved_2)),
            ("ppg_g_quality", int(self.ppg_g_quality)),
            ("heartrate", int(self.heartrate)),
            ("is_valid", int(self.is_valid)),
            ("sport_time", int(self.sport_time)),
            ("xyz_momentum", int(self.xyz_momentum)),
            ("step_freq_result", int(self.step_freq_result)),
            ("avg_distance_cm", int(self.avg_distance_cm)),
            ("speed_perkm", int(self.speed_perkm)),
            ("philips_hr_result", int(self.philips_hr_result)),
            ("philips_hr_qi_result", int(self.philips_hr_qi_result)),
            ("init_heartrate", int(self.init_heartrate)),
            ("tcn_heartrate", int(self.tcn_heartrate)),
            ("current_distance_cm", int(self.current_distance_cm)),
            ("signal_status", int(self.signal_status)),
            ("no_confidence_score", int(self.no_confidence_score)),
            ("batter_signal_heartrate", int(self.batter_signal_heartrate)),
            ("max_signal_heartrate", int(self.max_signal_heartrate)),
            ("acc_main_freq", int(self.acc_main_freq)),
            ("result_type", int(self.result_type)),
            ("signal_type", int(self.signal_type)),
            ("up_down_status", int(self.up_down_status)),
            ("ppg_peaks_cnt", int(self.ppg_peaks_cnt)),
            ("acc_peaks_cnt", int(self.acc_peaks_cnt)),
        ]
    }
}
