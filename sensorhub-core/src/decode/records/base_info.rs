//! 0x00 base info: the per-second vitals snapshot.

use super::warn_truncated;
use crate::decode::DecodeContext;
use crate::decode::cursor::Cursor;
use crate::decode::record::{Cell, Row, int, ints, opt_int, opt_ints};

const PART1_LEN: usize = 46;
const REST_LEN: usize = 41;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseInfo {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub label_hr: i64,
    pub serial_number: Option<u8>,
    pub reserved: Option<[u8; 10]>,
    pub label: u8,
    pub heart_rate_band: u8,
    pub birth_year: u16,
    pub birth_mouth: u8,
    pub birth_day: u8,
    pub gender: u8,
    pub heigh: u16,
    pub weight: u16,
    pub activity_level: u8,
    pub heart_rate: u8,
    pub step: u32,
    pub spo2: u8,
    pub stress: u8,
    pub noise: u8,
    pub activity_kacl: u16,
    pub bmr_kacl: u16,
    pub exercise_duration: u8,
    pub stand_hour: u8,
    pub wear_flag: u8,
    pub screen_state: u8,
    pub gesture_label: u8,
    pub step_freq: u16,
    pub distance: u32,
    pub sleep_time: u32,
    pub getup_time: u32,
    pub orientation_flag: u8,
    pub sport_type: u8,
    pub max_oxygen_uptake: u8,
    pub tyhx_data: [u8; 20],
    pub acc_xyz: [i16; 9],
    pub acc_reg: [u8; 3],
    pub update_count: u8,
    pub update_sch_count: u8,
    pub fifo_size: u8,
    pub timer_flag: u8,
    pub sleep_state: u8,
    pub sleep_dida_time: u16,
    pub stress_switch: u8,
    pub ntc_temperature: u8,
    pub one_sec_distance: u32,
    pub qual_value: u8,
    pub heartrate_measure_flag: u8,
    pub sport_state: u8,
    pub static_heartrate: u8,
    pub is_tachycardia: u8,
    pub spo2_motion: u8,
    pub motor_vibration_flag: u8,
    pub power_average_sec: u16,
    pub mets: u8,
    pub sport_mode: u8,
    pub floors_climb: u16,
    pub lift_total: u32,
    pub decent_total: u32,
    pub space: u32,
    pub interval: u16,
    pub exercise_type: u8,
}

impl BaseInfo {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            label_hr: ctx.label_hr,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload), ctx.v2).is_none() {
            warn_truncated("BaseInfo", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>, v2: bool) -> Option<()> {
        if v2 {
            let mut g = c.group(11)?;
            self.serial_number = Some(g.u8());
            self.reserved = Some(g.u8s());
        }

        let mut g = c.group(PART1_LEN)?;
        self.label = g.u8();
        self.heart_rate_band = g.u8();
        self.birth_year = g.u16();
        self.birth_mouth = g.u8();
        self.birth_day = g.u8();
        self.gender = g.u8();
        self.heigh = g.u16();
        self.weight = g.u16();
        self.activity_level = g.u8();
        self.heart_rate = g.u8();
        self.step = g.u32();
        self.spo2 = g.u8();
        self.stress = g.u8();
        self.noise = g.u8();
        self.activity_kacl = g.u16();
        self.bmr_kacl = g.u16();
        self.exercise_duration = g.u8();
        self.stand_hour = g.u8();
        self.wear_flag = g.u8();
        self.screen_state = g.u8();
        self.gesture_label = g.u8();
        self.step_freq = g.u16();
        self.distance = g.u32();
        self.sleep_time = g.u32();
        self.getup_time = g.u32();
        self.orientation_flag = g.u8();
        self.sport_type = g.u8();
        self.max_oxygen_uptake = g.u8();

        self.tyhx_data = c.group(20)?.u8s();
        self.acc_xyz = c.group(18)?.i16s();
        self.acc_reg = c.group(3)?.u8s();

        let mut g = c.group(REST_LEN)?;
        self.update_count = g.u8();
        self.update_sch_count = g.u8();
        self.fifo_size = g.u8();
        self.timer_flag = g.u8();
        self.sleep_state = g.u8();
        self.sleep_dida_time = g.u16();
        self.stress_switch = g.u8();
        self.ntc_temperature = g.u8();
        self.one_sec_distance = g.u32();
        self.qual_value = g.u8();
        self.heartrate_measure_flag = g.u8();
        self.sport_state = g.u8();
        self.static_heartrate = g.u8();
        self.is_tachycardia = g.u8();
        self.spo2_motion = g.u8();
        self.motor_vibration_flag = g.u8();
        self.power_average_sec = g.u16();
        self.mets = g.u8();
        self.sport_mode = g.u8();
        self.floors_climb = g.u16();
        self.lift_total = g.u32();
        self.decent_total = g.u32();
        self.space = g.u32();
        self.interval = g.u16();
        self.exercise_type = g.u8();
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("label_hr", int(self.label_hr)),
            ("serial_number", opt_int(self.serial_number)),
            ("reserved", opt_ints(self.reserved.as_ref().map(|r| &r[..]))),
            ("label", int(self.label)),
            ("heart_rate_band", int(self.heart_rate_band)),
            ("birth_year", int(self.birth_year)),
            ("birth_mouth", int(self.birth_mouth)),
            ("birth_day", int(self.birth_day)),
            ("gender", int(self.gender)),
            ("heigh", int(self.heigh)),
            ("weight", int(self.weight)),
            ("activity_level", int(self.activity_level)),
            ("heart_rate", int(self.heart_rate)),
            ("step", int(self.step)),
            ("spo2", int(self.spo2)),
            ("stress", int(self.stress)),
            ("noise", int(self.noise)),
            ("activity_kacl", int(self.activity_kacl)),
            ("BMR_kacl", int(self.bmr_kacl)),
            ("exercise_duration", int(self.exercise_duration)),
            ("stand_hour", int(self.stand_hour)),
            ("wear_flag", int(self.wear_flag)),
            ("screen_state", int(self.screen_state)),
            ("gesture_label", int(self.gesture_label)),
            ("step_freq", int(self.step_freq)),
            ("distance", int(self.distance)),
            ("sleep_time", int(self.sleep_time)),
            ("getup_time", int(self.getup_time)),
            ("orientation_flag", int(self.orientation_flag)),
            ("sport_type", int(self.sport_type)),
            ("max_oxygen_uptake", int(self.max_oxygen_uptake)),
            ("tyhx_data", ints(&self.tyhx_data)),
            ("acc_xyz", ints(&self.acc_xyz)),
            ("acc_reg", ints(&self.acc_reg)),
            ("update_count", int(self.update_count)),
            ("update_sch_count", int(self.update_sch_count)),
            ("fifo_size", int(self.fifo_size)),
            ("timer_flag", int(self.timer_flag)),
            ("sleep_state", int(self.sleep_state)),
            ("sleep_dida_time", int(self.sleep_dida_time)),
            ("stress_switch", int(self.stress_switch)),
            ("ntc_temperature", int(self.ntc_temperature)),
            ("one_sec_distance", int(self.one_sec_distance)),
            ("qual_value", int(self.qual_value)),
            ("heartrate_measure_flag", int(self.heartrate_measure_flag)),
            ("sport_state", int(self.sport_state)),
            ("static_heartrate", int(self.static_heartrate)),
            ("is_tachycardia", int(self.is_tachycardia)),
            ("spo2_motion", int(self.spo2_motion)),
            ("motor_vibration_flag", int(self.motor_vibration_flag)),
            ("power_average_sec", int(self.power_average_sec)),
            ("mets", int(self.mets)),
            ("sport_mode", int(self.sport_mode)),
            ("floors_climb", int(self.floors_climb)),
            ("lift_total", int(self.lift_total)),
            ("decent_total", int(self.decent_total)),
            ("space", int(self.space)),
            ("interval", int(self.interval)),
            ("exercise_type", int(self.exercise_type)),
        ]
    }
}

/// Full v2 payload length: header, part one, the three arrays and the tail.
#[cfg(test)]
pub(crate) const V2_LEN: usize = 11 + PART1_LEN + 20 + 18 + 3 + REST_LEN;

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DecodeContext<'static> {
        DecodeContext {
            timestamp: "t",
            unix_timestamp: 100,
            label_hr: 0x42,
            v2: true,
            offset: 0,
        }
    }

    #[test]
    fn decodes_leading_fields() {
        let mut p = vec![0u8; V2_LEN];
        p[0] = 9; // serial
        p[11] = 5; // label
        p[13..15].copy_from_slice(&1990u16.to_le_bytes());
        p[23] = 72; // heart_rate
        p[24..28].copy_from_slice(&12_345u32.to_le_bytes());
        let last = V2_LEN - 1;
        p[last] = 3; // exercise_type
        let r = BaseInfo::decode(&p, &ctx());
        assert_eq!(r.serial_number, Some(9));
        assert_eq!(r.reserved, Some([0; 10]));
        assert_eq!(r.label, 5);
        assert_eq!(r.birth_year, 1990);
        assert_eq!(r.heart_rate, 72);
        assert_eq!(r.step, 12_345);
        assert_eq!(r.exercise_type, 3);
        assert_eq!(r.label_hr, 0x42);
    }

    #[test]
    fn acc_xyz_is_signed() {
        let mut p = vec![0u8; V2_LEN];
        let at = 11 + PART1_LEN + 20;
        p[at..at + 2].copy_from_slice(&(-5i16).to_le_bytes());
        let r = BaseInfo::decode(&p, &ctx());
        assert_eq!(r.acc_xyz[0], -5);
    }

    #[test]
    fn truncated_tail_keeps_earlier_groups() {
        let mut p = vec![0u8; V2_LEN - 1];
        p[23] = 60;
        let r = BaseInfo::decode(&p, &ctx());
        assert_eq!(r.heart_rate, 60);
        assert_eq!(r.exercise_type, 0);
        assert_eq!(r.row().len(), 61);
    }
}
