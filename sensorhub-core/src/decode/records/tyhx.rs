//! TYHX optical front-end dumps: 0x81 PPG state, 0x82 AGC (watch) or 3697 (ring).

use super::warn_truncated;
use crate::decode::DecodeContext;
use crate::decode::cursor::Cursor;
use crate::decode::record::{Cell, Row, int, ints};

/// Offset where the AGC LED block starts in a 0x81 payload.
const AGC_BLOCK_OFFSET: usize = 35;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TyhxPpg {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub green_current: u8,
    pub green2_current: u8,
    pub red_current: u8,
    pub infra_current: u8,
    pub green_offset_idac: u8,
    pub green2_offset_idac: u8,
    pub red_offset_idac: u8,
    pub infra_offset_idac: u8,
    pub infra3_current: u8,
    pub infra3_tia: u8,
    pub infra3_offset_idac: u8,
    pub heart_rate: u8,
    pub spo2: u8,
    pub hrs_alg_status: u8,
    pub living_status: u8,
    pub data_cnt: u32,
    pub hr_result: u8,
    pub cal_result: u16,
    pub hr_result_qual: u8,
    pub hr_result_std: u32,
    pub hr_mode: u8,
    pub motion: u8,
    pub motion_pow: u32,
    pub agc_flag: u8,
    pub agc_led_idac: [u16; 4],
    pub agc_amb_idac: [u16; 4],
    pub agc_led_cur: [u16; 4],
    pub agc_led_rf: [u8; 4],
    pub agc_led_step: [u32; 4],
    pub agc_cal_delay_cnt: u8,
    pub agc_state: u8,
    pub agc_buf: [i32; 8],
}

impl TyhxPpg {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload)).is_none() {
            warn_truncated("TYHX_PPG_Data", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>) -> Option<()> {
        let mut g = c.group(15)?;
        self.green_current = g.u8();
        self.green2_current = g.u8();
        self.red_current = g.u8();
        self.infra_current = g.u8();
        self.green_offset_idac = g.u8();
        self.green2_offset_idac = g.u8();
        self.red_offset_idac = g.u8();
        self.infra_offset_idac = g.u8();
        self.infra3_current = g.u8();
        self.infra3_tia = g.u8();
        self.infra3_offset_idac = g.u8();
        self.heart_rate = g.u8();
        self.spo2 = g.u8();
        self.hrs_alg_status = g.u8();
        self.living_status = g.u8();

        let mut g = c.group(18)?;
        self.data_cnt = g.u32();
        self.hr_result = g.u8();
        self.cal_result = g.u16();
        self.hr_result_qual = g.u8();
        self.hr_result_std = g.u32();
        self.hr_mode = g.u8();
        self.motion = g.u8();
        self.motion_pow = g.u32();

        self.agc_flag = c.group(1)?.u8();
        c.skip(1);
        if c.pos() != AGC_BLOCK_OFFSET {
            return None;
        }

        let mut g = c.group(28)?;
        self.agc_led_idac = g.u16s();
        self.agc_amb_idac = g.u16s();
        self.agc_led_cur = g.u16s();
        self.agc_led_rf = g.u8s();
        c.skip(2);

        let mut g = c.group(18)?;
        self.agc_led_step = g.u32s();
        self.agc_cal_delay_cnt = g.u8();
        self.agc_state = g.u8();
        c.skip(2);

        self.agc_buf = c.group(32)?.i32s();
        Some(())
    }

    pub fn row(&self) -> Row {
        let mut row = vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("green_current", int(self.green_current)),
            ("green2_current", int(self.green2_current)),
            ("red_current", int(self.red_current)),
            ("infra_current", int(self.infra_current)),
            ("green_offset_idac", int(self.green_offset_idac)),
            ("green2_offset_idac", int(self.green2_offset_idac)),
            ("red_offset_idac", int(self.red_offset_idac)),
            ("infra_offset_idac", int(self.infra_offset_idac)),
            ("infra3_current", int(self.infra3_current)),
            ("infra3_tia", int(self.infra3_tia)),
            ("infra3_offset_idac", int(self.infra3_offset_idac)),
            ("heart_rate", int(self.heart_rate)),
            ("spo2", int(self.spo2)),
            ("hrs_alg_status", int(self.hrs_alg_status)),
            ("living_status", int(self.living_status)),
            ("data_cnt", int(self.data_cnt)),
            ("hr_result", int(self.hr_result)),
            ("cal_result", int(self.cal_result)),
            ("hr_result_qual", int(self.hr_result_qual)),
            ("hr_result_std", int(self.hr_result_std)),
            ("hr_mode", int(self.hr_mode)),
            ("motion", int(self.motion)),
            ("motion_pow", int(self.motion_pow)),
            ("agc_FLAG", int(self.agc_flag)),
        ];
        const LED_IDAC: [&str; 4] = ["agc_LED0_IDAC", "agc_LED1_IDAC", "agc_LED2_IDAC", "agc_LED3_IDAC"];
        const AMB_IDAC: [&str; 4] = ["agc_AMB0_IDAC", "agc_AMB1_IDAC", "agc_AMB2_IDAC", "agc_AMB3_IDAC"];
        const LED_CUR: [&str; 4] = ["agc_LED0_CUR", "agc_LED1_CUR", "agc_LED2_CUR", "agc_LED3_CUR"];
        const LED_RF: [&str; 4] = ["agc_LED0_RF", "agc_LED1_RF", "agc_LED2_RF", "agc_LED3_RF"];
        const LED_STEP: [&str; 4] = ["agc_LED0_STEP", "agc_LED1_STEP", "agc_LED2_STEP", "agc_LED3_STEP"];
        row.extend(LED_IDAC.iter().zip(self.agc_led_idac).map(|(n, v)| (*n, int(v))));
        row.extend(AMB_IDAC.iter().zip(self.agc_amb_idac).map(|(n, v)| (*n, int(v))));
        row.extend(LED_CUR.iter().zip(self.agc_led_cur).map(|(n, v)| (*n, int(v))));
        row.extend(LED_RF.iter().zip(self.agc_led_rf).map(|(n, v)| (*n, int(v))));
        row.extend(LED_STEP.iter().zip(self.agc_led_step).map(|(n, v)| (*n, int(v))));
        row.push(("agc_CAL_DELAY_CNT", int(self.agc_cal_delay_cnt)));
        row.push(("agc_STATE", int(self.agc_state)));
        row.push(("agc_buf", ints(&self.agc_buf)));
        row
    }
}

/// 0x82 on watches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TyhxAgc {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub flag: u8,
    pub led_idac: [u16; 4],
    pub amb_idac: [u16; 4],
    pub led_cur: [u16; 4],
    pub led_rf: [u8; 4],
    pub led_step: [u32; 4],
    pub cal_delay_cnt: u8,
    pub state: u8,
    pub agc_buf: [i32; 8],
}

impl TyhxAgc {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload)).is_none() {
            warn_truncated("TYHX_AGC_Data", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>) -> Option<()> {
        self.flag = c.group(1)?.u8();
        self.led_idac = c.group(8)?.u16s();
        self.amb_idac = c.group(8)?.u16s();
        self.led_cur = c.group(8)?.u16s();
        self.led_rf = c.group(4)?.u8s();
        self.led_step = c.group(16)?.u32s();
        self.cal_delay_cnt = c.group(1)?.u8();
        self.state = c.group(1)?.u8();
        self.agc_buf = c.group(32)?.i32s();
        Some(())
    }

    pub fn row(&self) -> Row {
        let mut row = vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("flag", int(self.flag)),
        ];
        const LED_IDAC: [&str; 4] = ["led0_idac", "led1_idac", "led2_idac", "led3_idac"];
        const AMB_IDAC: [&str; 4] = ["amb0_idac", "amb1_idac", "amb2_idac", "amb3_idac"];
        const LED_CUR: [&str; 4] = ["led0_cur", "led1_cur", "led2_cur", "led3_cur"];
        const LED_RF: [&str; 4] = ["led0_rf", "led1_rf", "led2_rf", "led3_rf"];
        const LED_STEP: [&str; 4] = ["led0_step", "led1_step", "led2_step", "led3_step"];
        row.extend(LED_IDAC.iter().zip(self.led_idac).map(|(n, v)| (*n, int(v))));
        row.extend(AMB_IDAC.iter().zip(self.amb_idac).map(|(n, v)| (*n, int(v))));
        row.extend(LED_CUR.iter().zip(self.led_cur).map(|(n, v)| (*n, int(v))));
        row.extend(LED_RF.iter().zip(self.led_rf).map(|(n, v)| (*n, int(v))));
        row.extend(LED_STEP.iter().zip(self.led_step).map(|(n, v)| (*n, int(v))));
        row.push(("cal_delay_cnt", int(self.cal_delay_cnt)));
        row.push(("state", int(self.state)));
        row.push(("agc_buf", ints(&self.agc_buf)));
        row
    }
}

/// 0x82 on rings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tyhx3697 {
    pub timestamp: String,
    pub unix_timestamp: i64,
    pub cur: [u8; 8],
    pub rx1_offset: [u8; 8],
    pub rx2_offset: [u8; 8],
    pub rx1_rf: [u8; 8],
    pub rx2_rf: [u8; 8],
    pub rx1_led_step: [i32; 8],
    pub rx2_led_step: [i32; 8],
}

impl Tyhx3697 {
    pub fn decode(payload: &[u8], ctx: &DecodeContext) -> Self {
        let mut rec = Self {
            timestamp: ctx.timestamp.to_owned(),
            unix_timestamp: ctx.unix_timestamp,
            ..Default::default()
        };
        if rec.fill(&mut Cursor::new(payload)).is_none() {
            warn_truncated("TYHX_3697_Data", payload.len());
        }
        rec
    }

    fn fill(&mut self, c: &mut Cursor<'_>) -> Option<()> {
        self.cur = c.group(8)?.u8s();
        self.rx1_offset = c.group(8)?.u8s();
        self.rx2_offset = c.group(8)?.u8s();
        self.rx1_rf = c.group(8)?.u8s();
        self.rx2_rf = c.group(8)?.u8s();
        self.rx1_led_step = c.group(32)?.i32s();
        self.rx2_led_step = c.group(32)?.i32s();
        Some(())
    }

    pub fn row(&self) -> Row {
        vec![
            ("timestamp", Cell::Text(self.timestamp.clone())),
            ("unix_timestamp", int(self.unix_timestamp)),
            ("cur", ints(&self.cur)),
            ("rx1_offset", ints(&self.rx1_offset)),
            ("rx2_offset", ints(&self.rx2_offset)),
            ("rx1_rf", ints(&self.rx1_rf)),
            ("rx2_rf", ints(&self.rx2_rf)),
            ("rx1_led_step", ints(&self.rx1_led_step)),
            ("rx2_led_step", ints(&self.rx2_led_step)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> DecodeContext<'static> {
        DecodeContext {
            timestamp: "t",
            unix_timestamp: 1,
            label_hr: 0,
            v2: false,
            offset: 0,
        }
    }

    #[test]
    fn ppg_agc_block_after_padding() {
        // 15 + 18 + 1 + pad 1 + 28 + pad 2 + 18 + pad 2 + 32
        let mut p = vec![0u8; 117];
        p[11] = 64; // heart_rate
        p[33] = 1; // agc_FLAG
        p[34] = 0xee; // padding, ignored
        p[35..37].copy_from_slice(&300u16.to_le_bytes());
        p[65..69].copy_from_slice(&9u32.to_le_bytes()); // agc_LED0_STEP
        p[85..89].copy_from_slice(&(-2i32).to_le_bytes()); // agc_buf[0]
        let r = TyhxPpg::decode(&p, &ctx());
        assert_eq!(r.heart_rate, 64);
        assert_eq!(r.agc_flag, 1);
        assert_eq!(r.agc_led_idac[0], 300);
        assert_eq!(r.agc_led_step[0], 9);
        assert_eq!(r.agc_buf[0], -2);

        let names: Vec<&str> = r.row().iter().map(|(n, _)| *n).collect();
        assert_eq!(names[26], "agc_LED0_IDAC");
        assert_eq!(names.last(), Some(&"agc_buf"));
    }

    #[test]
    fn agc_layout_is_packed() {
        let mut p = vec![0u8; 79];
        p[0] = 7;
        p[1..3].copy_from_slice(&11u16.to_le_bytes());
        p[45] = 3; // cal_delay_cnt
        p[46] = 4; // state
        let r = TyhxAgc::decode(&p, &ctx());
        assert_eq!(r.flag, 7);
        assert_eq!(r.led_idac[0], 11);
        assert_eq!(r.cal_delay_cnt, 3);
        assert_eq!(r.state, 4);
    }

    #[test]
    fn ring_3697_short_payload_keeps_head() {
        let mut p = vec![0u8; 45];
        p[0] = 5;
        p[24] = 6; // rx1_rf[0]
        let r = Tyhx3697::decode(&p, &ctx());
        assert_eq!(r.cur[0], 5);
        assert_eq!(r.rx1_rf[0], 6);
        assert_eq!(r.rx1_led_step, [0; 8]);
    }
}
