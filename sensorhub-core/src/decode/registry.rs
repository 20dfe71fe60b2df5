//! Data-type codes and the channel table that routes them to decoders.

use super::DecodeContext;
use super::record::Record;
use super::records::{
    base_info::BaseInfo,
    psp::{CreekHr, PspFifo},
    sensor::{AccRaw, PpgRaw},
    tyhx::{Tyhx3697, TyhxAgc, TyhxPpg},
    wear::{MotionRecognition, WearInfo},
};
use crate::domain::DeviceKind;

macro_rules! data_types {
    ($($variant:ident = $code:literal, $hex:literal, $name:literal, $cn:literal;)*) => {
        /// Every type code a device may emit, known to the registry or not.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum DataType {
            $($variant = $code,)*
        }

        impl DataType {
            pub const ALL: &'static [DataType] = &[$(DataType::$variant,)*];

            /// Two uppercase hex digits, as they appear on the wire.
            pub fn hex(self) -> &'static str {
                match self {
                    $(DataType::$variant => $hex,)*
                }
            }

            fn names(self) -> (&'static str, &'static str) {
                match self {
                    $(DataType::$variant => ($name, $cn),)*
                }
            }
        }
    };
}

data_types! {
    BaseInfo = 0x00, "00", "BASE_INFO", "基础信息";
    RawPpgDac = 0x14, "14", "RAW_PPG_DAC", "原始PPG DAC";
    RawPpgGreen = 0x15, "15", "RAW_PPG_GREEN", "原始PPG绿光";
    RawPpgRed = 0x16, "16", "RAW_PPG_RED", "原始PPG红光";
    RawPpgIr = 0x17, "17", "RAW_PPG_IR", "原始PPG红外";
    RawAcc = 0x18, "18", "RAW_ACC", "原始加速度";
    RawGyro = 0x19, "19", "RAW_GYRO", "原始陀螺仪";
    RawGeom = 0x1A, "1A", "RAW_GEOM", "原始地磁";
    RawPpgSar = 0x1B, "1B", "RAW_PPG_SAR", "原始PPG SAR";
    RawEcg = 0x1C, "1C", "RAW_ECG", "原始心电";
    RawEda = 0x1D, "1D", "RAW_EDA", "原始皮肤电导";
    RawBia = 0x1E, "1E", "RAW_BIA", "原始生物阻抗";
    RawUv = 0x1F, "1F", "RAW_UV", "原始紫外光感";
    RawBlue = 0x20, "20", "RAW_BLUE", "原始蓝光感";
    RawAccToPpg = 0x21, "21", "RAW_ACC_TO_PPG", "原始加速度到PPG";
    RawPpgRedIr = 0x26, "26", "RAW_PPG_RED_IR", "原始PPG红灯红外";
    RawGps = 0x32, "32", "RAW_GPS", "原始GPS";
    AmbientInfo = 0x33, "33", "AMBIENT_INFO", "环境信息";
    SleepInfo = 0x67, "67", "SLEEP_INFO", "睡眠信息";
    HrvInfo = 0x68, "68", "HRV_INFO", "心率变异性信息";
    MotionInfo = 0x69, "69", "MOTION_INFO", "运动识别";
    SwimmingInfo = 0x70, "70", "SWIMMING_INFO", "游泳信息";
    WearInfo = 0x71, "71", "WEAR_INFO", "佩戴信息";
    HeartGsenX = 0x72, "72", "HEART_GSEN_X_INFO", "心率重力感应X轴";
    HeartGsenY = 0x73, "73", "HEART_GSEN_Y_INFO", "心率重力感应Y轴";
    HeartGsenZ = 0x74, "74", "HEART_GSEN_Z_INFO", "心率重力感应Z轴";
    Vo2maxInfo = 0x75, "75", "VO2MAX_INFO", "最大摄氧量信息";
    HeartPpg1 = 0x76, "76", "HEART_PPG_1_INFO", "心率PPG1信息";
    HeartPpg2 = 0x77, "77", "HEART_PPG_2_INFO", "心率PPG2信息";
    HeartAcc = 0x78, "78", "HEART_ACC_INFO", "心率加速度信息";
    HeartAccX = 0x7A, "7A", "HEART_ACC_X_INFO", "心率加速度X轴";
    HeartAccY = 0x7B, "7B", "HEART_ACC_Y_INFO", "心率加速度Y轴";
    HeartAccZ = 0x7C, "7C", "HEART_ACC_Z_INFO", "心率加速度Z轴";
    PahData = 0x80, "80", "PAH_DATA", "PAH数据";
    TyhxData = 0x81, "81", "TYHX_DATA", "TYHX数据";
    TyhxAgcOr3697 = 0x82, "82", "TYHX_AGC_DATA", "TYHX AGC数据";
    GnssNavigation = 0x90, "90", "GNSS_NAVIGATION_DATA", "GNSS导航数据";
    GreenPsp = 0x91, "91", "GREEN_PSP_INFO", "绿光PSP信息";
    RedPsp = 0x92, "92", "RED_PSP_INFO", "红光PSP信息";
    IrPsp = 0x93, "93", "IR_PSP_INFO", "红外PSP信息";
    SleepPsp = 0x94, "94", "SLEEP_PSP_INFO", "睡眠PSP信息";
    AdiAgc = 0x95, "95", "ADI_AGC_INFO", "ADI AGC信息";
    TimePsp = 0x96, "96", "TIME_PSP_INFO", "时间PSP信息";
    HrvPsp = 0x97, "97", "HRV_PSP_INFO", "心率变异性PSP信息";
    TrainingLoad = 0x98, "98", "TRAINING_LOAD_INFO", "训练负荷信息";
    CreekHrInfo = 0x99, "99", "CREEK_HR_INFO", "CREEK心率信息";
}

impl DataType {
    /// Case-insensitive lookup of a two-digit wire code.
    pub fn from_hex(s: &str) -> Option<Self> {
        let upper = s.to_ascii_uppercase();
        Self::ALL.iter().copied().find(|t| t.hex() == upper)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// English display name; 0x82 is named after the sensor the device carries.
    pub fn name(self, device: DeviceKind) -> &'static str {
        match (self, device) {
            (DataType::TyhxAgcOr3697, DeviceKind::Ring) => "TYHX_3697_Data",
            _ => self.names().0,
        }
    }

    pub fn name_cn(self, device: DeviceKind) -> &'static str {
        match (self, device) {
            (DataType::TyhxAgcOr3697, DeviceKind::Ring) => "TYHX 3697 数据",
            _ => self.names().1,
        }
    }
}

/// How consecutive fragments of one sample are recombined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    None,
    /// Concatenate `acc_data` of equal serial numbers.
    Acc,
    /// Concatenate `ppg_data` of equal serial numbers.
    Ppg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Any,
    WatchOnly,
    RingOnly,
}

impl Variant {
    fn admits(self, device: DeviceKind) -> bool {
        match self {
            Variant::Any => true,
            Variant::WatchOnly => !device.is_ring(),
            Variant::RingOnly => device.is_ring(),
        }
    }
}

pub type DecodeFn = fn(&[u8], &DecodeContext) -> Record;

/// Everything the pipeline needs to know about one output channel.
#[derive(Debug, Clone, Copy)]
pub struct Channel {
    pub data_type: DataType,
    /// Record-list key and parquet file stem.
    pub key: &'static str,
    pub decode: DecodeFn,
    /// Whether the decoder honours the 243-field v2 header.
    pub v2: bool,
    /// Start of the layout inside the payload.
    pub offset: usize,
    pub merge: MergeStrategy,
    pub ts_ms: bool,
    pub rename: Option<(&'static str, &'static str)>,
    /// `>= 0` enables PPG de-interleaving; `0` reads the count from `data[0]`.
    pub ppg_channel_num: i64,
    pub force_channel_num: Option<i64>,
    pub variant: Variant,
}

fn base_info(p: &[u8], c: &DecodeContext) -> Record {
    Record::BaseInfo(BaseInfo::decode(p, c))
}
fn wear_info(p: &[u8], c: &DecodeContext) -> Record {
    Record::Wear(WearInfo::decode(p, c))
}
fn acc(p: &[u8], c: &DecodeContext) -> Record {
    Record::Acc(AccRaw::decode(p, c))
}
fn ppg(p: &[u8], c: &DecodeContext) -> Record {
    Record::Ppg(PpgRaw::decode(p, c))
}
fn motion(p: &[u8], c: &DecodeContext) -> Record {
    Record::Motion(MotionRecognition::decode(p, c))
}
fn tyhx_ppg(p: &[u8], c: &DecodeContext) -> Record {
    Record::TyhxPpg(TyhxPpg::decode(p, c))
}
fn tyhx_agc(p: &[u8], c: &DecodeContext) -> Record {
    Record::TyhxAgc(TyhxAgc::decode(p, c))
}
fn tyhx_3697(p: &[u8], c: &DecodeContext) -> Record {
    Record::Tyhx3697(Tyhx3697::decode(p, c))
}
fn psp_fifo(p: &[u8], c: &DecodeContext) -> Record {
    Record::PspFifo(PspFifo::decode(p, c))
}
fn creek_hr(p: &[u8], c: &DecodeContext) -> Record {
    Record::CreekHr(CreekHr::decode(p, c))
}

const fn plain(data_type: DataType, key: &'static str, decode: DecodeFn, v2: bool) -> Channel {
    Channel {
        data_type,
        key,
        decode,
        v2,
        offset: 0,
        merge: MergeStrategy::None,
        ts_ms: false,
        rename: None,
        ppg_channel_num: -1,
        force_channel_num: None,
        variant: Variant::Any,
    }
}

const fn acc_channel(data_type: DataType, key: &'static str, rename: Option<(&'static str, &'static str)>) -> Channel {
    Channel {
        merge: MergeStrategy::Acc,
        ts_ms: true,
        rename,
        ..plain(data_type, key, acc, true)
    }
}

const fn ppg_channel(data_type: DataType, key: &'static str, ppg_channel_num: i64) -> Channel {
    Channel {
        merge: MergeStrategy::Ppg,
        ts_ms: true,
        ppg_channel_num,
        ..plain(data_type, key, ppg, true)
    }
}

/// Output channels in materialization order.
pub static CHANNELS: &[Channel] = &[
    plain(DataType::BaseInfo, "base_info", base_info, true),
    plain(DataType::WearInfo, "wear_info", wear_info, true),
    acc_channel(DataType::RawAcc, "acc", None),
    acc_channel(DataType::RawGyro, "gyro", Some(("acc_data", "gyro_data"))),
    acc_channel(DataType::RawGeom, "geom", Some(("acc_data", "geom_data"))),
    ppg_channel(DataType::RawPpgGreen, "ppg_green", 0),
    ppg_channel(DataType::RawPpgRed, "ppg_red", 1),
    ppg_channel(DataType::RawPpgIr, "ppg_ir", 1),
    Channel {
        force_channel_num: Some(1),
        ..ppg_channel(DataType::RawPpgRedIr, "ppg_red_ir", 1)
    },
    ppg_channel(DataType::AmbientInfo, "ambient", 1),
    Channel {
        offset: 149,
        ..plain(DataType::MotionInfo, "motion_recognition", motion, false)
    },
    plain(DataType::TyhxData, "tyhx_data", tyhx_ppg, false),
    Channel {
        variant: Variant::WatchOnly,
        ..plain(DataType::TyhxAgcOr3697, "tyhx_agc", tyhx_agc, false)
    },
    Channel {
        variant: Variant::RingOnly,
        ..plain(DataType::TyhxAgcOr3697, "tyhx_3697", tyhx_3697, false)
    },
    plain(DataType::GreenPsp, "psp_fifo", psp_fifo, true),
    plain(DataType::CreekHrInfo, "creek_hr", creek_hr, true),
];

/// Position in [`CHANNELS`] of the channel that decodes `data_type` on `device`.
pub fn slot_for(data_type: DataType, device: DeviceKind) -> Option<usize> {
    CHANNELS
        .iter()
        .position(|ch| ch.data_type == data_type && ch.variant.admits(device))
}

pub fn channel_by_key(key: &str) -> Option<&'static Channel> {
    CHANNELS.iter().find(|ch| ch.key == key)
}

/// Dense code-to-slot table for the hot path.
#[derive(Debug, Clone)]
pub struct Dispatch {
    slots: [Option<u8>; 256],
}

impl Dispatch {
    pub fn new(device: DeviceKind) -> Self {
        let mut slots = [None; 256];
        for t in DataType::ALL {
            if let Some(i) = slot_for(*t, device) {
                slots[t.code() as usize] = Some(i as u8);
            }
        }
        Self { slots }
    }

    pub fn slot(&self, data_type: DataType) -> Option<usize> {
        self.slots[data_type.code() as usize].map(usize::from)
    }
}
