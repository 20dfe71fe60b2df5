use super::records::{
    base_info::BaseInfo,
    psp::{CreekHr, PspFifo},
    sensor::{AccRaw, PpgRaw},
    tyhx::{Tyhx3697, TyhxAgc, TyhxPpg},
    wear::{MotionRecognition, WearInfo},
};

/// One output cell. Column types follow the first row's cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(String),
    Ints(Option<Vec<i64>>),
    Triples(Vec<[i64; 3]>),
}

pub fn int(v: impl Into<i64>) -> Cell {
    Cell::Int(Some(v.into()))
}

pub fn opt_int<T: Into<i64>>(v: Option<T>) -> Cell {
    Cell::Int(v.map(Into::into))
}

pub fn ints<T: Copy + Into<i64>>(v: &[T]) -> Cell {
    Cell::Ints(Some(v.iter().map(|&x| x.into()).collect()))
}

pub fn opt_ints<T: Copy + Into<i64>>(v: Option<&[T]>) -> Cell {
    Cell::Ints(v.map(|v| v.iter().map(|&x| x.into()).collect()))
}

pub type Row = Vec<(&'static str, Cell)>;

/// A decoded record of any registered layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    BaseInfo(BaseInfo),
    Acc(AccRaw),
    Ppg(PpgRaw),
    Wear(WearInfo),
    Motion(MotionRecognition),
    TyhxPpg(TyhxPpg),
    TyhxAgc(TyhxAgc),
    Tyhx3697(Tyhx3697),
    PspFifo(PspFifo),
    CreekHr(CreekHr),
}

impl Record {
    /// Column names and values in declaration order.
    pub fn row(&self) -> Row {
        match self {
            Record::BaseInfo(r) => r.row(),
            Record::Acc(r) => r.row(),
            Record::Ppg(r) => r.row(),
            Record::Wear(r) => r.row(),
            Record::Motion(r) => r.row(),
            Record::TyhxPpg(r) => r.row(),
            Record::TyhxAgc(r) => r.row(),
            Record::Tyhx3697(r) => r.row(),
            Record::PspFifo(r) => r.row(),
            Record::CreekHr(r) => r.row(),
        }
    }

    pub fn unix_timestamp(&self) -> i64 {
        match self {
            Record::BaseInfo(r) => r.unix_timestamp,
            Record::Acc(r) => r.unix_timestamp,
            Record::Ppg(r) => r.unix_timestamp,
            Record::Wear(r) => r.unix_timestamp,
            Record::Motion(r) => r.unix_timestamp,
            Record::TyhxPpg(r) => r.unix_timestamp,
            Record::TyhxAgc(r) => r.unix_timestamp,
            Record::Tyhx3697(r) => r.unix_timestamp,
            Record::PspFifo(r) => r.unix_timestamp,
            Record::CreekHr(r) => r.unix_timestamp,
        }
    }

    /// Millisecond part of the sample time, where the layout carries one.
    pub fn ms(&self) -> Option<u16> {
        match self {
            Record::Acc(r) => r.ms,
            Record::Ppg(r) => r.ms,
            Record::PspFifo(r) => r.ms,
            _ => None,
        }
    }

    /// Serial number of a mergeable fragment, `None` for v1 packets.
    pub fn serial_number(&self) -> Option<u8> {
        match self {
            Record::Acc(r) => r.serial_number,
            Record::Ppg(r) => r.serial_number,
            _ => None,
        }
    }

    /// Append `next` to `self` when both are fragments of the same sample.
    /// Hands `next` back when it starts a new sample.
    pub fn absorb(&mut self, next: Record) -> Option<Record> {
        match (self, next) {
            (Record::Acc(a), Record::Acc(b)) if a.serial_number == b.serial_number => {
                a.acc_data.extend(b.acc_data);
                a.arr_size = a.arr_size.saturating_add(b.arr_size);
                None
            }
            (Record::Ppg(a), Record::Ppg(b)) if a.serial_number == b.serial_number => {
                a.ppg_data.extend(b.ppg_data);
                a.arr_size = a.arr_size.saturating_add(b.arr_size);
                None
            }
            (_, next) => Some(next),
        }
    }
}
