//! PPG channel de-interleaving.
//!
//! Multi-LED sensors interleave their channels in `ppg_data`. The count comes
//! from the channel registry, or from `data[0]` of each packet when the
//! registry leaves it open.

use super::table::{ColumnData, Table};

/// Add `channel_num` and `ppg_data_<n>` columns. `configured > 0` pins the
/// channel count for every row.
pub fn deinterleave(table: &mut Table, configured: i64) {
    let rows = table.rows();
    if rows == 0 {
        return;
    }

    let channel_num: Vec<i64> = if configured > 0 {
        vec![configured; rows]
    } else {
        match table.column("data") {
            Some(ColumnData::Ints(data)) => data
                .iter()
                .map(|d| d.as_ref().and_then(|d| d.first().copied()).unwrap_or(1))
                .collect(),
            _ => vec![1; rows],
        }
    };
    table.set_column(
        "channel_num",
        ColumnData::Int(channel_num.iter().copied().map(Some).collect()),
    );

    let max_channel = channel_num.iter().copied().max().unwrap_or(0);
    if max_channel <= 0 {
        return;
    }
    let ppg: Vec<Option<Vec<i64>>> = match table.column("ppg_data") {
        Some(ColumnData::Ints(v)) => v.clone(),
        _ => vec![None; rows],
    };

    if channel_num.iter().all(|&c| c == 1) {
        table.set_column("ppg_data_0", ColumnData::Ints(ppg));
        return;
    }

    let width = max_channel as usize;
    let mut split: Vec<Vec<Option<Vec<i64>>>> = vec![vec![Some(Vec::new()); rows]; width];
    for (row, (&c, samples)) in channel_num.iter().zip(&ppg).enumerate() {
        if c == 1 {
            split[0][row] = samples.clone();
            continue;
        }
        if c < 2 {
            continue;
        }
        let Some(samples) = samples.as_ref().filter(|s| !s.is_empty()) else {
            continue;
        };
        let stride = c as usize;
        for (ch, col) in split.iter_mut().enumerate().take(stride.min(width)) {
            col[row] = Some(samples.iter().skip(ch).step_by(stride).copied().collect());
        }
    }
    for (ch, col) in split.into_iter().enumerate() {
        table.set_column(&format!("ppg_data_{ch}"), ColumnData::Ints(col));
    }
}

/// Overwrite `channel_num` with a fixed value, keeping its column position.
pub fn force_channel_num(table: &mut Table, value: i64) {
    let rows = table.rows();
    table.set_column("channel_num", ColumnData::Int(vec![Some(value); rows]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Record;
    use crate::decode::records::sensor::PpgRaw;

    fn ppg(channels: u8, samples: Vec<i64>) -> Record {
        Record::Ppg(PpgRaw {
            data: [channels, 0, 0, 0, 0],
            arr_size: samples.len() as u32,
            ppg_data: samples,
            ..Default::default()
        })
    }

    fn ints(t: &Table, name: &str) -> Vec<Option<Vec<i64>>> {
        match t.column(name) {
            Some(ColumnData::Ints(v)) => v.clone(),
            other => panic!("{name}: {other:?}"),
        }
    }

    #[test]
    fn single_channel_copies_samples() {
        let mut t = Table::from_records(&[ppg(1, vec![1, 2, 3])]);
        deinterleave(&mut t, 1);
        assert_eq!(ints(&t, "ppg_data_0"), vec![Some(vec![1, 2, 3])]);
        assert!(t.column("ppg_data_1").is_none());
    }

    #[test]
    fn channel_count_from_packet_header() {
        let mut t = Table::from_records(&[
            ppg(3, vec![10, 20, 30, 11, 21, 31, 12]),
            ppg(1, vec![5, 6]),
            ppg(2, vec![]),
        ]);
        deinterleave(&mut t, 0);
        assert_eq!(
            t.column("channel_num"),
            Some(&ColumnData::Int(vec![Some(3), Some(1), Some(2)]))
        );
        assert_eq!(
            ints(&t, "ppg_data_0"),
            vec![Some(vec![10, 11, 12]), Some(vec![5, 6]), Some(vec![])]
        );
        assert_eq!(ints(&t, "ppg_data_1"), vec![Some(vec![20, 21]), Some(vec![]), Some(vec![])]);
        assert_eq!(ints(&t, "ppg_data_2"), vec![Some(vec![30, 31]), Some(vec![]), Some(vec![])]);
    }

    #[test]
    fn zero_channels_stop_after_channel_num() {
        let mut t = Table::from_records(&[ppg(0, vec![1])]);
        deinterleave(&mut t, 0);
        assert!(t.column("channel_num").is_some());
        assert!(t.column("ppg_data_0").is_none());
    }

    #[test]
    fn forced_value_keeps_position() {
        let mut t = Table::from_records(&[ppg(2, vec![1, 2])]);
        deinterleave(&mut t, 1);
        let pos = t.column_names().iter().position(|n| n == "channel_num");
        force_channel_num(&mut t, 1);
        assert_eq!(t.column_names().iter().position(|n| n == "channel_num"), pos);
    }
}
