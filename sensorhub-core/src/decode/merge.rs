//! Recombining fragmented ACC/PPG samples.
//!
//! A device splits one large sample over several packets carrying the same
//! serial number. Fragments are only ever adjacent within their channel.

use super::record::Record;

/// Collapse runs of equal-serial fragments. Used after parallel batches are
/// concatenated, since a run may straddle a batch boundary.
pub fn merge_consecutive(items: Vec<Record>) -> Vec<Record> {
    let mut out = Vec::with_capacity(items.len());
    let mut pending = Pending::default();
    for item in items {
        pending.push(item, &mut out);
    }
    pending.flush(&mut out);
    out
}

/// One held-back fragment for streaming merges.
#[derive(Debug, Default)]
pub struct Pending {
    slot: Option<Record>,
}

impl Pending {
    /// Merge `item` into the held record or emit the held one and hold `item`.
    pub fn push(&mut self, item: Record, out: &mut Vec<Record>) {
        match self.slot.as_mut() {
            Some(held) => {
                if let Some(fresh) = held.absorb(item) {
                    if let Some(done) = self.slot.replace(fresh) {
                        out.push(done);
                    }
                }
            }
            None => self.slot = Some(item),
        }
    }

    pub fn flush(&mut self, out: &mut Vec<Record>) {
        if let Some(held) = self.slot.take() {
            out.push(held);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::records::sensor::{AccRaw, PpgRaw};

    fn acc(serial: Option<u8>, triples: usize) -> Record {
        Record::Acc(AccRaw {
            serial_number: serial,
            arr_size: triples as u32,
            acc_data: vec![[1, 2, 3]; triples],
            ..Default::default()
        })
    }

    #[test]
    fn equal_serials_merge_and_a_new_serial_flushes() {
        let merged = merge_consecutive(vec![acc(Some(5), 2), acc(Some(5), 3), acc(Some(7), 1)]);
        assert_eq!(merged.len(), 2);
        match &merged[0] {
            Record::Acc(a) => {
                assert_eq!(a.arr_size, 5);
                assert_eq!(a.acc_data.len(), 5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(merged[1].serial_number(), Some(7));
    }

    #[test]
    fn v1_fragments_without_serial_merge_together() {
        let merged = merge_consecutive(vec![acc(None, 1), acc(None, 1)]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn ppg_concatenates_samples_in_order() {
        let frag = |serial, data: Vec<i64>| {
            Record::Ppg(PpgRaw {
                serial_number: Some(serial),
                arr_size: data.len() as u32,
                ppg_data: data,
                ..Default::default()
            })
        };
        let merged = merge_consecutive(vec![frag(1, vec![1, 2]), frag(1, vec![3]), frag(2, vec![9])]);
        match &merged[0] {
            Record::Ppg(p) => assert_eq!(p.ppg_data, vec![1, 2, 3]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn streaming_matches_batch_merge() {
        let items = vec![acc(Some(1), 1), acc(Some(1), 1), acc(Some(2), 1), acc(Some(1), 1)];
        let mut out = Vec::new();
        let mut p = Pending::default();
        for i in items.clone() {
            p.push(i, &mut out);
        }
        p.flush(&mut out);
        assert_eq!(out, merge_consecutive(items));
        assert_eq!(out.len(), 3);
    }
}
