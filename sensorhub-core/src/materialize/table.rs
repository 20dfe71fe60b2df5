//! Column-oriented view of one channel's records, and its parquet encoding.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Array, Int64Array, Int64Builder, ListBuilder, StringArray,
};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::decode::{Cell, Record};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<String>),
    Ints(Vec<Option<Vec<i64>>>),
    Triples(Vec<Vec<[i64; 3]>>),
}

impl ColumnData {
    fn empty_like(cell: &Cell, rows: usize) -> Self {
        match cell {
            Cell::Int(_) => ColumnData::Int(Vec::with_capacity(rows)),
            Cell::Float(_) => ColumnData::Float(Vec::with_capacity(rows)),
            Cell::Text(_) => ColumnData::Text(Vec::with_capacity(rows)),
            Cell::Ints(_) => ColumnData::Ints(Vec::with_capacity(rows)),
            Cell::Triples(_) => ColumnData::Triples(Vec::with_capacity(rows)),
        }
    }

    /// Append a cell; a cell of another kind becomes a null/empty value.
    fn push(&mut self, cell: Cell) {
        match (self, cell) {
            (ColumnData::Int(v), Cell::Int(x)) => v.push(x),
            (ColumnData::Float(v), Cell::Float(x)) => v.push(x),
            (ColumnData::Text(v), Cell::Text(x)) => v.push(x),
            (ColumnData::Ints(v), Cell::Ints(x)) => v.push(x),
            (ColumnData::Triples(v), Cell::Triples(x)) => v.push(x),
            (ColumnData::Int(v), _) => v.push(None),
            (ColumnData::Float(v), _) => v.push(None),
            (ColumnData::Text(v), _) => v.push(String::new()),
            (ColumnData::Ints(v), _) => v.push(None),
            (ColumnData::Triples(v), _) => v.push(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::Ints(v) => v.len(),
            ColumnData::Triples(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_array(&self) -> ArrayRef {
        match self {
            ColumnData::Int(v) => Arc::new(Int64Array::from(v.clone())),
            ColumnData::Float(v) => Arc::new(Float64Array::from(v.clone())),
            ColumnData::Text(v) => Arc::new(StringArray::from_iter_values(v.iter())),
            ColumnData::Ints(v) => {
                let mut b = ListBuilder::new(Int64Builder::new());
                for row in v {
                    match row {
                        Some(vals) => {
                            b.values().append_slice(vals);
                            b.append(true);
                        }
                        None => b.append_null(),
                    }
                }
                Arc::new(b.finish())
            }
            ColumnData::Triples(v) => {
                let mut b = ListBuilder::new(ListBuilder::new(Int64Builder::new()));
                for row in v {
                    for t in row {
                        b.values().values().append_slice(t);
                        b.values().append(true);
                    }
                    b.append(true);
                }
                Arc::new(b.finish())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// One channel as named columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Columns follow the first record's row layout.
    pub fn from_records(records: &[Record]) -> Self {
        let Some(first) = records.first() else {
            return Self::default();
        };
        let mut columns: Vec<Column> = first
            .row()
            .iter()
            .map(|(name, cell)| Column {
                name: (*name).to_string(),
                data: ColumnData::empty_like(cell, records.len()),
            })
            .collect();
        for rec in records {
            let mut cells = rec.row().into_iter();
            for col in columns.iter_mut() {
                match cells.next() {
                    Some((_, cell)) => col.data.push(cell),
                    None => col.data.push(Cell::Int(None)),
                }
            }
        }
        Self {
            columns,
            rows: records.len(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.iter().find(|c| c.name == name).map(|c| &c.data)
    }

    /// Replace a column in place, or append it when absent.
    pub fn set_column(&mut self, name: &str, data: ColumnData) {
        debug_assert_eq!(data.len(), self.rows);
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.data = data,
            None => self.columns.push(Column {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some(col) = self.columns.iter_mut().find(|c| c.name == from) {
            col.name = to.to_string();
        }
    }

    /// `unix_timestamp + ms / 1000`, null where `ms` is null.
    pub fn add_timestamp_ms(&mut self) {
        let (Some(ColumnData::Int(ts)), Some(ColumnData::Int(ms))) =
            (self.column("unix_timestamp"), self.column("ms"))
        else {
            return;
        };
        let out = ts
            .iter()
            .zip(ms)
            .map(|(t, m)| match (t, m) {
                (Some(t), Some(m)) => Some(*t as f64 + *m as f64 / 1000.0),
                _ => None,
            })
            .collect();
        self.set_column("unix_timestamp_ms", ColumnData::Float(out));
    }

    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays: Vec<ArrayRef> = self.columns.iter().map(|c| c.data.to_array()).collect();
        let fields: Vec<Field> = self
            .columns
            .iter()
            .zip(&arrays)
            .map(|(c, a)| Field::new(c.name.as_str(), a.data_type().clone(), true))
            .collect();
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
    }

    /// Write as a snappy-compressed parquet file. Returns the file size.
    pub fn write_parquet(&self, path: &Path) -> Result<u64> {
        let batch = self.to_record_batch()?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let file = File::create(path)?;
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok(std::fs::metadata(path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::records::sensor::AccRaw;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    fn acc(ms: Option<u16>, triples: usize) -> Record {
        Record::Acc(AccRaw {
            timestamp: "t".into(),
            unix_timestamp: 100,
            serial_number: ms.map(|_| 1),
            ms,
            arr_size: triples as u32,
            acc_data: vec![[1, -2, 3]; triples],
            ..Default::default()
        })
    }

    #[test]
    fn columns_follow_record_layout() {
        let t = Table::from_records(&[acc(Some(250), 2), acc(None, 0)]);
        assert_eq!(t.rows(), 2);
        assert_eq!(t.column_names()[..3], ["timestamp", "unix_timestamp", "serial_number"]);
        assert_eq!(t.column("serial_number"), Some(&ColumnData::Int(vec![Some(1), None])));
    }

    #[test]
    fn timestamp_ms_is_null_without_ms() {
        let mut t = Table::from_records(&[acc(Some(250), 1), acc(None, 1)]);
        t.add_timestamp_ms();
        assert_eq!(
            t.column("unix_timestamp_ms"),
            Some(&ColumnData::Float(vec![Some(100.25), None]))
        );
        assert_eq!(t.columns.last().unwrap().name, "unix_timestamp_ms");
    }

    #[test]
    fn parquet_round_trips_nested_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acc.parquet");
        let mut t = Table::from_records(&[acc(Some(1), 2), acc(Some(2), 1)]);
        t.rename("acc_data", "gyro_data");
        let size = t.write_parquet(&path).unwrap();
        assert!(size > 0);

        let file = File::open(&path).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 2);
        let schema = batches[0].schema();
        assert!(schema.field_with_name("gyro_data").is_ok());
        assert!(schema.field_with_name("acc_data").is_err());
    }
}
