//! dBase III table reader
//!
//! Tables are small enough to hold in memory, so the reader works over a
//! byte buffer and decodes records on demand.
//!
//! # Layout
//!
//! ```text
//! 0       version (0x03)
//! 1..4    last update, YY MM DD
//! 4..8    record count, u32 LE
//! 8..10   header length, u16 LE
//! 10..12  record length, u16 LE
//! 32..    32-byte field descriptors, terminated by 0x0D
//! header  records: 1 flag byte (' ' live, '*' deleted) + fixed-width fields
//! ```

use bytes::Bytes;
use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

use super::text::CodePage;
use crate::pipe::{RecordPipe, RowError};

const SUPPORTED_VERSION: u8 = 0x03;
const HEADER_SIZE: usize = 32;
const DESCRIPTOR_SIZE: usize = 32;
const DESCRIPTOR_TERMINATOR: u8 = 0x0D;

const FLAG_LIVE: u8 = b' ';
const FLAG_DELETED: u8 = b'*';

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DbfError {
    #[error("unsupported DBF version 0x{0:02x}")]
    UnsupportedVersion(u8),

    #[error("invalid DBF header: {0}")]
    InvalidHeader(String),

    #[error("record {0} is deleted")]
    RecordDeleted(usize),

    #[error("record {0} is past the end of the table")]
    EndOfTable(usize),

    #[error("record {index} has unexpected flag byte 0x{flag:02x}")]
    UnexpectedFlag { index: usize, flag: u8 },

    #[error("field {field}: cannot parse '{value}'")]
    InvalidField { field: String, value: String },
}

/// Column definition from the table header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Type letter: C, N, F, I, B, D, L, ...
    pub kind: char,
    pub length: usize,
    pub decimals: u8,
}

/// Decoded value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Date(Option<NaiveDate>),
    Logical(bool),
    Raw(Vec<u8>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view; text is parsed leniently.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }
}

/// Field name to value map for one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbfRecord {
    values: HashMap<String, FieldValue>,
}

impl DbfRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Text of a field, or `""` when absent or not text.
    pub fn text(&self, field: &str) -> &str {
        self.get(field).and_then(FieldValue::as_str).unwrap_or_default()
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Header {
    year: u8,
    month: u8,
    day: u8,
    record_count: usize,
    header_length: usize,
    record_length: usize,
}

/// An in-memory dBase III table
#[derive(Debug, Clone)]
pub struct DbfTable {
    data: Bytes,
    header: Header,
    fields: Vec<FieldDescriptor>,
    code_page: CodePage,
}

impl DbfTable {
    /// Validate the header and read the field descriptors.
    pub fn parse(data: impl Into<Bytes>, code_page: CodePage) -> Result<Self, DbfError> {
        let data = data.into();
        if data.len() < HEADER_SIZE {
            return Err(DbfError::InvalidHeader(format!(
                "need {} bytes, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }

        if data[0] != SUPPORTED_VERSION {
            return Err(DbfError::UnsupportedVersion(data[0]));
        }

        let header = Header {
            year: data[1],
            month: data[2],
            day: data[3],
            record_count: u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize,
            header_length: u16::from_le_bytes([data[8], data[9]]) as usize,
            record_length: u16::from_le_bytes([data[10], data[11]]) as usize,
        };

        if header.header_length < HEADER_SIZE + 1 || header.header_length > data.len() {
            return Err(DbfError::InvalidHeader(format!(
                "header length {} out of range",
                header.header_length
            )));
        }

        let fields = parse_descriptors(&data, header.header_length)?;

        let width: usize = 1 + fields.iter().map(|f| f.length).sum::<usize>();
        if width > header.record_length {
            return Err(DbfError::InvalidHeader(format!(
                "fields need {} bytes but records hold {}",
                width, header.record_length
            )));
        }

        let body = header
            .record_count
            .checked_mul(header.record_length)
            .and_then(|n| n.checked_add(header.header_length));
        if !matches!(body, Some(end) if end <= data.len()) {
            return Err(DbfError::InvalidHeader(format!(
                "{} records of {} bytes do not fit in {} bytes",
                header.record_count,
                header.record_length,
                data.len()
            )));
        }

        Ok(Self {
            data,
            header,
            fields,
            code_page,
        })
    }

    pub fn record_count(&self) -> usize {
        self.header.record_count
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Date of the last update recorded in the header.
    pub fn modified(&self) -> Option<NaiveDate> {
        // Years since 1900; some writers store two digits instead.
        let year = i32::from(self.header.year);
        let year = if year < 80 { 2000 + year } else { 1900 + year };
        NaiveDate::from_ymd_opt(year, u32::from(self.header.month), u32::from(self.header.day))
    }

    /// Decode record `index`.
    ///
    /// Deleted records yield [`DbfError::RecordDeleted`] and indexes past the
    /// record count yield [`DbfError::EndOfTable`].
    pub fn record(&self, index: usize) -> Result<DbfRecord, DbfError> {
        if index >= self.header.record_count {
            return Err(DbfError::EndOfTable(index));
        }

        let start = self.header.header_length + index * self.header.record_length;
        let end = start + self.header.record_length;
        let raw = self.data.get(start..end).ok_or_else(|| {
            DbfError::InvalidHeader(format!("record {} is truncated", index))
        })?;

        match raw[0] {
            FLAG_LIVE => {},
            FLAG_DELETED => return Err(DbfError::RecordDeleted(index)),
            flag => return Err(DbfError::UnexpectedFlag { index, flag }),
        }

        let mut values = HashMap::with_capacity(self.fields.len());
        let mut offset = 1;
        for field in &self.fields {
            let value = self.parse_field(field, &raw[offset..offset + field.length])?;
            offset += field.length;
            values.insert(field.name.clone(), value);
        }

        Ok(DbfRecord { values })
    }

    /// Live records in order; deleted ones are skipped.
    pub fn rows(&self) -> impl Iterator<Item = Result<DbfRecord, DbfError>> + '_ {
        self.indexed_rows().map(|(_, record)| record)
    }

    /// Live records with their position in the table.
    pub fn indexed_rows(&self) -> impl Iterator<Item = (usize, Result<DbfRecord, DbfError>)> + '_ {
        (0..self.header.record_count)
            .map(|index| (index, self.record(index)))
            .filter(|(_, r)| !matches!(r, Err(DbfError::RecordDeleted(_))))
    }

    /// Live records delivered through a [`RecordPipe`].
    ///
    /// Records that fail to decode become row errors.
    pub fn into_pipe(self) -> RecordPipe<DbfRecord> {
        RecordPipe::spawn("dbf", move |emit| {
            for (index, record) in self.indexed_rows() {
                let delivered = match record {
                    Ok(record) => emit.item(record),
                    Err(e) => emit.row_error(RowError::new(index as u64 + 1, e.to_string())),
                };
                if !delivered {
                    break;
                }
            }
            Ok(())
        })
    }

    fn parse_field(&self, field: &FieldDescriptor, raw: &[u8]) -> Result<FieldValue, DbfError> {
        let invalid = || DbfError::InvalidField {
            field: field.name.clone(),
            value: String::from_utf8_lossy(raw).into_owned(),
        };

        let value = match field.kind {
            'C' => {
                let text = self.code_page.decode(raw);
                FieldValue::Text(text.trim_end_matches(|c: char| c == ' ' || c == '\0').to_string())
            },
            'N' if field.decimals == 0 => {
                let text = ascii_trim(raw);
                if text.is_empty() {
                    FieldValue::Integer(0)
                } else {
                    FieldValue::Integer(text.parse().map_err(|_| invalid())?)
                }
            },
            'N' | 'F' => {
                let text = ascii_trim(raw);
                if text.is_empty() {
                    FieldValue::Float(0.0)
                } else {
                    FieldValue::Float(text.parse().map_err(|_| invalid())?)
                }
            },
            'I' => {
                let bytes: [u8; 4] = raw.get(..4).and_then(|b| b.try_into().ok()).ok_or_else(invalid)?;
                FieldValue::Integer(i64::from(i32::from_le_bytes(bytes)))
            },
            'B' => {
                let bytes: [u8; 8] = raw.get(..8).and_then(|b| b.try_into().ok()).ok_or_else(invalid)?;
                FieldValue::Float(f64::from_le_bytes(bytes))
            },
            'D' => {
                let text = ascii_trim(raw);
                if text.is_empty() {
                    FieldValue::Date(None)
                } else {
                    let date = NaiveDate::parse_from_str(&text, "%Y%m%d").map_err(|_| invalid())?;
                    FieldValue::Date(Some(date))
                }
            },
            'L' => FieldValue::Logical(matches!(raw.first(), Some(b't' | b'T' | b'y' | b'Y' | b'1'))),
            _ => FieldValue::Raw(raw.to_vec()),
        };

        Ok(value)
    }
}

fn parse_descriptors(data: &[u8], header_length: usize) -> Result<Vec<FieldDescriptor>, DbfError> {
    let count = (header_length - 1 - HEADER_SIZE) / DESCRIPTOR_SIZE;
    let mut fields = Vec::with_capacity(count);

    for i in 0..count {
        let start = HEADER_SIZE + i * DESCRIPTOR_SIZE;
        let descriptor = &data[start..start + DESCRIPTOR_SIZE];
        if descriptor[0] == DESCRIPTOR_TERMINATOR {
            break;
        }

        let name_end = descriptor[..11].iter().position(|&b| b == 0).unwrap_or(11);
        let name = String::from_utf8_lossy(&descriptor[..name_end]).trim().to_string();
        if name.is_empty() {
            return Err(DbfError::InvalidHeader(format!("field {} has no name", i)));
        }

        fields.push(FieldDescriptor {
            name,
            kind: char::from(descriptor[11]),
            length: usize::from(descriptor[16]),
            decimals: descriptor[17],
        });
    }

    Ok(fields)
}

fn ascii_trim(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod tests {
    use super::*;
    use crate::pipe::PipeItem;

    /// Build a table in memory: `fields` are (name, type, length, decimals),
    /// `records` are (flag, raw field bytes).
    pub(crate) fn build_table(fields: &[(&str, u8, u8, u8)], records: &[(u8, Vec<Vec<u8>>)]) -> Vec<u8> {
        let header_length = HEADER_SIZE + fields.len() * DESCRIPTOR_SIZE + 1;
        let record_length = 1 + fields.iter().map(|f| usize::from(f.2)).sum::<usize>();

        let mut out = vec![0u8; HEADER_SIZE];
        out[0] = SUPPORTED_VERSION;
        out[1] = 124;
        out[2] = 3;
        out[3] = 15;
        out[4..8].copy_from_slice(&(records.len() as u32).to_le_bytes());
        out[8..10].copy_from_slice(&(header_length as u16).to_le_bytes());
        out[10..12].copy_from_slice(&(record_length as u16).to_le_bytes());

        for (name, kind, length, decimals) in fields {
            let mut descriptor = [0u8; DESCRIPTOR_SIZE];
            descriptor[..name.len()].copy_from_slice(name.as_bytes());
            descriptor[11] = *kind;
            descriptor[16] = *length;
            descriptor[17] = *decimals;
            out.extend_from_slice(&descriptor);
        }
        out.push(DESCRIPTOR_TERMINATOR);

        for (flag, values) in records {
            out.push(*flag);
            for (value, field) in values.iter().zip(fields) {
                let mut cell = value.clone();
                cell.resize(usize::from(field.2), b' ');
                out.extend_from_slice(&cell);
            }
        }
        out.push(0x1A);
        out
    }

    fn sample() -> DbfTable {
        let fields = [
            ("NAME", b'C', 10, 0),
            ("QTY", b'N', 5, 0),
            ("PRICE", b'N', 8, 2),
            ("DUE", b'D', 8, 0),
            ("OK", b'L', 1, 0),
        ];
        let records = vec![
            (
                b' ',
                vec![
                    vec![0x80, 0xAF, 0xE2, 0xA5, 0xAA, 0xA0],
                    b"   12".to_vec(),
                    b"   34.50".to_vec(),
                    b"20240315".to_vec(),
                    b"T".to_vec(),
                ],
            ),
            (
                b'*',
                vec![b"gone".to_vec(), b"1".to_vec(), b"1".to_vec(), b"".to_vec(), b"F".to_vec()],
            ),
            (
                b' ',
                vec![b"Aspirin".to_vec(), b"".to_vec(), b"".to_vec(), b"".to_vec(), b"n".to_vec()],
            ),
        ];
        DbfTable::parse(build_table(&fields, &records), CodePage::Cp866).unwrap()
    }

    #[test]
    fn test_header() {
        let table = sample();
        assert_eq!(table.record_count(), 3);
        assert_eq!(table.field_names(), vec!["NAME", "QTY", "PRICE", "DUE", "OK"]);
        assert_eq!(table.fields()[2].decimals, 2);
        assert_eq!(table.modified(), NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn test_record_values() {
        let table = sample();
        let record = table.record(0).unwrap();
        assert_eq!(record.text("NAME"), "Аптека");
        assert_eq!(record.get("QTY"), Some(&FieldValue::Integer(12)));
        assert_eq!(record.number("PRICE"), Some(34.5));
        assert_eq!(
            record.get("DUE"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 15)))
        );
        assert_eq!(record.get("OK"), Some(&FieldValue::Logical(true)));
    }

    #[test]
    fn test_blank_fields() {
        let record = sample().record(2).unwrap();
        assert_eq!(record.get("QTY"), Some(&FieldValue::Integer(0)));
        assert_eq!(record.get("PRICE"), Some(&FieldValue::Float(0.0)));
        assert_eq!(record.get("DUE"), Some(&FieldValue::Date(None)));
        assert_eq!(record.get("OK"), Some(&FieldValue::Logical(false)));
    }

    #[test]
    fn test_control_signals() {
        let table = sample();
        assert_eq!(table.record(1), Err(DbfError::RecordDeleted(1)));
        assert_eq!(table.record(3), Err(DbfError::EndOfTable(3)));
    }

    #[test]
    fn test_rows_skip_deleted() {
        let table = sample();
        let names: Vec<String> = table
            .rows()
            .map(|r| r.unwrap().text("NAME").to_string())
            .collect();
        assert_eq!(names, vec!["Аптека", "Aspirin"]);
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = build_table(&[("A", b'C', 1, 0)], &[]);
        data[0] = 0x30;
        assert!(matches!(
            DbfTable::parse(data, CodePage::Cp866),
            Err(DbfError::UnsupportedVersion(0x30))
        ));
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(
            DbfTable::parse(vec![0x03, 0, 0], CodePage::Cp866),
            Err(DbfError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_unexpected_flag() {
        let data = build_table(&[("A", b'C', 1, 0)], &[(b'?', vec![b"x".to_vec()])]);
        let table = DbfTable::parse(data, CodePage::Cp866).unwrap();
        assert_eq!(
            table.record(0),
            Err(DbfError::UnexpectedFlag { index: 0, flag: b'?' })
        );
    }

    #[test]
    fn test_invalid_numeric() {
        let data = build_table(&[("N", b'N', 4, 0)], &[(b' ', vec![b"12a".to_vec()])]);
        let table = DbfTable::parse(data, CodePage::Cp866).unwrap();
        assert!(matches!(table.record(0), Err(DbfError::InvalidField { .. })));
    }

    #[test]
    fn test_binary_fields() {
        let data = build_table(
            &[("I", b'I', 4, 0), ("B", b'B', 8, 0), ("M", b'M', 2, 0)],
            &[(
                b' ',
                vec![(-7i32).to_le_bytes().to_vec(), 2.25f64.to_le_bytes().to_vec(), b"ab".to_vec()],
            )],
        );
        let record = DbfTable::parse(data, CodePage::Cp866).unwrap().record(0).unwrap();
        assert_eq!(record.get("I"), Some(&FieldValue::Integer(-7)));
        assert_eq!(record.get("B"), Some(&FieldValue::Float(2.25)));
        assert_eq!(record.get("M"), Some(&FieldValue::Raw(b"ab".to_vec())));
    }

    #[test]
    fn test_record_count_beyond_data() {
        let mut data = build_table(&[("A", b'C', 1, 0)], &[(b' ', vec![b"x".to_vec()])]);
        data[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            DbfTable::parse(data, CodePage::Cp866),
            Err(DbfError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_modified_year_offsets() {
        let mut data = build_table(&[("A", b'C', 1, 0)], &[]);
        data[1] = 99;
        let table = DbfTable::parse(data.clone(), CodePage::Cp866).unwrap();
        assert_eq!(table.modified(), NaiveDate::from_ymd_opt(1999, 3, 15));

        data[1] = 100;
        let table = DbfTable::parse(data.clone(), CodePage::Cp866).unwrap();
        assert_eq!(table.modified(), NaiveDate::from_ymd_opt(2000, 3, 15));

        data[1] = 5;
        let table = DbfTable::parse(data, CodePage::Cp866).unwrap();
        assert_eq!(table.modified(), NaiveDate::from_ymd_opt(2005, 3, 15));
    }

    #[tokio::test]
    async fn test_row_error_numbers_count_deleted_records() {
        let data = build_table(
            &[("N", b'N', 3, 0)],
            &[(b'*', vec![b"1".to_vec()]), (b' ', vec![b"2".to_vec()]), (b' ', vec![b"x".to_vec()])],
        );
        let mut pipe = DbfTable::parse(data, CodePage::Cp866).unwrap().into_pipe();

        assert!(matches!(pipe.next().await, Some(PipeItem::Item(_))));
        match pipe.next().await {
            Some(PipeItem::RowError(e)) => assert_eq!(e.row, 3),
            other => panic!("expected row error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_into_pipe() {
        let records = sample().into_pipe().try_collect().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("NAME"), "Aspirin");
    }
}
