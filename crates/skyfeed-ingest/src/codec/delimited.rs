//! Delimited text reader
//!
//! Vendor CSV exports use `;` separators, a header line and windows-1251
//! text. Quoting is permissive: a stray `"` inside an unquoted field is kept
//! as a literal character.
//!
//! Rows whose field count differs from the first row are reported as
//! [`RowError`]s and reading continues with the next row.

use std::io::Cursor;

use super::text::CodePage;
use crate::pipe::{RecordPipe, RowError};

/// How to split a file into rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedOptions {
    pub delimiter: u8,
    /// Number of successfully parsed leading rows to discard
    pub skip: usize,
    /// Code page of the raw bytes; `None` means UTF-8
    pub code_page: Option<CodePage>,
}

impl DelimitedOptions {
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter,
            skip: 0,
            code_page: None,
        }
    }

    pub fn skip(mut self, rows: usize) -> Self {
        self.skip = rows;
        self
    }

    pub fn code_page(mut self, code_page: CodePage) -> Self {
        self.code_page = Some(code_page);
        self
    }
}

/// Lazy, finite sequence of parsed rows
pub struct DelimitedRows {
    reader: csv::Reader<Cursor<Vec<u8>>>,
    record: csv::StringRecord,
    to_skip: usize,
    row: u64,
    done: bool,
}

impl DelimitedRows {
    fn new(text: String, options: &DelimitedOptions) -> Self {
        let reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(false)
            .flexible(false)
            .quoting(true)
            .double_quote(true)
            .from_reader(Cursor::new(text.into_bytes()));

        Self {
            reader,
            record: csv::StringRecord::new(),
            to_skip: options.skip,
            row: 0,
            done: false,
        }
    }
}

impl Iterator for DelimitedRows {
    type Item = Result<Vec<String>, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.row += 1;
            match self.reader.read_record(&mut self.record) {
                Ok(true) if self.to_skip > 0 => {
                    self.to_skip -= 1;
                },
                Ok(true) => {
                    return Some(Ok(self.record.iter().map(str::to_string).collect()));
                },
                Ok(false) => {
                    self.done = true;
                },
                Err(e) => {
                    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                        self.done = true;
                    }
                    return Some(Err(RowError::new(self.row, e.to_string())));
                },
            }
        }
        None
    }
}

/// Split `data` into rows, decoding it with the configured code page first.
pub fn rows(data: &[u8], options: &DelimitedOptions) -> DelimitedRows {
    let text = match options.code_page {
        Some(code_page) => code_page.decode(data).into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };
    DelimitedRows::new(text, options)
}

/// Owned variant of [`rows`] that avoids copying the input.
pub fn rows_owned(data: Vec<u8>, options: &DelimitedOptions) -> DelimitedRows {
    let text = match options.code_page {
        Some(code_page) => code_page.decode_owned(data),
        None => String::from_utf8_lossy(&data).into_owned(),
    };
    DelimitedRows::new(text, options)
}

/// Rows of `data` delivered through a [`RecordPipe`].
pub fn stream(data: Vec<u8>, options: DelimitedOptions) -> RecordPipe<Vec<String>> {
    RecordPipe::spawn("delimited", move |emit| {
        for row in rows_owned(data, &options) {
            let delivered = match row {
                Ok(fields) => emit.item(fields),
                Err(e) => emit.row_error(e),
            };
            if !delivered {
                break;
            }
        }
        Ok(())
    })
}
