//! Row iteration over delimited reference files.
//!
//! GeoNames dumps are tab-separated with no header and no quoting; the country
//! table is a plain comma-separated file. [`RowReader`] wraps a `csv` reader for
//! both and hands out [`Row`]s with typed field access. Rows that are too short
//! or not valid UTF-8 are skipped and counted instead of failing the read.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};

/// One row of a delimited file.
#[derive(Debug, Clone)]
pub struct Row {
    record: StringRecord,
}

impl Row {
    /// Number of fields in the row.
    pub fn len(&self) -> usize {
        self.record.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    /// Field `idx` as a string, empty if the column is missing.
    pub fn str(&self, idx: usize) -> &str {
        self.record.get(idx).unwrap_or("")
    }

    /// Field `idx` parsed as a decimal number.
    pub fn f64(&self, idx: usize) -> Option<f64> {
        self.str(idx).trim().parse().ok()
    }

    /// Field `idx` parsed as a non-negative integer.
    pub fn u64(&self, idx: usize) -> Option<u64> {
        self.str(idx).trim().parse().ok()
    }
}

/// Iterator over the well-formed rows of a delimited stream.
pub struct RowReader<R> {
    records: StringRecordsIntoIter<R>,
    min_columns: usize,
    skipped: usize,
    error: Option<csv::Error>,
}

impl<R: Read> RowReader<R> {
    /// Reader for GeoNames-style tab-separated dumps (no quoting).
    pub fn tab_separated(reader: R) -> Self {
        Self::with_builder(reader, ReaderBuilder::new().delimiter(b'\t').quoting(false))
    }

    /// Reader for comma-separated files with optional double-quoted fields.
    pub fn comma_separated(reader: R) -> Self {
        Self::with_builder(reader, ReaderBuilder::new().delimiter(b','))
    }

    fn with_builder(reader: R, builder: &mut ReaderBuilder) -> Self {
        let records = builder
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();
        Self {
            records,
            min_columns: 1,
            skipped: 0,
            error: None,
        }
    }

    /// Rows with fewer than `columns` fields are skipped.
    pub fn min_columns(mut self, columns: usize) -> Self {
        self.min_columns = columns;
        self
    }

    /// Number of rows skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consumes the reader, returning the skipped-row count or the stream
    /// error that ended iteration early.
    pub fn finish(self) -> Result<usize, csv::Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.skipped),
        }
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.error.is_some() {
            return None;
        }

        loop {
            match self.records.next()? {
                Ok(record) if record.len() >= self.min_columns => return Some(Row { record }),
                Ok(record) => {
                    log::debug!(
                        "skipping row at line {}: {} of {} columns",
                        record.position().map_or(0, csv::Position::line),
                        record.len(),
                        self.min_columns
                    );
                    self.skipped += 1;
                }
                Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                    self.error = Some(err);
                    return None;
                }
                Err(err) => {
                    log::debug!("skipping unreadable row: {err}");
                    self.skipped += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_typed_fields() {
        let data = "a\t1.5\t42\n";
        let row = RowReader::tab_separated(data.as_bytes()).next().unwrap();

        assert_eq!(row.len(), 3);
        assert_eq!(row.str(0), "a");
        assert_eq!(row.f64(1), Some(1.5));
        assert_eq!(row.u64(2), Some(42));
        assert_eq!(row.str(7), "");
        assert_eq!(row.u64(7), None);
    }

    #[test]
    fn garbled_numbers_are_none() {
        let row = RowReader::tab_separated("x\tabc\t-3\n".as_bytes())
            .next()
            .unwrap();
        assert_eq!(row.f64(1), None);
        assert_eq!(row.u64(2), None);
    }

    #[test]
    fn skips_short_rows() {
        let data = "a\tb\tc\nshort\nd\te\tf\n";
        let mut reader = RowReader::tab_separated(data.as_bytes()).min_columns(3);
        let rows: Vec<Row> = reader.by_ref().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].str(0), "d");
        assert_eq!(reader.skipped(), 1);
        assert_eq!(reader.finish().unwrap(), 1);
    }

    #[test]
    fn tab_rows_keep_quotes_verbatim() {
        let row = RowReader::tab_separated("\"Quoted\" name\tx\n".as_bytes())
            .next()
            .unwrap();
        assert_eq!(row.str(0), "\"Quoted\" name");
    }

    #[test]
    fn comma_rows_unquote_fields() {
        let data = "KR,\"Korea, Republic of\"\nFR,France\n";
        let rows: Vec<Row> = RowReader::comma_separated(data.as_bytes()).collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].str(1), "Korea, Republic of");
        assert_eq!(rows[1].str(0), "FR");
    }

    #[test]
    fn skips_invalid_utf8() {
        let data: &[u8] = b"ok\tyes\n\xff\xfe\tbad\nfine\tyes\n";
        let mut reader = RowReader::tab_separated(data);
        let rows: Vec<Row> = reader.by_ref().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(reader.skipped(), 1);
    }
}
