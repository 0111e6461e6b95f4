use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, SieveError};
use crate::types::DomainRecord;

use super::{RecordSink, RecordSource, SourceItem};

/// Field delimiter of the detailed dataset.
pub const DEFAULT_INPUT_DELIMITER: u8 = b';';

/// Field delimiter of the extracted output.
pub const DEFAULT_OUTPUT_DELIMITER: u8 = b',';

/// Default read buffer size for the input adapter.
pub const DEFAULT_READ_BUFFER_BYTES: usize = 64 * 1024;

/// Streaming reader over a delimited dataset file.
///
/// Rows are surfaced one at a time; quoting is unwrapped by the reader, so
/// key comparison downstream always sees the bare value. Rows with a missing
/// or empty key come back as [`SourceItem::Malformed`] rather than an error.
pub struct CsvRecordSource<R: io::Read> {
    reader: csv::Reader<R>,
}

impl CsvRecordSource<fs::File> {
    /// Open a dataset file with the default delimiter and buffer size.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, DEFAULT_INPUT_DELIMITER, DEFAULT_READ_BUFFER_BYTES)
    }

    /// Open a dataset file with an explicit delimiter and read buffer size.
    ///
    /// The buffer size only changes how much is read per syscall; streaming
    /// semantics are identical at every size.
    pub fn open_with(
        path: impl AsRef<Path>,
        delimiter: u8,
        buffer_capacity: usize,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        Ok(Self {
            reader: csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(false)
                .flexible(true)
                .buffer_capacity(buffer_capacity)
                .from_reader(file),
        })
    }
}

impl<R: io::Read> CsvRecordSource<R> {
    /// Wrap an arbitrary reader (in-memory inputs, decompressors).
    pub fn from_reader(rdr: R, delimiter: u8) -> Self {
        Self {
            reader: csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .has_headers(false)
                .flexible(true)
                .from_reader(rdr),
        }
    }
}

impl<R: io::Read> RecordSource for CsvRecordSource<R> {
    fn read_next(&mut self) -> Result<Option<SourceItem>> {
        let line = self.reader.position().line();
        let mut row = csv::StringRecord::new();
        match self.reader.read_record(&mut row) {
            Ok(false) => Ok(None),
            Ok(true) => match row.get(0) {
                Some(key) if !key.is_empty() => {
                    let fields = row.iter().skip(1).map(String::from).collect();
                    Ok(Some(SourceItem::Record(DomainRecord::new(key, fields))))
                }
                _ => Ok(Some(SourceItem::Malformed {
                    line,
                    reason: "empty key field".to_string(),
                })),
            },
            // I/O failures are fatal to the run; anything else (bad UTF-8,
            // quoting damage) is confined to the row it occurred on.
            Err(e) => match e.into_kind() {
                csv::ErrorKind::Io(io_err) => Err(SieveError::Io(io_err)),
                other => Ok(Some(SourceItem::Malformed {
                    line,
                    reason: format!("{:?}", other),
                })),
            },
        }
    }
}

/// Append-only writer for extracted records.
///
/// Every row is flushed to the underlying writer before `write` returns, so
/// a crash mid-run leaves all previously written rows durable and readable.
pub struct CsvRecordSink<W: io::Write> {
    writer: csv::Writer<W>,
}

impl CsvRecordSink<fs::File> {
    /// Create (truncate) an output file with the default delimiter.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::create_with(path, DEFAULT_OUTPUT_DELIMITER)
    }

    /// Create (truncate) an output file with an explicit delimiter.
    pub fn create_with(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let file = fs::File::create(path.as_ref())?;
        Ok(Self {
            writer: csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(file),
        })
    }
}

impl<W: io::Write> CsvRecordSink<W> {
    /// Wrap an arbitrary writer (in-memory buffers, sockets).
    pub fn from_writer(wtr: W, delimiter: u8) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(wtr),
        }
    }
}

impl<W: io::Write> RecordSink for CsvRecordSink<W> {
    fn write(&mut self, record: &DomainRecord) -> Result<()> {
        self.writer.write_record(
            std::iter::once(record.key.as_str()).chain(record.fields.iter().map(String::as_str)),
        )?;
        self.writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
