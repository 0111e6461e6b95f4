//! Record I/O seams for the extraction engine.
//!
//! The engine is agnostic to the concrete delimiter/quoting convention of
//! the dataset; it consumes any [`RecordSource`] and emits to any
//! [`RecordSink`]. The CSV adapters in [`csv`] are the production pair.

mod csv;

pub use self::csv::{
    CsvRecordSink, CsvRecordSource, DEFAULT_INPUT_DELIMITER, DEFAULT_OUTPUT_DELIMITER,
    DEFAULT_READ_BUFFER_BYTES,
};

use crate::error::Result;
use crate::types::DomainRecord;

/// One item produced by a record source.
#[derive(Debug)]
pub enum SourceItem {
    /// A well-formed record
    Record(DomainRecord),
    /// A row whose key could not be extracted; skipped by the engine
    Malformed {
        /// 1-based line number in the underlying input
        line: u64,
        /// Short parse failure description
        reason: String,
    },
}

/// Produces a lazy, finite sequence of dataset rows.
///
/// Not restartable: a fresh source must be constructed to re-scan.
pub trait RecordSource {
    /// Read the next row.
    ///
    /// `Ok(None)` means the input is exhausted. `Err` is a resource-level
    /// I/O failure; per-row parse problems come back as
    /// [`SourceItem::Malformed`] instead so the caller can skip them.
    fn read_next(&mut self) -> Result<Option<SourceItem>>;
}

/// Accepts one record at a time, durably appending each before returning.
pub trait RecordSink {
    /// Append one record and flush it to the underlying storage.
    fn write(&mut self, record: &DomainRecord) -> Result<()>;

    /// Finalize the output.
    fn close(&mut self) -> Result<()>;
}

impl<S: RecordSource + ?Sized> RecordSource for &mut S {
    fn read_next(&mut self) -> Result<Option<SourceItem>> {
        (**self).read_next()
    }
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn write(&mut self, record: &DomainRecord) -> Result<()> {
        (**self).write(record)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
