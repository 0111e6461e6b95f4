//! Domain Sieve - memory-bounded extraction of domain records
//!
//! This library streams a very large delimited dataset of domain records and
//! extracts the rows whose domain name belongs to a caller-supplied target
//! set, writing matches to an output file as they are found:
//! - Single sequential pass, one record in memory at a time
//! - Early exit once every target key has been observed
//! - Per-record write-then-flush durability (a crash keeps what was written)
//! - Cooperative cancellation between records
//! - Catalog client for fetching technology domain lists over HTTP
//!
//! # Example
//!
//! ```rust
//! use domain_sieve::{
//!     CsvRecordSink, CsvRecordSource, ExtractionEngine, TargetSet, TerminationReason,
//! };
//!
//! let input = "\
//! alpha.com;ns1.alpha.com;1.2.3.4;US
//! beta.org;ns1.beta.org;5.6.7.8;DE
//! gamma.net;ns1.gamma.net;9.9.9.9;FR
//! ";
//!
//! let mut targets = TargetSet::from_keys(["alpha.com", "beta.org"]);
//! let source = CsvRecordSource::from_reader(input.as_bytes(), b';');
//! let sink = CsvRecordSink::from_writer(Vec::new(), b',');
//!
//! let engine = ExtractionEngine::new();
//! let report = engine.run(&mut targets, source, sink);
//!
//! assert_eq!(report.matched, 2);
//! assert!(matches!(report.reason, TerminationReason::AllKeysFound));
//! assert!(report.missing_keys.is_empty());
//! ```
//!
//! # Input format
//!
//! The dataset is delimited text, one record per row:
//!
//! | Column | Meaning |
//! |--------|---------|
//! | 1 | Domain name (the matching key) |
//! | 2.. | Opaque auxiliary fields, passed through unmodified |
//!
//! Fields may be quote-wrapped as a delimiter-escaping mechanism; matching
//! always operates on the unwrapped value, and output rows are emitted
//! unwrapped with the output delimiter.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod record;
pub mod target;
pub mod types;

// Re-export commonly used items
pub use engine::{EngineOptions, ExtractionEngine, DEFAULT_PROGRESS_INTERVAL};
pub use error::{CatalogErrorKind, Result, SieveError};
pub use record::{
    CsvRecordSink, CsvRecordSource, RecordSink, RecordSource, SourceItem,
    DEFAULT_INPUT_DELIMITER, DEFAULT_OUTPUT_DELIMITER, DEFAULT_READ_BUFFER_BYTES,
};
pub use target::TargetSet;
pub use types::{AbortCause, DomainRecord, ExtractionReport, TerminationReason};
