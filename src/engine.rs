//! Extraction engine.
//!
//! One run is a single streaming pass over a record source: every record
//! whose key is in the target set is written to the sink immediately, and
//! the scan stops at the earliest point where no further required match can
//! exist. The input may be orders of magnitude larger than the target set,
//! so stopping early matters; processing stays strictly in input order
//! because the stopping point is only well-defined for an in-order scan.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::record::{RecordSink, RecordSource, SourceItem};
use crate::target::TargetSet;
use crate::types::{AbortCause, ExtractionReport, TerminationReason};

/// Default number of matches between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Engine tuning options.
pub struct EngineOptions {
    /// Log a progress line every this many matches (0 disables)
    pub progress_interval: u64,
    /// Cooperative cancellation flag, checked between records
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancel: None,
        }
    }
}

impl EngineOptions {
    /// Create default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress logging interval (matches per line, 0 disables).
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Set the cancellation flag checked between records.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }
}

/// Single-pass, memory-bounded record extraction.
///
/// The engine holds no per-run state; re-invoking `run` with a fresh target
/// set, source and sink is always valid.
pub struct ExtractionEngine {
    options: EngineOptions,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionEngine {
    /// Create an engine with default options.
    pub fn new() -> Self {
        Self {
            options: EngineOptions::default(),
        }
    }

    /// Create an engine with explicit options.
    pub fn with_options(options: EngineOptions) -> Self {
        Self { options }
    }

    fn cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Run one extraction: stream `source`, write every record whose key is
    /// in `targets` to `sink`, stop as soon as the outcome cannot change.
    ///
    /// The sink is flushed and closed on every exit path. Failures are
    /// reported through [`ExtractionReport::reason`]; records written before
    /// an abort stay durable in the sink.
    pub fn run(
        &self,
        targets: &mut TargetSet,
        mut source: impl RecordSource,
        mut sink: impl RecordSink,
    ) -> ExtractionReport {
        let mut matched: u64 = 0;
        let mut records_read: u64 = 0;
        let mut skipped: u64 = 0;

        debug!(targets = targets.len(), "starting extraction scan");

        let reason = loop {
            if self.cancelled() {
                info!("cancellation requested, stopping scan");
                break TerminationReason::Aborted(AbortCause::Cancelled);
            }

            let item = match source.read_next() {
                Ok(Some(item)) => item,
                Ok(None) => break TerminationReason::InputExhausted,
                Err(e) => break TerminationReason::Aborted(AbortCause::Io(e)),
            };

            let record = match item {
                SourceItem::Record(record) => record,
                SourceItem::Malformed { line, reason } => {
                    skipped += 1;
                    warn!(line, %reason, "skipping malformed record");
                    continue;
                }
            };

            records_read += 1;
            if !targets.contains(&record.key) {
                continue;
            }

            // Emit before marking: duplicate-key rows are pass-through at
            // record level even though they count once toward completion.
            if let Err(e) = sink.write(&record) {
                break TerminationReason::Aborted(AbortCause::Io(e));
            }
            matched += 1;
            targets.mark_found(&record.key);

            if self.options.progress_interval > 0 && matched % self.options.progress_interval == 0
            {
                info!(
                    matched,
                    found = targets.found_count(),
                    targets = targets.len(),
                    "extraction progress"
                );
            }

            if targets.is_complete() {
                info!(matched, "all target keys found, stopping scan");
                break TerminationReason::AllKeysFound;
            }
        };

        // The sink must be finalized on every exit path. A close failure
        // after an orderly scan is itself an I/O abort; after an abort the
        // original cause wins.
        let reason = match sink.close() {
            Ok(()) => reason,
            Err(e) => match reason {
                TerminationReason::Aborted(_) => reason,
                _ => TerminationReason::Aborted(AbortCause::Io(e)),
            },
        };

        ExtractionReport {
            matched,
            records_read,
            skipped,
            missing_keys: targets.missing_keys(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SieveError;
    use crate::types::DomainRecord;
    use std::collections::VecDeque;

    /// In-memory source that counts reads and can fail at a given position.
    struct StubSource {
        items: VecDeque<SourceItem>,
        fail_after: Option<u64>,
        reads: u64,
    }

    impl StubSource {
        fn records(keys: &[&str]) -> Self {
            Self {
                items: keys
                    .iter()
                    .map(|k| {
                        SourceItem::Record(DomainRecord::new(*k, vec!["ns".into(), "US".into()]))
                    })
                    .collect(),
                fail_after: None,
                reads: 0,
            }
        }

        fn with_items(items: Vec<SourceItem>) -> Self {
            Self {
                items: items.into(),
                fail_after: None,
                reads: 0,
            }
        }

        fn failing_after(mut self, reads: u64) -> Self {
            self.fail_after = Some(reads);
            self
        }
    }

    impl RecordSource for StubSource {
        fn read_next(&mut self) -> crate::error::Result<Option<SourceItem>> {
            if self.fail_after == Some(self.reads) {
                return Err(SieveError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "read failed",
                )));
            }
            self.reads += 1;
            Ok(self.items.pop_front())
        }
    }

    /// In-memory sink that records writes and can fail on demand.
    #[derive(Default)]
    struct StubSink {
        rows: Vec<DomainRecord>,
        closed: bool,
        fail_on_write: Option<usize>,
        fail_on_close: bool,
    }

    impl RecordSink for StubSink {
        fn write(&mut self, record: &DomainRecord) -> crate::error::Result<()> {
            if self.fail_on_write == Some(self.rows.len()) {
                return Err(SieveError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "write failed",
                )));
            }
            self.rows.push(record.clone());
            Ok(())
        }

        fn close(&mut self) -> crate::error::Result<()> {
            self.closed = true;
            if self.fail_on_close {
                return Err(SieveError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "close failed",
                )));
            }
            Ok(())
        }
    }

    #[test]
    fn test_early_exit_with_duplicate_key() {
        // Input keys [a, b, a, c, d], targets {a, c}: the duplicate 'a' row
        // is still emitted, and the scan stops right after 'c' without
        // touching 'd'.
        let mut source = StubSource::records(&["a.com", "b.com", "a.com", "c.com", "d.com"]);
        let mut sink = StubSink::default();
        let mut targets = TargetSet::from_keys(["a.com", "c.com"]);

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(report.matched, 3);
        let keys: Vec<&str> = sink.rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a.com", "a.com", "c.com"]);
        assert!(matches!(report.reason, TerminationReason::AllKeysFound));
        assert!(report.missing_keys.is_empty());
        assert_eq!(source.reads, 4, "must not read past the completing record");
        assert!(sink.closed);
    }

    #[test]
    fn test_no_match_exhausts_input() {
        let mut source = StubSource::records(&["x.com", "y.com", "z.com"]);
        let mut sink = StubSink::default();
        let mut targets = TargetSet::from_keys(["a.com"]);

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(report.matched, 0);
        assert!(sink.rows.is_empty());
        assert!(matches!(report.reason, TerminationReason::InputExhausted));
        assert_eq!(report.missing_keys, vec!["a.com"]);
    }

    #[test]
    fn test_empty_target_set_reads_everything() {
        let mut source = StubSource::records(&["x.com", "y.com"]);
        let mut sink = StubSink::default();
        let mut targets = TargetSet::from_keys(Vec::<String>::new());

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(report.matched, 0);
        assert_eq!(report.records_read, 2);
        // An empty set can never reach completion, so this is always input
        // exhaustion, never AllKeysFound.
        assert!(matches!(report.reason, TerminationReason::InputExhausted));
    }

    #[test]
    fn test_malformed_rows_skipped_not_fatal() {
        let mut source = StubSource::with_items(vec![
            SourceItem::Record(DomainRecord::new("a.com", vec![])),
            SourceItem::Malformed {
                line: 2,
                reason: "empty key field".into(),
            },
            SourceItem::Record(DomainRecord::new("b.com", vec![])),
        ]);
        let mut sink = StubSink::default();
        let mut targets = TargetSet::from_keys(["a.com", "b.com"]);

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(report.matched, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.records_read, 2);
        assert!(matches!(report.reason, TerminationReason::AllKeysFound));
    }

    #[test]
    fn test_read_failure_aborts_and_closes_sink() {
        let mut source =
            StubSource::records(&["a.com", "b.com", "c.com"]).failing_after(1);
        let mut sink = StubSink::default();
        let mut targets = TargetSet::from_keys(["a.com", "c.com"]);

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(report.matched, 1, "match before the failure stays written");
        assert_eq!(sink.rows.len(), 1);
        assert!(matches!(
            report.reason,
            TerminationReason::Aborted(AbortCause::Io(_))
        ));
        assert!(sink.closed, "sink must be closed on the abort path");
        assert_eq!(report.missing_keys, vec!["c.com"]);
    }

    #[test]
    fn test_write_failure_aborts() {
        let mut source = StubSource::records(&["a.com", "b.com"]);
        let mut sink = StubSink {
            fail_on_write: Some(1),
            ..Default::default()
        };
        let mut targets = TargetSet::from_keys(["a.com", "b.com"]);

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(report.matched, 1);
        assert!(matches!(
            report.reason,
            TerminationReason::Aborted(AbortCause::Io(_))
        ));
        assert!(sink.closed);
    }

    #[test]
    fn test_close_failure_downgrades_orderly_run() {
        let mut source = StubSource::records(&["a.com"]);
        let mut sink = StubSink {
            fail_on_close: true,
            ..Default::default()
        };
        let mut targets = TargetSet::from_keys(["a.com"]);

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(report.matched, 1);
        assert!(matches!(
            report.reason,
            TerminationReason::Aborted(AbortCause::Io(_))
        ));
    }

    #[test]
    fn test_cancellation_before_first_read() {
        let flag = Arc::new(AtomicBool::new(true));
        let mut source = StubSource::records(&["a.com"]);
        let mut sink = StubSink::default();
        let mut targets = TargetSet::from_keys(["a.com"]);

        let engine = ExtractionEngine::with_options(
            EngineOptions::new().with_cancel_flag(Arc::clone(&flag)),
        );
        let report = engine.run(&mut targets, &mut source, &mut sink);

        assert_eq!(source.reads, 0);
        assert_eq!(report.matched, 0);
        assert!(matches!(
            report.reason,
            TerminationReason::Aborted(AbortCause::Cancelled)
        ));
        assert!(sink.closed, "cancelled run still finalizes the sink");
    }

    #[test]
    fn test_engine_reusable_across_runs() {
        let engine = ExtractionEngine::new();

        let mut targets = TargetSet::from_keys(["a.com"]);
        let mut sink = StubSink::default();
        let report = engine.run(
            &mut targets,
            StubSource::records(&["a.com", "b.com"]),
            &mut sink,
        );
        assert_eq!(report.matched, 1);

        // Second run with fresh state sees no residue from the first.
        let mut targets = TargetSet::from_keys(["b.com"]);
        let mut sink = StubSink::default();
        let report = engine.run(
            &mut targets,
            StubSource::records(&["a.com", "b.com"]),
            &mut sink,
        );
        assert_eq!(report.matched, 1);
        assert_eq!(sink.rows[0].key, "b.com");
        assert!(matches!(report.reason, TerminationReason::AllKeysFound));
    }

    #[test]
    fn test_matched_set_is_exact() {
        // Keys in the output are exactly the target keys present in the
        // input: nothing missing, nothing spurious.
        let mut source =
            StubSource::records(&["a.com", "n1.com", "b.com", "n2.com", "a.com"]);
        let mut sink = StubSink::default();
        let mut targets = TargetSet::from_keys(["a.com", "b.com", "absent.com"]);

        let engine = ExtractionEngine::new();
        let report = engine.run(&mut targets, &mut source, &mut sink);

        let mut seen: Vec<&str> = sink.rows.iter().map(|r| r.key.as_str()).collect();
        seen.dedup();
        assert_eq!(seen, vec!["a.com", "b.com", "a.com"]);
        assert_eq!(report.missing_keys, vec!["absent.com"]);
        assert!(matches!(report.reason, TerminationReason::InputExhausted));
    }
}
