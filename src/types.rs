use std::fmt;

use crate::error::SieveError;

/// One row of the detailed dataset.
///
/// The key is the domain name; everything after it (nameservers, IP,
/// country, technology slots) is carried opaquely and re-emitted unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    /// Domain name, used for target-set membership tests
    pub key: String,
    /// Remaining positional columns
    pub fields: Vec<String>,
}

impl DomainRecord {
    /// Create a new record.
    pub fn new(key: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }
}

/// Why a run stopped reading input.
#[derive(Debug)]
pub enum TerminationReason {
    /// Every target key was observed at least once; the rest of the input
    /// cannot produce required matches.
    AllKeysFound,
    /// The input ended before all target keys were observed.
    InputExhausted,
    /// The run was cut short; matches written before the abort stay durable.
    Aborted(AbortCause),
}

/// What cut a run short.
#[derive(Debug)]
pub enum AbortCause {
    /// Read or write failed at the I/O level
    Io(SieveError),
    /// External cancellation request
    Cancelled,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::AllKeysFound => write!(f, "all target keys found"),
            TerminationReason::InputExhausted => write!(f, "input exhausted"),
            TerminationReason::Aborted(cause) => write!(f, "aborted: {}", cause),
        }
    }
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortCause::Io(err) => write!(f, "{}", err),
            AbortCause::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of one extraction run.
///
/// Matched records are written to the sink as they are found, never buffered
/// here; this struct only carries the counters and the termination state.
#[derive(Debug)]
pub struct ExtractionReport {
    /// Rows written to the sink (record-level: duplicate-key rows count each)
    pub matched: u64,
    /// Well-formed records consumed from the source
    pub records_read: u64,
    /// Malformed rows skipped with a warning
    pub skipped: u64,
    /// Target keys never observed in the input, sorted
    pub missing_keys: Vec<String>,
    /// Why the run stopped
    pub reason: TerminationReason,
}

impl ExtractionReport {
    /// True if the run reached a terminal state without an abort.
    pub fn is_orderly(&self) -> bool {
        !matches!(self.reason, TerminationReason::Aborted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_termination_reason_display() {
        assert_eq!(
            format!("{}", TerminationReason::AllKeysFound),
            "all target keys found"
        );
        assert_eq!(
            format!("{}", TerminationReason::InputExhausted),
            "input exhausted"
        );
        assert_eq!(
            format!("{}", TerminationReason::Aborted(AbortCause::Cancelled)),
            "aborted: cancelled"
        );
    }

    #[test]
    fn test_abort_cause_io_display_carries_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let cause = AbortCause::Io(SieveError::Io(io));
        assert!(format!("{}", cause).contains("disk full"));
    }

    #[test]
    fn test_report_orderly() {
        let report = ExtractionReport {
            matched: 3,
            records_read: 4,
            skipped: 0,
            missing_keys: vec![],
            reason: TerminationReason::AllKeysFound,
        };
        assert!(report.is_orderly());

        let aborted = ExtractionReport {
            matched: 0,
            records_read: 0,
            skipped: 0,
            missing_keys: vec!["a.com".into()],
            reason: TerminationReason::Aborted(AbortCause::Cancelled),
        };
        assert!(!aborted.is_orderly());
    }
}
