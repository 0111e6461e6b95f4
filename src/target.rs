use std::collections::HashSet;
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;

use crate::error::{Result, SieveError};

/// The set of domain names a run should extract, plus the subset already
/// observed during the current run.
///
/// Keys are matched exactly as supplied: no case folding, no internal
/// whitespace normalization. Loading only strips the artifacts the list
/// format may leave around a key (surrounding whitespace and surrounding
/// double quotes).
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    keys: HashSet<String>,
    found: HashSet<String>,
}

/// Strip list-format artifacts from a raw key: surrounding whitespace, then
/// surrounding double-quote characters. Case and interior whitespace are
/// left untouched.
fn clean_key(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

impl TargetSet {
    /// Build a target set from an in-memory sequence of raw keys.
    ///
    /// Blank entries are skipped; an empty set is valid (such a run always
    /// terminates by input exhaustion, never by completion).
    pub fn from_keys<I>(raw_keys: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let keys = raw_keys
            .into_iter()
            .filter_map(|raw| {
                let key = clean_key(raw.as_ref());
                if key.is_empty() {
                    None
                } else {
                    Some(key.to_string())
                }
            })
            .collect();
        Self {
            keys,
            found: HashSet::new(),
        }
    }

    /// Load a target set from a reader, one key per line.
    pub fn load<R: BufRead>(reader: R) -> Result<Self> {
        let mut keys = HashSet::new();
        for line in reader.lines() {
            let line = line
                .map_err(|e| SieveError::TargetList(format!("failed to read target list: {e}")))?;
            let key = clean_key(&line);
            if !key.is_empty() {
                keys.insert(key.to_string());
            }
        }
        Ok(Self {
            keys,
            found: HashSet::new(),
        })
    }

    /// Load a target set from a file, one key per line.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| {
            SieveError::TargetList(format!("failed to open '{}': {e}", path.display()))
        })?;
        Self::load(io::BufReader::new(file))
    }

    /// Number of target keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if there are no target keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of target keys observed so far in the current run.
    pub fn found_count(&self) -> usize {
        self.found.len()
    }

    /// O(1) membership test, exact match.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record that a target key was observed.
    ///
    /// Returns true only the first time a given key is marked; false on
    /// repeats (the caller still emits the duplicate record, it just must
    /// not count again toward completion) and for keys outside the set.
    pub fn mark_found(&mut self, key: &str) -> bool {
        if !self.keys.contains(key) {
            return false;
        }
        self.found.insert(key.to_string())
    }

    /// True iff every target key has been observed.
    ///
    /// Always false for an empty set: with nothing to find, the first
    /// completion check can never pass, so such a run ends by input
    /// exhaustion instead.
    pub fn is_complete(&self) -> bool {
        !self.keys.is_empty() && self.found.len() == self.keys.len()
    }

    /// Target keys never observed, sorted for deterministic reporting.
    pub fn missing_keys(&self) -> Vec<String> {
        let mut missing: Vec<String> = self.keys.difference(&self.found).cloned().collect();
        missing.sort();
        missing
    }
}
