//! Technology catalog: remote service types and on-disk data layout.
//!
//! The catalog service enumerates technologies; each technology has a plain
//! text domain list (and optionally a `_daily` delta list) used as the
//! target set for one extraction run.

mod client;

pub use client::{CatalogClient, CatalogConfig, DEFAULT_RATE_LIMIT};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Filename of the persisted catalog JSON.
pub const TECHNOLOGIES_FILE: &str = "technologies.json";

/// Filename of the unpacked detailed dataset.
pub const DETAILED_CSV_FILE: &str = "domains-detailed.csv";

/// Filename of the downloaded detailed dataset archive.
pub const DETAILED_ARCHIVE_FILE: &str = "detailed_full.zip";

/// One catalog entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Technology {
    /// Technology name, also the remote list identifier
    pub name: String,
    /// Daily-delta row count as reported by the service; "0" means the
    /// technology has no daily list
    #[serde(default)]
    pub count_daily: String,
}

impl Technology {
    /// True if the service publishes a `_daily` delta list for this entry.
    pub fn has_daily(&self) -> bool {
        !self.count_daily.is_empty() && self.count_daily != "0"
    }
}

/// Top-level catalog document as served by the remote service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TechnologyCatalog {
    pub technology: Vec<Technology>,
}

/// Which domain list of a technology to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Full accumulated list
    Full,
    /// Daily delta list
    Daily,
}

impl ListKind {
    /// Remote list identifier for a technology name.
    pub fn list_name(&self, technology: &str) -> String {
        match self {
            ListKind::Full => technology.to_string(),
            ListKind::Daily => format!("{technology}_daily"),
        }
    }

    /// Short label used in output paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Full => "full",
            ListKind::Daily => "daily",
        }
    }
}

/// On-disk layout of catalog data, rooted at a data directory.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    /// Create a layout rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persisted catalog JSON.
    pub fn technologies_json(&self) -> PathBuf {
        self.root.join(TECHNOLOGIES_FILE)
    }

    /// Domain list file for a technology.
    pub fn technology_list(&self, technology: &str, kind: ListKind) -> PathBuf {
        self.root
            .join("technologies")
            .join(format!("{}.txt", kind.list_name(technology)))
    }

    /// Unpacked detailed dataset CSV.
    pub fn detailed_csv(&self) -> PathBuf {
        self.root.join("detailed").join(DETAILED_CSV_FILE)
    }

    /// Downloaded detailed dataset archive.
    pub fn detailed_archive(&self) -> PathBuf {
        self.root.join("detailed").join(DETAILED_ARCHIVE_FILE)
    }

    /// Extraction output file for a technology and list kind.
    pub fn extracted_output(&self, technology: &str, kind: ListKind) -> PathBuf {
        self.root
            .join("extracted")
            .join(technology)
            .join(format!("{}.csv", kind.as_str()))
    }
}
