use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{CatalogErrorKind, Result, SieveError};

use super::{DataLayout, ListKind, Technology, TechnologyCatalog};

/// Default pause between consecutive list downloads.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_secs(1);

/// Catalog service access configuration.
///
/// Token and base URL are explicit values owned by this struct; nothing in
/// the crate reads them from process-wide state.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Service base URL, without trailing slash
    pub base_url: String,
    /// Access token, embedded in the URL path by the service's scheme
    pub token: String,
    /// Pause between consecutive list downloads
    pub rate_limit: Duration,
}

impl CatalogConfig {
    /// Create a config with the default rate limit.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }

    /// Set the pause between consecutive list downloads.
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }
}

/// Blocking client for the catalog service.
pub struct CatalogClient {
    config: CatalogConfig,
    layout: DataLayout,
    download_lock: Mutex<()>,
}

impl CatalogClient {
    /// Create a client writing into the given data layout.
    pub fn new(config: CatalogConfig, layout: DataLayout) -> Self {
        Self {
            config,
            layout,
            download_lock: Mutex::new(()),
        }
    }

    /// The data layout this client writes into.
    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    fn endpoint(&self, tail: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.token,
            tail
        )
    }

    /// Fetch the technology catalog, persist a pretty-printed copy, and
    /// return the parsed entries.
    pub fn fetch_technologies(&self) -> Result<Vec<Technology>> {
        info!("fetching technology catalog");
        let url = self.endpoint("technology-list/json/");

        let response = ureq::get(&url).call().map_err(|e| SieveError::Catalog {
            kind: CatalogErrorKind::Http,
            message: format!("catalog request failed: {e}"),
        })?;
        let (_, body) = response.into_parts();
        let text = std::io::read_to_string(body.into_reader())?;

        let catalog: TechnologyCatalog =
            serde_json::from_str(&text).map_err(|e| SieveError::Catalog {
                kind: CatalogErrorKind::InvalidResponse,
                message: format!("invalid catalog JSON: {e}"),
            })?;

        fs::create_dir_all(self.layout.root())?;
        let path = self.layout.technologies_json();
        fs::write(&path, serde_json::to_string_pretty(&catalog)?)?;
        info!(path = %path.display(), entries = catalog.technology.len(), "catalog saved");

        Ok(catalog.technology)
    }

    /// Read the previously fetched catalog from disk.
    pub fn cached_technologies(&self) -> Result<Vec<Technology>> {
        let path = self.layout.technologies_json();
        let text = fs::read_to_string(&path).map_err(|e| SieveError::Catalog {
            kind: CatalogErrorKind::FileError,
            message: format!("cannot read cached catalog '{}': {e}", path.display()),
        })?;
        let catalog: TechnologyCatalog =
            serde_json::from_str(&text).map_err(|e| SieveError::Catalog {
                kind: CatalogErrorKind::InvalidResponse,
                message: format!("invalid cached catalog '{}': {e}", path.display()),
            })?;
        Ok(catalog.technology)
    }

    /// Download one technology domain list.
    pub fn download_list(&self, technology: &str, kind: ListKind) -> Result<PathBuf> {
        let list_name = kind.list_name(technology);
        let url = self.endpoint(&format!("technology/{list_name}/list/text/"));
        let dest = self.layout.technology_list(technology, kind);
        info!(list = %list_name, "downloading domain list");
        self.download(&url, &dest)?;
        Ok(dest)
    }

    /// Download every technology's lists, daily variants included where the
    /// catalog reports one. Individual failures are logged and counted, not
    /// fatal. Returns `(succeeded, failed)`.
    pub fn download_all_lists(&self, technologies: &[Technology]) -> (usize, usize) {
        let mut succeeded = 0;
        let mut failed = 0;

        for tech in technologies {
            let mut kinds = vec![ListKind::Full];
            if tech.has_daily() {
                kinds.push(ListKind::Daily);
            }
            for kind in kinds {
                match self.download_list(&tech.name, kind) {
                    Ok(path) => {
                        info!(path = %path.display(), "saved domain list");
                        succeeded += 1;
                    }
                    Err(e) => {
                        warn!(technology = %tech.name, error = %e, "list download failed");
                        failed += 1;
                    }
                }
                // Pace requests against the service rate limit
                thread::sleep(self.config.rate_limit);
            }
        }

        (succeeded, failed)
    }

    /// Download the full detailed dataset archive.
    pub fn download_detailed(&self) -> Result<PathBuf> {
        let url = self.endpoint("get-detailed/full/list/zip/");
        let dest = self.layout.detailed_archive();
        info!("downloading full detailed dataset archive");
        self.download(&url, &dest)?;
        info!(path = %dest.display(), "archive saved");
        Ok(dest)
    }

    /// Download a URL to a destination path via a temp file, streaming the
    /// body so large payloads never sit in memory.
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let _lock = self.download_lock.lock();

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = dest.with_extension("tmp");

        let response = ureq::get(url).call().map_err(|e| SieveError::Catalog {
            kind: CatalogErrorKind::Http,
            message: format!("download failed: {e}"),
        })?;

        let mut file = fs::File::create(&tmp_path)?;
        let (_, body) = response.into_parts();
        let mut reader = body.into_reader();
        if let Err(e) = std::io::copy(&mut reader, &mut file) {
            drop(file);
            let _ = fs::remove_file(&tmp_path);
            return Err(SieveError::Io(e));
        }
        file.flush()?;
        drop(file);

        fs::rename(&tmp_path, dest)?;
        Ok(())
    }
}
