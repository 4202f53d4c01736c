//! Credential store: the per-run custom dictionary and the cross-run
//! historical corpus.
//!
//! A credential is a recovered plaintext. Both files hold credentials one per
//! line, sorted ascending with no duplicates. The custom dictionary is a full
//! snapshot of what the engine currently reports for the active hash file and
//! is overwritten each time; the historical corpus only ever grows.
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::slice::ParallelSliceMut;

use crate::io::{DEFAULT_MMAP_THRESHOLD_BYTES, read_lines, write_lines_atomic};

/// Below this many entries a plain sort beats rayon's setup cost.
const PARALLEL_SORT_MIN: usize = 64 * 1024;

/// A recovered plaintext, kept as raw bytes: corpora seeded from other tools
/// routinely hold latin-1 or other non-UTF-8 entries.
pub type Plaintext = Vec<u8>;

/// Sort ascending and drop equal neighbours.
pub fn dedup_sorted<T: Ord + Send>(mut items: Vec<T>) -> Vec<T> {
    if items.len() >= PARALLEL_SORT_MIN {
        items.par_sort_unstable();
    } else {
        items.sort_unstable();
    }
    items.dedup();
    items
}

/// Persistence contract for recovered credentials.
pub trait CredentialStore {
    /// Replace the custom dictionary with `credentials` (already deduplicated).
    fn write_custom(&mut self, credentials: &[Plaintext]) -> Result<()>;

    /// Union `credentials` into the historical corpus and rewrite it.
    /// Returns the number of entries in the corpus afterwards.
    fn merge_historical(&mut self, credentials: &[Plaintext]) -> Result<usize>;

    /// Current historical corpus; empty when the file does not exist yet.
    fn load_historical(&self) -> Result<Vec<Plaintext>>;
}

/// File-backed store used by the campaign.
#[derive(Debug, Clone)]
pub struct FileStore {
    pub custom: PathBuf,
    pub historical: PathBuf,
    pub mmap_threshold: u64,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(custom: P, historical: Q) -> Self {
        Self {
            custom: custom.into(),
            historical: historical.into(),
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }

    pub fn with_mmap_threshold(mut self, threshold: u64) -> Self {
        self.mmap_threshold = threshold;
        self
    }

    pub fn custom_path(&self) -> &Path {
        &self.custom
    }

    pub fn historical_path(&self) -> &Path {
        &self.historical
    }
}

impl CredentialStore for FileStore {
    fn write_custom(&mut self, credentials: &[Plaintext]) -> Result<()> {
        write_lines_atomic(&self.custom, credentials)
    }

    fn merge_historical(&mut self, credentials: &[Plaintext]) -> Result<usize> {
        let mut all = self.load_historical()?;
        all.extend(credentials.iter().cloned());
        let merged = dedup_sorted(all);
        write_lines_atomic(&self.historical, &merged)?;
        Ok(merged.len())
    }

    fn load_historical(&self) -> Result<Vec<Plaintext>> {
        if !self.historical.exists() {
            return Ok(Vec::new());
        }
        read_lines(&self.historical, self.mmap_threshold)
    }
}
