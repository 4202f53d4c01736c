//! Result extraction: turn the engine's potfile into the custom dictionary and
//! fold it into the historical corpus.
//!
//! The potfile size acts as a watermark. When it has not moved since the last
//! extraction the previous count is returned without asking the engine or
//! touching any file.
use std::path::PathBuf;

use log::{debug, error, info};

use crate::credential::{CredentialStore, dedup_sorted};
use crate::engine::{CrackEngine, EngineError};
use crate::pot::{PotError, potfile_size};

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Potfile(#[from] PotError),
    #[error("querying recovered plaintexts failed: {0}")]
    Query(#[from] EngineError),
    #[error("writing credential files failed: {0:#}")]
    Store(anyhow::Error),
}

pub struct Extractor<S> {
    potfile: PathBuf,
    store: S,
    watermark: u64,
    found: u64,
}

impl<S: CredentialStore> Extractor<S> {
    pub fn new(potfile: PathBuf, store: S) -> Self {
        Self {
            potfile,
            store,
            watermark: 0,
            found: 0,
        }
    }

    /// Unique plaintexts recovered as of the last successful extraction.
    pub fn found(&self) -> u64 {
        self.found
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cumulative count of unique recovered plaintexts. Failures are logged and
    /// reported as 0 so a broken extraction never aborts the campaign.
    pub fn extract<E: CrackEngine + ?Sized>(&mut self, engine: &mut E, hash_mode: &str) -> u64 {
        match self.refresh(engine, hash_mode) {
            Ok(count) => count,
            Err(e) => {
                error!("extraction failed: {}", e);
                0
            }
        }
    }

    /// Same as [`Extractor::extract`] but surfaces the failure, for callers that
    /// need to tell "nothing recovered" apart from "could not measure".
    pub fn refresh<E: CrackEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        hash_mode: &str,
    ) -> Result<u64, ExtractError> {
        let size = potfile_size(&self.potfile)?;
        if size == self.watermark {
            debug!("potfile size unchanged ({} bytes), skipping extraction", size);
            return Ok(self.found);
        }
        // Move the watermark before the work so a shrunk or truncated potfile
        // is picked up again on its next growth.
        self.watermark = size;

        info!("generating custom dictionary from potfile");
        let recovered = dedup_sorted(engine.show(hash_mode)?);
        self.store
            .write_custom(&recovered)
            .map_err(ExtractError::Store)?;
        let corpus = self
            .store
            .merge_historical(&recovered)
            .map_err(ExtractError::Store)?;

        let count = recovered.len() as u64;
        info!(
            "{} unique passwords recovered, historical dictionary holds {}",
            count, corpus
        );
        self.found = count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::FileStore;
    use crate::engine::fake::FakeEngine;
    use tempfile::tempdir;

    #[test]
    fn second_extract_without_progress_is_a_no_op() {
        let dir = tempdir().unwrap();
        let pot = dir.path().join("hashcat.potfile");
        let store = FileStore::new(dir.path().join("h.txt.dict"), dir.path().join("hist.dico"));
        let mut engine = FakeEngine::new(pot.clone(), &["bob", "carol", "bob"]);
        let mut ex = Extractor::new(pot, store);

        assert_eq!(ex.extract(&mut engine, "0"), 2);
        let custom = dir.path().join("h.txt.dict");
        std::fs::remove_file(&custom).unwrap();

        assert_eq!(ex.extract(&mut engine, "0"), 2);
        assert_eq!(engine.shows, 1);
        assert!(!custom.exists(), "custom dictionary must not be rewritten");
    }

    #[test]
    fn extraction_writes_snapshot_and_merges_corpus() {
        let dir = tempdir().unwrap();
        let pot = dir.path().join("hashcat.potfile");
        let hist = dir.path().join("hist.dico");
        std::fs::write(&hist, "alice\nbob\n").unwrap();
        let store = FileStore::new(dir.path().join("h.txt.dict"), &hist);
        let mut engine = FakeEngine::new(pot.clone(), &["carol", "bob"]);
        let mut ex = Extractor::new(pot, store);

        assert_eq!(ex.extract(&mut engine, "0"), 2);
        assert_eq!(
            ex.store().load_historical().unwrap(),
            vec![b"alice".to_vec(), b"bob".to_vec(), b"carol".to_vec()]
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("h.txt.dict")).unwrap(),
            "bob\ncarol\n"
        );
    }

    #[test]
    fn potfile_growth_triggers_new_extraction() {
        let dir = tempdir().unwrap();
        let pot = dir.path().join("hashcat.potfile");
        let store = FileStore::new(dir.path().join("h.txt.dict"), dir.path().join("hist.dico"));
        let mut engine = FakeEngine::new(pot.clone(), &["a"]).with_batches(&[&["b"]]);
        let mut ex = Extractor::new(pot.clone(), store);

        assert_eq!(ex.extract(&mut engine, "0"), 1);
        engine
            .run(&crate::engine::Invocation::new(
                "0",
                crate::engine::Attack::mask("?a"),
                "t",
            ))
            .unwrap();
        assert_eq!(ex.extract(&mut engine, "0"), 2);
        assert_eq!(ex.watermark(), std::fs::metadata(&pot).unwrap().len());
    }

    #[test]
    fn truncated_potfile_is_picked_up_on_next_growth() {
        let dir = tempdir().unwrap();
        let pot = dir.path().join("hashcat.potfile");
        let store = FileStore::new(dir.path().join("h.txt.dict"), dir.path().join("hist.dico"));
        let mut engine = FakeEngine::new(pot.clone(), &["a", "b"]).with_batches(&[&["c"]]);
        let mut ex = Extractor::new(pot.clone(), store);

        assert_eq!(ex.extract(&mut engine, "0"), 2);
        std::fs::write(&pot, "").unwrap();
        assert_eq!(ex.extract(&mut engine, "0"), 2);
        assert_eq!(ex.watermark(), 0);
        assert_eq!(engine.shows, 2);
        assert_eq!(ex.extract(&mut engine, "0"), 2);
        assert_eq!(engine.shows, 2);

        engine
            .run(&crate::engine::Invocation::new(
                "0",
                crate::engine::Attack::mask("?a"),
                "t",
            ))
            .unwrap();
        assert_eq!(ex.extract(&mut engine, "0"), 3);
        assert_eq!(engine.shows, 3);
        assert_eq!(ex.watermark(), std::fs::metadata(&pot).unwrap().len());
    }

    #[test]
    fn failed_query_reports_zero_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let pot = dir.path().join("hashcat.potfile");
        let store = FileStore::new(dir.path().join("h.txt.dict"), dir.path().join("hist.dico"));
        let mut engine = FakeEngine::new(pot.clone(), &["a"]);
        engine.failing_shows = vec![1];
        let mut ex = Extractor::new(pot, store);

        assert_eq!(ex.extract(&mut engine, "0"), 0);
        assert_eq!(ex.found(), 0);
        assert!(!dir.path().join("h.txt.dict").exists());
    }

    #[test]
    fn unreadable_potfile_reports_zero() {
        let dir = tempdir().unwrap();
        let pot = dir.path().join("missing.potfile");
        let store = FileStore::new(dir.path().join("h.txt.dict"), dir.path().join("hist.dico"));
        let mut engine = FakeEngine::new(dir.path().join("other.potfile"), &["a"]);
        let mut ex = Extractor::new(pot, store);

        assert_eq!(ex.extract(&mut engine, "0"), 0);
        assert!(matches!(
            ex.refresh(&mut engine, "0"),
            Err(ExtractError::Potfile(_))
        ));
        assert_eq!(engine.shows, 0);
    }
}
