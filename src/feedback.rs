//! Knowledge feedback loop.
//!
//! Sweeps every rule over one dictionary, re-measures, and repeats while the
//! recovered count keeps rising: freshly recovered plaintexts land in the
//! custom and historical dictionaries and may themselves be good rule inputs.
//! Recovery over a finite hash file saturates, so the loop reaches a fixed
//! point; the round cap only guards against a misbehaving engine.
use std::path::{Path, PathBuf};

use log::{error, info, warn};

use crate::credential::CredentialStore;
use crate::engine::{Attack, CrackEngine, Invocation};
use crate::extract::Extractor;

pub const DEFAULT_MAX_ROUNDS: usize = 100;

/// One dictionary and the rules to converge it with.
#[derive(Debug, Clone)]
pub struct Sweep<'a> {
    pub dictionary: &'a Path,
    pub rules: &'a [PathBuf],
    pub hash_mode: &'a str,
    pub label: &'a str,
    pub max_rounds: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Convergence {
    pub rounds: usize,
    pub initial: u64,
    pub last: u64,
    pub capped: bool,
}

impl Convergence {
    pub fn gained(&self) -> u64 {
        self.last.saturating_sub(self.initial)
    }
}

pub fn converge<E, S>(engine: &mut E, extractor: &mut Extractor<S>, sweep: &Sweep) -> Convergence
where
    E: CrackEngine + ?Sized,
    S: CredentialStore,
{
    let name = sweep
        .dictionary
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("starting knowledge loop on {}", sweep.dictionary.display());

    let initial = extractor.extract(engine, sweep.hash_mode);
    let mut outcome = Convergence {
        initial,
        last: initial,
        ..Default::default()
    };
    if initial == 0 {
        info!("no passwords recovered yet, nothing to transform with {}", name);
        return outcome;
    }

    loop {
        outcome.rounds += 1;
        for (i, rule) in sweep.rules.iter().enumerate() {
            let rule_name = rule.file_name().unwrap_or_default().to_string_lossy();
            let phase = format!(
                "{} {} round {} rule {}/{} {}",
                sweep.label,
                name,
                outcome.rounds,
                i + 1,
                sweep.rules.len(),
                rule_name
            );
            let inv = Invocation::new(
                sweep.hash_mode,
                Attack::wordlist(sweep.dictionary, Some(rule)),
                phase,
            );
            if let Err(e) = engine.run(&inv) {
                error!("rule {} on {} failed: {}", rule_name, name, e);
            }
        }
        let count = extractor.extract(engine, sweep.hash_mode);
        if count <= outcome.last {
            break;
        }
        info!(
            "{} new passwords in round {}, sweeping rules again",
            count - outcome.last,
            outcome.rounds
        );
        outcome.last = count;
        if outcome.rounds >= sweep.max_rounds {
            warn!(
                "knowledge loop on {} still improving after {} rounds, stopping",
                name, outcome.rounds
            );
            outcome.capped = true;
            break;
        }
    }
    info!(
        "knowledge loop on {} converged after {} rounds ({} -> {})",
        name, outcome.rounds, outcome.initial, outcome.last
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::FileStore;
    use crate::engine::fake::FakeEngine;
    use tempfile::{TempDir, tempdir};

    fn setup(recovered: &[&str], batches: &[&[&str]]) -> (TempDir, FakeEngine, Extractor<FileStore>) {
        let dir = tempdir().unwrap();
        let pot = dir.path().join("hashcat.potfile");
        let engine = FakeEngine::new(pot.clone(), recovered).with_batches(batches);
        let store = FileStore::new(dir.path().join("h.dict"), dir.path().join("hist.dico"));
        (dir, engine, Extractor::new(pot, store))
    }

    fn rules(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/rules/{n}"))).collect()
    }

    #[test]
    fn rounds_equal_productive_rounds_plus_one() {
        let (dir, mut engine, mut ex) = setup(&["a"], &[&["b"], &["c"]]);
        let rules = rules(&["one.rule"]);
        let dict = dir.path().join("h.dict");
        let sweep = Sweep {
            dictionary: &dict,
            rules: &rules,
            hash_mode: "0",
            label: "test",
            max_rounds: DEFAULT_MAX_ROUNDS,
        };
        let out = converge(&mut engine, &mut ex, &sweep);
        assert_eq!(out.rounds, 3);
        assert_eq!(out.initial, 1);
        assert_eq!(out.last, 3);
        assert!(!out.capped);
        assert_eq!(engine.runs.len(), 3);
    }

    #[test]
    fn nothing_recovered_skips_the_loop() {
        let (dir, mut engine, mut ex) = setup(&[], &[&["b"]]);
        let rules = rules(&["one.rule", "two.rule"]);
        let dict = dir.path().join("h.dict");
        let sweep = Sweep {
            dictionary: &dict,
            rules: &rules,
            hash_mode: "0",
            label: "test",
            max_rounds: DEFAULT_MAX_ROUNDS,
        };
        let out = converge(&mut engine, &mut ex, &sweep);
        assert_eq!(out.rounds, 0);
        assert!(engine.runs.is_empty());
    }

    #[test]
    fn every_rule_runs_each_round_even_after_failures() {
        let (dir, mut engine, mut ex) = setup(&["a"], &[]);
        engine.fail_runs = true;
        let rules = rules(&["one.rule", "two.rule", "three.rule"]);
        let dict = dir.path().join("h.dict");
        let sweep = Sweep {
            dictionary: &dict,
            rules: &rules,
            hash_mode: "1000",
            label: "test",
            max_rounds: DEFAULT_MAX_ROUNDS,
        };
        let out = converge(&mut engine, &mut ex, &sweep);
        assert_eq!(out.rounds, 1);
        assert_eq!(engine.runs.len(), 3);
        assert!(engine.runs.iter().all(|r| r.hash_mode == "1000"));
        assert_eq!(
            engine.runs[2].attack,
            Attack::wordlist(&dict, Some(Path::new("/rules/three.rule")))
        );
    }

    #[test]
    fn round_cap_stops_a_loop_that_keeps_improving() {
        let (dir, mut engine, mut ex) = setup(&["a"], &[&["b"], &["c"], &["d"], &["e"]]);
        let rules = rules(&["one.rule"]);
        let dict = dir.path().join("h.dict");
        let sweep = Sweep {
            dictionary: &dict,
            rules: &rules,
            hash_mode: "0",
            label: "test",
            max_rounds: 2,
        };
        let out = converge(&mut engine, &mut ex, &sweep);
        assert!(out.capped);
        assert_eq!(out.rounds, 2);
        assert_eq!(out.gained(), 2);
    }
}
