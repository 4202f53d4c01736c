//! Campaign controller.
//!
//! Runs the operator-selected phases in order, one engine invocation at a
//! time. Each phase is confirmed first; a declined phase is skipped. Failures
//! inside a phase are logged and at worst end that phase, never the campaign.
//!
//! Phase identifiers as shown in the menu:
//!
//! | id   | phase |
//! |------|-------|
//! | `LM` | LM brute force, lengths 6 and 7 (NTLM dumps only) |
//! | `1`  | knowledge loop on the historical dictionary |
//! | `2`  | knowledge loop on the custom dictionary |
//! | `3`  | ranked dictionary sweep, then knowledge loop on the custom dictionary |
//! | `4`  | brute force with hashcat's default mask, lengths 8 to 10 |
//! | `5`  | brute force, length 8 |
//! | `6`  | rule stacking with best64 on the historical dictionary |
//! | `7`  | rule stacking with best64 on every ranked dictionary |
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{error, info, warn};

use crate::catalog::dictionaries;
use crate::config::Config;
use crate::credential::FileStore;
use crate::engine::{Attack, CrackEngine, EngineError, Invocation};
use crate::extract::Extractor;
use crate::feedback::{Convergence, Sweep, converge};
use crate::hashtype::LM_MODE;
use crate::prompt::Operator;
use crate::ranking::{DictRanking, dict_key};
use crate::stats::{CampaignStats, PhaseOutcome, PhaseStatus};

const LM_MASKS: [&str; 2] = ["?a?a?a?a?a?a", "?a?a?a?a?a?a?a"];
const LENGTH8_MASK: &str = "?a?a?a?a?a?a?a?a";
const AUTOMASK_INCREMENT: (u8, u8) = (8, 10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Lm,
    Historical,
    Custom,
    Dictionaries,
    AutomaskBruteForce,
    BruteForce8,
    StackHistorical,
    StackAll,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Lm,
        Phase::Historical,
        Phase::Custom,
        Phase::Dictionaries,
        Phase::AutomaskBruteForce,
        Phase::BruteForce8,
        Phase::StackHistorical,
        Phase::StackAll,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Phase::Lm => "LM",
            Phase::Historical => "1",
            Phase::Custom => "2",
            Phase::Dictionaries => "3",
            Phase::AutomaskBruteForce => "4",
            Phase::BruteForce8 => "5",
            Phase::StackHistorical => "6",
            Phase::StackAll => "7",
        }
    }

    pub fn from_id(id: &str) -> Option<Phase> {
        let id = id.trim();
        Phase::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(id))
    }

    pub fn title(self) -> &'static str {
        match self {
            Phase::Lm => "LM attack first",
            Phase::Historical => "Historical dictionary",
            Phase::Custom => "Custom dictionary",
            Phase::Dictionaries => "Dictionaries",
            Phase::AutomaskBruteForce => "Brute force password with len=8 with automask",
            Phase::BruteForce8 => "Brute force password with len=8",
            Phase::StackHistorical => "Rules stacking with best64 rule on Historical Dict",
            Phase::StackAll => "Rules stacking with best64 rule on all dico",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.id(), self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOrder {
    pub phases: Vec<Phase>,
    pub rejected: Vec<String>,
}

pub fn default_order(lm_available: bool) -> Vec<Phase> {
    Phase::ALL
        .into_iter()
        .filter(|p| lm_available || *p != Phase::Lm)
        .collect()
}

pub fn order_string(phases: &[Phase]) -> String {
    phases.iter().map(|p| p.id()).collect::<Vec<_>>().join(",")
}

/// Parse a comma-separated phase order. Empty input selects the default
/// order; unknown ids, and `LM` when the hash mode has no LM halves, are
/// rejected.
pub fn parse_order(input: &str, lm_available: bool) -> PhaseOrder {
    if input.trim().is_empty() {
        return PhaseOrder {
            phases: default_order(lm_available),
            rejected: Vec::new(),
        };
    }
    let mut order = PhaseOrder {
        phases: Vec::new(),
        rejected: Vec::new(),
    };
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match Phase::from_id(token) {
            Some(Phase::Lm) if !lm_available => order.rejected.push(token.to_string()),
            Some(p) => order.phases.push(p),
            None => order.rejected.push(token.to_string()),
        }
    }
    order
}

pub fn menu(lm_available: bool) -> String {
    let mut out = String::from("Choose the order of attack:\n");
    for p in default_order(lm_available) {
        out.push_str(&format!("{}\n", p));
    }
    out
}

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("cannot read dictionaries directory {path}: {source}")]
    DictsDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no dictionaries found in {0}")]
    NoDictionaries(String),
    #[error("{0} not found")]
    MissingRule(String),
    #[error("dictionary {0} not found")]
    MissingDictionary(String),
    #[error("LM phase requires NTLM hashes (mode 1000), got mode {0}")]
    LmUnavailable(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct Campaign<'a, E, O> {
    cfg: &'a Config,
    engine: E,
    operator: O,
    extractor: Extractor<FileStore>,
    ranking: DictRanking,
    stats: CampaignStats,
}

impl<'a, E: CrackEngine, O: Operator> Campaign<'a, E, O> {
    pub fn new(cfg: &'a Config, engine: E, operator: O) -> Self {
        let store = FileStore::new(&cfg.custom_dict, &cfg.historical_dict)
            .with_mmap_threshold(cfg.mmap_threshold);
        Self {
            cfg,
            engine,
            operator,
            extractor: Extractor::new(cfg.potfile.clone(), store),
            ranking: DictRanking::load(&cfg.stats_file, &cfg.dicts_dir),
            stats: CampaignStats::new(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn ranking(&self) -> &DictRanking {
        &self.ranking
    }

    pub fn stats(&self) -> &CampaignStats {
        &self.stats
    }

    /// Ask the operator for the phase order through the menu.
    pub fn choose_order(&mut self) -> Vec<Phase> {
        let lm = self.cfg.lm_available();
        let default = order_string(&default_order(lm));
        let answer = self.operator.phase_order(&menu(lm), &default);
        let order = parse_order(&answer, lm);
        for bad in &order.rejected {
            warn!("ignoring unknown or unavailable phase {:?}", bad);
        }
        order.phases
    }

    pub fn run(&mut self, order: &[Phase]) -> &CampaignStats {
        info!("campaign order: {}", order_string(order));
        for &phase in order {
            let before = self.extractor.extract(&mut self.engine, &self.cfg.hash_mode);
            let started = Instant::now();
            let status = match self.execute(phase) {
                Ok(true) => PhaseStatus::Completed,
                Ok(false) => {
                    info!("phase {} skipped by operator", phase.id());
                    PhaseStatus::Declined
                }
                Err(e) => {
                    error!("phase {} aborted: {}", phase.id(), e);
                    PhaseStatus::Aborted(e.to_string())
                }
            };
            let after = self.extractor.extract(&mut self.engine, &self.cfg.hash_mode);
            self.stats.record(PhaseOutcome {
                phase,
                status,
                found_before: before,
                found_after: after,
                elapsed: started.elapsed(),
            });
        }
        self.stats.finish();
        &self.stats
    }

    fn confirm(&mut self, question: &str) -> bool {
        self.operator.confirm(question).accepted
    }

    /// Ok(false) when the operator declined the phase.
    fn execute(&mut self, phase: Phase) -> Result<bool, CampaignError> {
        match phase {
            Phase::Lm => self.lm_audit(),
            Phase::Historical => {
                if !self.confirm("Start hashcat on Historical dictionary?") {
                    return Ok(false);
                }
                let cfg = self.cfg;
                require_dictionary(&cfg.historical_dict)?;
                self.knowledge_loop(&cfg.historical_dict, "Knowledge phase");
                Ok(true)
            }
            Phase::Custom => {
                if !self.confirm("Start hashcat on Custom dictionary?") {
                    return Ok(false);
                }
                let cfg = self.cfg;
                self.knowledge_loop(&cfg.custom_dict, "Knowledge phase");
                Ok(true)
            }
            Phase::Dictionaries => self.dictionary_sweep(),
            Phase::AutomaskBruteForce => {
                if !self.confirm(phase.title()) {
                    return Ok(false);
                }
                let attack = Attack::Mask {
                    mask: None,
                    increment: Some(AUTOMASK_INCREMENT),
                };
                self.invoke(Invocation::new(&self.cfg.hash_mode, attack, phase.title()))?;
                Ok(true)
            }
            Phase::BruteForce8 => {
                if !self.confirm(phase.title()) {
                    return Ok(false);
                }
                let attack = Attack::mask(LENGTH8_MASK);
                self.invoke(Invocation::new(&self.cfg.hash_mode, attack, phase.title()))?;
                Ok(true)
            }
            Phase::StackHistorical => {
                if !self.confirm(phase.title()) {
                    return Ok(false);
                }
                let best64 = self.require_best64()?;
                let cfg = self.cfg;
                require_dictionary(&cfg.historical_dict)?;
                self.stack_rules(&cfg.historical_dict, &best64)?;
                Ok(true)
            }
            Phase::StackAll => {
                if !self.confirm(phase.title()) {
                    return Ok(false);
                }
                let best64 = self.require_best64()?;
                let ranked = self.ranked_dictionaries()?;
                for dict in &ranked {
                    self.stack_rules(dict, &best64)?;
                }
                Ok(true)
            }
        }
    }

    /// Run one invocation. Ok(false) when it failed in a way the phase can
    /// step over; a missing engine binary ends the phase.
    fn invoke(&mut self, inv: Invocation) -> Result<bool, CampaignError> {
        match self.engine.run(&inv) {
            Ok(()) => Ok(true),
            Err(e @ EngineError::NotFound(_)) => Err(e.into()),
            Err(e) => {
                error!("[{}] {}", inv.phase, e);
                Ok(false)
            }
        }
    }

    fn knowledge_loop(&mut self, dict: &Path, label: &str) -> Convergence {
        let cfg = self.cfg;
        let sweep = Sweep {
            dictionary: dict,
            rules: &cfg.rules,
            hash_mode: &cfg.hash_mode,
            label,
            max_rounds: cfg.max_rounds,
        };
        converge(&mut self.engine, &mut self.extractor, &sweep)
    }

    fn lm_audit(&mut self) -> Result<bool, CampaignError> {
        if !self.cfg.lm_available() {
            return Err(CampaignError::LmUnavailable(self.cfg.hash_mode.clone()));
        }
        if !self.confirm("Audit LM hashes first?") {
            return Ok(false);
        }
        info!("running hashcat with LM hashes audit");
        // The LM mode only applies to these two invocations; the configured
        // mode stays in force for every other phase.
        for mask in LM_MASKS {
            self.invoke(Invocation::new(LM_MODE, Attack::mask(mask), "Audit LM hashes"))?;
        }
        Ok(true)
    }

    fn require_best64(&self) -> Result<PathBuf, CampaignError> {
        let best64 = self.cfg.best64_rule();
        if best64.is_file() {
            Ok(best64)
        } else {
            Err(CampaignError::MissingRule(best64.display().to_string()))
        }
    }

    fn ranked_dictionaries(&mut self) -> Result<Vec<PathBuf>, CampaignError> {
        let dir = &self.cfg.dicts_dir;
        let dicts = dictionaries(dir).map_err(|source| CampaignError::DictsDir {
            path: dir.display().to_string(),
            source,
        })?;
        if dicts.is_empty() {
            return Err(CampaignError::NoDictionaries(dir.display().to_string()));
        }
        Ok(self.ranking.rank(&dicts))
    }

    fn stack_rules(&mut self, dict: &Path, best64: &Path) -> Result<(), CampaignError> {
        let cfg = self.cfg;
        let name = dict_key(dict);
        for rule in &cfg.rules {
            let rule_name = dict_key(rule);
            info!("stacking {} with best64 on {}", rule_name, name);
            let attack = Attack::Wordlist {
                dictionary: dict.to_path_buf(),
                rules: vec![rule.clone(), best64.to_path_buf()],
                loopback: true,
            };
            let phase = format!("Rules stacking with best64 on {} with rule {}", name, rule_name);
            self.invoke(Invocation::new(&cfg.hash_mode, attack, phase))?;
        }
        Ok(())
    }

    fn dictionary_sweep(&mut self) -> Result<bool, CampaignError> {
        let cfg = self.cfg;
        let ranked = self.ranked_dictionaries()?;
        if !self.confirm(&format!("Start hashcat on {} dictionaries?", ranked.len())) {
            return Ok(false);
        }
        let total = ranked.len();
        for (i, dict) in ranked.iter().enumerate() {
            if !self.confirm(&format!("Start hashcat on dictionary {} ?", dict.display())) {
                continue;
            }
            let name = dict_key(dict);
            let mut baseline = self.measure().unwrap_or_else(|| self.extractor.found());

            let label = format!("Dictionary phase {}/{} {}", i + 1, total, name);
            info!("running hashcat with dictionary {} and no rule", name);
            let inv = Invocation::new(&self.cfg.hash_mode, Attack::wordlist(dict, None), label);
            if !self.invoke(inv)? {
                continue;
            }
            self.credit(dict, &mut baseline);

            let rules = cfg.rules.len();
            for (j, rule) in cfg.rules.iter().enumerate() {
                let label = format!(
                    "Dictionary phase {}/{} {}, with rule {}/{} {}",
                    i + 1,
                    total,
                    name,
                    j + 1,
                    rules,
                    dict_key(rule)
                );
                let inv = Invocation::new(
                    &self.cfg.hash_mode,
                    Attack::wordlist(dict, Some(rule)),
                    label,
                );
                self.invoke(inv)?;
                self.credit(dict, &mut baseline);
            }
        }
        self.knowledge_loop(&cfg.custom_dict, "Knowledge phase");
        Ok(true)
    }

    fn measure(&mut self) -> Option<u64> {
        match self.extractor.refresh(&mut self.engine, &self.cfg.hash_mode) {
            Ok(n) => Some(n),
            Err(e) => {
                error!("extraction failed: {}", e);
                None
            }
        }
    }

    /// Attribute everything recovered since `baseline` to `dict`. A failed
    /// measurement credits nothing and keeps the baseline.
    fn credit(&mut self, dict: &Path, baseline: &mut u64) {
        let delta = match self.measure() {
            Some(now) => {
                let delta = now.saturating_sub(*baseline);
                *baseline = now;
                delta
            }
            None => 0,
        };
        self.ranking.update_stats(dict, delta);
    }
}

fn require_dictionary(dict: &Path) -> Result<(), CampaignError> {
    if dict.is_file() {
        Ok(())
    } else {
        Err(CampaignError::MissingDictionary(dict.display().to_string()))
    }
}
