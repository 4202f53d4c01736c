//! Dictionary ranking: a persisted effectiveness score per dictionary.
//!
//! Scores count the credentials newly recovered while a dictionary (with or
//! without rules) was running, accumulated across every campaign. Entries are
//! keyed by base file name, so `a.dico` in two different directories shares a
//! single score. The table keeps insertion order, which is also the order in
//! the JSON file; equal scores rank in that order.
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde_json::{Map, Value};

use crate::io::write_atomic;

#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {reason}")]
    Parse { path: String, reason: String },
    #[error("cannot save {path}: {source:#}")]
    Write {
        path: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone)]
pub struct DictRanking {
    stats_file: PathBuf,
    dicts_dir: PathBuf,
    entries: Vec<(String, u64)>,
}

/// Base name used as the ranking key.
pub fn dict_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl DictRanking {
    pub fn empty<P: Into<PathBuf>, Q: Into<PathBuf>>(stats_file: P, dicts_dir: Q) -> Self {
        Self {
            stats_file: stats_file.into(),
            dicts_dir: dicts_dir.into(),
            entries: Vec::new(),
        }
    }

    /// Load the table from `stats_file`. A missing or corrupt file yields an
    /// empty table; only the warning survives.
    pub fn load<P: Into<PathBuf>, Q: Into<PathBuf>>(stats_file: P, dicts_dir: Q) -> Self {
        let mut ranking = Self::empty(stats_file, dicts_dir);
        if !ranking.stats_file.exists() {
            info!(
                "no dictionary stats at {}, starting empty",
                ranking.stats_file.display()
            );
            return ranking;
        }
        match read_entries(&ranking.stats_file) {
            Ok(entries) => ranking.entries = entries,
            Err(e) => warn!("{}; starting with empty dictionary stats", e),
        }
        ranking
    }

    pub fn stats_file(&self) -> &Path {
        &self.stats_file
    }

    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    pub fn score(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| *v)
    }

    /// Every known dictionary, best first; ties keep table order.
    pub fn standings(&self) -> Vec<(String, u64)> {
        let mut out = self.entries.clone();
        out.sort_by(|a, b| b.1.cmp(&a.1));
        out
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == name)
    }

    /// Order `candidates` by descending score. Dictionaries never seen before
    /// enter the table with score 0 so they still get explored. Returned paths
    /// are rebuilt from the dictionaries directory and the base name.
    pub fn rank(&mut self, candidates: &[PathBuf]) -> Vec<PathBuf> {
        let mut wanted: Vec<usize> = Vec::with_capacity(candidates.len());
        for path in candidates {
            let key = dict_key(path);
            let idx = match self.position(&key) {
                Some(i) => i,
                None => {
                    self.entries.push((key, 0));
                    self.entries.len() - 1
                }
            };
            if !wanted.contains(&idx) {
                wanted.push(idx);
            }
        }
        // Table order first, then a stable sort on score.
        wanted.sort_unstable();
        wanted.sort_by(|a, b| self.entries[*b].1.cmp(&self.entries[*a].1));
        wanted
            .into_iter()
            .map(|i| self.dicts_dir.join(&self.entries[i].0))
            .collect()
    }

    /// Credit `delta` newly recovered credentials to `dict` and persist the
    /// whole table right away. A failed save is logged; the in-memory table
    /// remains authoritative for the rest of the run.
    pub fn update_stats(&mut self, dict: &Path, delta: u64) {
        let key = dict_key(dict);
        info!("found {} new passwords via dictionary {}", delta, key);
        match self.position(&key) {
            Some(i) => self.entries[i].1 = self.entries[i].1.saturating_add(delta),
            None => self.entries.push((key, delta)),
        }
        if let Err(e) = self.save() {
            warn!("{}", e);
        }
    }

    pub fn save(&self) -> Result<(), RankingError> {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(*v)))
            .collect();
        let mut data = serde_json::to_vec_pretty(&Value::Object(map)).map_err(|e| {
            RankingError::Write {
                path: self.stats_file.display().to_string(),
                source: e.into(),
            }
        })?;
        data.push(b'\n');
        write_atomic(&self.stats_file, &data).map_err(|source| RankingError::Write {
            path: self.stats_file.display().to_string(),
            source,
        })
    }
}

fn read_entries(path: &Path) -> Result<Vec<(String, u64)>, RankingError> {
    let data = std::fs::read_to_string(path).map_err(|source| RankingError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parse_err = |reason: String| RankingError::Parse {
        path: path.display().to_string(),
        reason,
    };
    let map: Map<String, Value> = serde_json::from_str(&data).map_err(|e| parse_err(e.to_string()))?;
    map.into_iter()
        .map(|(k, v)| match v.as_u64() {
            Some(n) => Ok((k, n)),
            None => Err(parse_err(format!("score for {k} is not a non-negative integer"))),
        })
        .collect()
}
