//! Export helpers for writing the dictionary ranking to CSV.
//!
//! - `save_ranking_csv` writes one `rank,dictionary,score` row per known
//!   dictionary, best first.
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;
use serde::Serialize;

use crate::io::write_atomic;
use crate::ranking::DictRanking;

#[derive(Debug, Serialize)]
struct RankingRow<'a> {
    rank: usize,
    dictionary: &'a str,
    score: u64,
}

pub fn save_ranking_csv<P: AsRef<Path>>(ranking: &DictRanking, path: P) -> Result<()> {
    let path = path.as_ref();
    let standings = ranking.standings();
    let mut wtr = Writer::from_writer(Vec::new());
    for (i, (name, score)) in standings.iter().enumerate() {
        wtr.serialize(RankingRow {
            rank: i + 1,
            dictionary: name,
            score: *score,
        })?;
    }
    let data = wtr
        .into_inner()
        .context("failed to finish ranking CSV")?;
    write_atomic(path, &data).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_rows_best_first() {
        let dir = tempdir().unwrap();
        let stats = dir.path().join("s.json");
        std::fs::write(&stats, r#"{"small.dico": 2, "rockyou.dico": 40, "new.dico": 0}"#).unwrap();
        let r = DictRanking::load(&stats, dir.path());
        let out = dir.path().join("ranking.csv");
        save_ranking_csv(&r, &out).unwrap();
        let content = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "rank,dictionary,score",
                "1,rockyou.dico,40",
                "2,small.dico,2",
                "3,new.dico,0"
            ]
        );
    }

    #[test]
    fn empty_ranking_writes_nothing_but_creates_file() {
        let dir = tempdir().unwrap();
        let r = DictRanking::empty(dir.path().join("s.json"), dir.path());
        let out = dir.path().join("ranking.csv");
        save_ranking_csv(&r, &out).unwrap();
        assert!(out.exists());
    }
}
