//! Human-readable report rendering for terminal output.
//!
//! Produces the dictionary ranking table and the end-of-campaign summary: what
//! each phase recovered, how long it took, and how it ended.
use std::time::Duration;

use colored::*;

use crate::campaign::Phase;
use crate::ranking::DictRanking;
use crate::stats::{CampaignStats, PhaseStatus};

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(visible_len(title)));
    s.push_str("\n\n");
    s
}

fn format_elapsed(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

pub fn render_ranking(ranking: &DictRanking) -> String {
    let mut out = section_header(&"Dictionary Ranking".bold().yellow().to_string());
    let standings = ranking.standings();
    if standings.is_empty() {
        out.push_str("(No dictionary statistics yet)\n");
        return out;
    }
    for (i, (name, score)) in standings.iter().enumerate() {
        let score = if *score > 0 {
            format!("{:>6}", score).green().to_string()
        } else {
            format!("{:>6}", score).dimmed().to_string()
        };
        out.push_str(&format!("{:>3}. | {} | {}\n", i + 1, score, name));
    }
    out
}

fn status_label(status: &PhaseStatus) -> String {
    match status {
        PhaseStatus::Completed => "completed".green().to_string(),
        PhaseStatus::Declined => "skipped".dimmed().to_string(),
        PhaseStatus::Aborted(reason) => format!("{}: {}", "aborted".red(), reason),
    }
}

pub fn render_summary(stats: &CampaignStats, ranking: &DictRanking) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "pownmyhash: Campaign Results".bold().cyan()));
    out.push_str(&format!(
        "Started: {}\n",
        stats.started.format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some(end) = stats.finished {
        let took = (end - stats.started).to_std().unwrap_or_default();
        out.push_str(&format!(
            "Finished: {} ({})\n",
            end.format("%Y-%m-%d %H:%M:%S"),
            format_elapsed(took)
        ));
    }

    out.push_str(&section_header(&"Phases".bold().blue().to_string()));
    if stats.outcomes.is_empty() {
        out.push_str("(No phase selected)\n");
    }
    for o in &stats.outcomes {
        out.push_str(&format!(
            "{}\n  Recovered: +{} ({} -> {})\n  Duration: {}\n  Status: {}\n",
            o.phase.to_string().bold(),
            o.gained(),
            o.found_before,
            o.found_after,
            format_elapsed(o.elapsed),
            status_label(&o.status)
        ));
    }

    out.push_str(&section_header(&"Totals".bold().blue().to_string()));
    out.push_str(&format!("Passwords recovered: {}\n", stats.final_count()));
    out.push_str(&format!("New this campaign: {}\n", stats.total_gained()));
    let best = stats
        .most_productive()
        .map(|o| o.phase.to_string())
        .unwrap_or_else(|| "(none)".to_string());
    out.push_str(&format!("Most productive phase: {}\n", best));

    out.push_str(&render_ranking(ranking));
    out
}

/// Compact one-line list used when logging the chosen order.
pub fn render_order(phases: &[Phase]) -> String {
    phases
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
