//! Per-phase outcomes collected while a campaign runs, for the final summary.
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::campaign::Phase;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseStatus {
    Completed,
    Declined,
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub found_before: u64,
    pub found_after: u64,
    pub elapsed: Duration,
}

impl PhaseOutcome {
    pub fn gained(&self) -> u64 {
        self.found_after.saturating_sub(self.found_before)
    }
}

#[derive(Debug, Clone)]
pub struct CampaignStats {
    pub started: DateTime<Local>,
    pub finished: Option<DateTime<Local>>,
    pub outcomes: Vec<PhaseOutcome>,
}

impl Default for CampaignStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignStats {
    pub fn new() -> Self {
        Self {
            started: Local::now(),
            finished: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: PhaseOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.finished = Some(Local::now());
    }

    pub fn total_gained(&self) -> u64 {
        self.outcomes.iter().map(PhaseOutcome::gained).sum()
    }

    /// Recovered count after the last phase, or 0 before any ran.
    pub fn final_count(&self) -> u64 {
        self.outcomes.last().map(|o| o.found_after).unwrap_or(0)
    }

    /// Phase with the largest gain; earliest wins a tie.
    pub fn most_productive(&self) -> Option<&PhaseOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.gained() > 0)
            .fold(None, |best: Option<&PhaseOutcome>, o| match best {
                Some(b) if b.gained() >= o.gained() => Some(b),
                _ => Some(o),
            })
    }
}
