// This file is part of rla-core.
// The explicit state-machine-with-illegal-transition-errors idiom mirrors
// Arlo's own round lifecycle (original_source/arlo_server/__init__.py guards
// against drawing a second sample for an open round, or recording results for
// a round that was never drawn) translated into Rust's enum-plus-Result style
// rather than Python's ad hoc dict/flag checks.

//! The round orchestrator (§5 "Round"): owns the `PLANNED -> DRAWN -> AUDITED
//! -> CLOSED` lifecycle for a single round of a single contest's audit, and
//! ties together the sampler, balancer, and risk engine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::balancer::{self, BoardAssignment};
use crate::contest::{CandidateId, Count};
use crate::error::RlaError;
use crate::manifest::Manifest;
use crate::margins::Margins;
use crate::planner::SampleSizeMenu;
use crate::risk::{compute_risk, RiskResult};
use crate::sampler::{self, BallotDraw};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoundStatus {
    Planned,
    Drawn,
    Audited,
    Closed,
}

/// The result of evaluating a round's audited results against the risk
/// limit: either the contest's risk is confirmed and the audit can close, or
/// another round is required.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum RoundOutcome {
    Complete { p_value: f64 },
    Incomplete { p_value: f64 },
}

/// One round of auditing a single contest: the sample drawn for it, how it
/// was split across audit boards, and (once audited) the resulting risk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Round {
    pub round_num: u32,
    pub status: RoundStatus,
    pub sample_size: u64,
    /// A snapshot of the menu (§4.2) this round's `sample_size` was chosen
    /// from, kept for the audit report even after round_num > 1 auto-selects
    /// the 90% size without exposing the menu to a human.
    pub sample_size_options: Option<SampleSizeMenu>,
    pub sample: Vec<BallotDraw>,
    pub boards: Vec<BoardAssignment>,
    pub audited_counts: BTreeMap<CandidateId, Count>,
    pub risk: Option<RiskResult>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Round {
    /// A newly planned round: `round_num` is 1-indexed, `sample_size` is the
    /// option chosen from the planner's menu (§4.2). `started_at` is set now;
    /// `ended_at` is set only when the round closes.
    pub fn planned(round_num: u32, sample_size: u64) -> Self {
        Round {
            round_num,
            status: RoundStatus::Planned,
            sample_size,
            sample_size_options: None,
            sample: Vec::new(),
            boards: Vec::new(),
            audited_counts: BTreeMap::new(),
            risk: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Attach the menu snapshot this round's size was chosen from.
    pub fn with_menu(mut self, menu: SampleSizeMenu) -> Self {
        self.sample_size_options = Some(menu);
        self
    }

    fn require_status(&self, expected: RoundStatus) -> Result<(), RlaError> {
        if self.status != expected {
            return Err(RlaError::State(format!(
                "round {} is {:?}, expected {:?}",
                self.round_num, self.status, expected
            )));
        }
        Ok(())
    }

    /// Draw this round's sample and split it across `board_count` audit
    /// boards. `already_drawn` is the cumulative size of every prior round's
    /// sample for this contest (0 for round 1).
    pub fn draw_sample(
        &mut self,
        seed: &str,
        manifest: &Manifest,
        already_drawn: u64,
        board_count: u32,
    ) -> Result<(), RlaError> {
        self.require_status(RoundStatus::Planned)?;
        let draws = sampler::draw(seed, manifest, self.sample_size, already_drawn)?;
        debug!(
            "round {}: drew {} ballots ({} already drawn in prior rounds)",
            self.round_num,
            draws.len(),
            already_drawn
        );
        self.boards = balancer::assign_boards(&draws, manifest, board_count);
        self.sample = draws;
        self.status = RoundStatus::Drawn;
        Ok(())
    }

    /// Record the audit boards' findings: cumulative audited vote counts
    /// across every round so far (not just this one), then evaluate risk.
    pub fn record_results(
        &mut self,
        cumulative_audited_counts: BTreeMap<CandidateId, Count>,
        margins: &Margins,
        alpha: f64,
    ) -> Result<RoundOutcome, RlaError> {
        self.require_status(RoundStatus::Drawn)?;
        let risk = compute_risk(margins, &cumulative_audited_counts, alpha)?;
        let outcome = if risk.risk_limit_met {
            RoundOutcome::Complete { p_value: risk.p_value }
        } else {
            RoundOutcome::Incomplete { p_value: risk.p_value }
        };
        info!(
            "round {}: p_value={:.4} risk_limit_met={}",
            self.round_num, risk.p_value, risk.risk_limit_met
        );
        self.audited_counts = cumulative_audited_counts;
        self.risk = Some(risk);
        self.status = RoundStatus::Audited;
        Ok(outcome)
    }

    /// Close the round. A round can only close after being audited; whether
    /// the contest's overall audit is finished is a separate question the
    /// caller answers from this round's `risk`.
    pub fn close(&mut self) -> Result<(), RlaError> {
        self.require_status(RoundStatus::Audited)?;
        self.status = RoundStatus::Closed;
        self.ended_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::contest::Contest;
    use crate::manifest::Batch;
    use crate::margins::compute_margins;

    fn contest() -> Contest {
        let mut reported_votes = BTreeMap::new();
        reported_votes.insert("cand1".to_string(), Count(600));
        reported_votes.insert("cand2".to_string(), Count(400));
        Contest {
            id: "c".into(),
            reported_votes,
            total_ballots_cast: Count(1000),
            num_winners: 1,
            votes_allowed: 1,
        }
    }

    fn manifest() -> Manifest {
        Manifest {
            batches: vec![Batch {
                name: "pct 1".into(),
                num_ballots: 1000,
                storage_location: None,
                tabulator: None,
            }],
        }
    }

    #[test]
    fn full_lifecycle_completes_with_sufficient_evidence() {
        let config = AuditConfig::new(10.0, "deterministic-seed");
        let c = contest();
        let margins = compute_margins(&c, config.risk_limit).unwrap();
        let manifest = manifest();

        let mut round = Round::planned(1, 119);
        round
            .draw_sample(&config.random_seed, &manifest, 0, 2)
            .unwrap();
        assert_eq!(round.status, RoundStatus::Drawn);
        assert_eq!(round.sample.len(), 119);
        let total_on_boards: usize = round.boards.iter().map(|b| b.draws.len()).sum();
        assert_eq!(total_on_boards, 119);

        // Simulate the audit boards reporting counts consistent with the
        // contest's reported margin, rounded to the sample size.
        let mut audited = BTreeMap::new();
        audited.insert("cand1".to_string(), Count(72));
        audited.insert("cand2".to_string(), Count(47));
        let outcome = round.record_results(audited, &margins, config.risk_limit).unwrap();
        assert!(matches!(outcome, RoundOutcome::Complete { .. }));
        assert_eq!(round.status, RoundStatus::Audited);

        round.close().unwrap();
        assert_eq!(round.status, RoundStatus::Closed);
    }

    #[test]
    fn drawing_twice_is_rejected() {
        let config = AuditConfig::new(10.0, "seed");
        let manifest = manifest();
        let mut round = Round::planned(1, 50);
        round.draw_sample(&config.random_seed, &manifest, 0, 1).unwrap();
        let err = round.draw_sample(&config.random_seed, &manifest, 0, 1).unwrap_err();
        assert!(matches!(err, RlaError::State(_)));
    }

    #[test]
    fn recording_results_before_drawing_is_rejected() {
        let config = AuditConfig::new(10.0, "seed");
        let c = contest();
        let margins = compute_margins(&c, config.risk_limit).unwrap();
        let mut round = Round::planned(1, 50);
        let err = round
            .record_results(BTreeMap::new(), &margins, config.risk_limit)
            .unwrap_err();
        assert!(matches!(err, RlaError::State(_)));
    }

    #[test]
    fn closing_before_audited_is_rejected() {
        let mut round = Round::planned(1, 50);
        let err = round.close().unwrap_err();
        assert!(matches!(err, RlaError::State(_)));
    }

    #[test]
    fn insufficient_evidence_yields_incomplete_outcome() {
        let config = AuditConfig::new(10.0, "seed");
        let mut reported_votes = BTreeMap::new();
        reported_votes.insert("cand1".to_string(), Count(600));
        reported_votes.insert("cand2".to_string(), Count(200));
        reported_votes.insert("cand3".to_string(), Count(100));
        let c = Contest {
            id: "c".into(),
            reported_votes,
            total_ballots_cast: Count(900),
            num_winners: 1,
            votes_allowed: 1,
        };
        let margins = compute_margins(&c, config.risk_limit).unwrap();
        let manifest = Manifest {
            batches: vec![Batch {
                name: "pct 1".into(),
                num_ballots: 900,
                storage_location: None,
                tabulator: None,
            }],
        };
        let mut round = Round::planned(1, 25);
        round.draw_sample(&config.random_seed, &manifest, 0, 1).unwrap();
        let mut audited = BTreeMap::new();
        audited.insert("cand1".to_string(), Count(25));
        audited.insert("cand2".to_string(), Count(18));
        let outcome = round.record_results(audited, &margins, config.risk_limit).unwrap();
        assert!(matches!(outcome, RoundOutcome::Incomplete { .. }));
    }
}
