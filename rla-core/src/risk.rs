// This file is part of rla-core.
// The log-space accumulation of the BRAVO test statistic mirrors the same
// bravo_function quantity margins.rs grounds the ASN closed form on
// (raire::audit_type::BallotPollingBRAVO); here it is evaluated at the
// audited counts rather than solved for a sample size.

//! The risk engine (§4.5): given a contest's margins and the ballots audited
//! so far, computes each pair's BRAVO p-value and the contest's overall risk.

use serde::{Deserialize, Serialize};

use crate::contest::{CandidateId, Count};
use crate::error::RlaError;
use crate::margins::Margins;
use std::collections::BTreeMap;

/// Per-pair risk detail: the BRAVO p-value for one (winner, loser) pair given
/// how many audited ballots showed a vote for each.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairRisk {
    pub winner: CandidateId,
    pub loser: CandidateId,
    /// Ballots among those audited so far that showed a vote for `winner`
    /// over `loser` (i.e. excluding votes for other candidates or invalid
    /// ballots, which carry no information for this pair).
    pub audited_for_winner: u64,
    pub audited_for_loser: u64,
    /// 1 / T, the BRAVO martingale's reciprocal; the smaller, the stronger
    /// the evidence for the winner.
    pub p_value: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RiskResult {
    pub pairs: Vec<PairRisk>,
    /// max over pairs of p_value: the audit can only stop once every pair has
    /// cleared the risk limit, so the worst pair governs.
    pub p_value: f64,
    pub risk_limit_met: bool,
}

/// BRAVO p-value for a single pair given the diluted margin `s_w`
/// (reported_w / total_ballots_cast) and the audited counts favoring the
/// winner/loser respectively.
fn pair_p_value(s_w: f64, audited_for_winner: u64, audited_for_loser: u64) -> f64 {
    if audited_for_winner == 0 && audited_for_loser == 0 {
        return 1.0;
    }
    let ln_two_s = (2.0 * s_w).ln();
    let ln_two_1_minus_s = (2.0 * (1.0 - s_w)).ln();
    let log_t = audited_for_winner as f64 * ln_two_s + audited_for_loser as f64 * ln_two_1_minus_s;
    (-log_t).exp()
}

/// Compute risk for every pairwise margin given the cumulative audited vote
/// counts per candidate (the ballots physically examined so far, across all
/// rounds).
///
/// Only the governing pairs' candidates need audited counts; a candidate
/// missing from `audited_counts` is treated as having 0 audited votes so far
/// (e.g. before any ballots showing a vote for them have been drawn).
pub fn compute_risk(
    margins: &Margins,
    audited_counts: &BTreeMap<CandidateId, Count>,
    alpha: f64,
) -> Result<RiskResult, RlaError> {
    if margins.pairs.is_empty() {
        // Uncontested contest: no evidence needed, risk is trivially satisfied.
        return Ok(RiskResult {
            pairs: vec![],
            p_value: 0.0,
            risk_limit_met: true,
        });
    }

    let mut pairs = Vec::with_capacity(margins.pairs.len());
    for pair in &margins.pairs {
        let for_winner = audited_counts.get(&pair.winner).map(|c| c.0).unwrap_or(0);
        let for_loser = audited_counts.get(&pair.loser).map(|c| c.0).unwrap_or(0);
        let p_value = pair_p_value(pair.s_w, for_winner, for_loser);
        pairs.push(PairRisk {
            winner: pair.winner.clone(),
            loser: pair.loser.clone(),
            audited_for_winner: for_winner,
            audited_for_loser: for_loser,
            p_value,
        });
    }

    let p_value = pairs
        .iter()
        .map(|p| p.p_value)
        .fold(0.0_f64, f64::max);

    Ok(RiskResult {
        risk_limit_met: p_value <= alpha,
        pairs,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::Contest;
    use crate::margins::compute_margins;

    fn contest(votes: &[(&str, u64)], total: u64) -> Contest {
        let mut reported_votes = BTreeMap::new();
        for (name, n) in votes {
            reported_votes.insert(name.to_string(), Count(*n));
        }
        Contest {
            id: "c".into(),
            reported_votes,
            total_ballots_cast: Count(total),
            num_winners: 1,
            votes_allowed: 1,
        }
    }

    #[test]
    fn two_candidate_round_matches_worked_example() {
        let c = contest(&[("cand1", 600), ("cand2", 400)], 1000);
        let alpha = 0.10;
        let margins = compute_margins(&c, alpha).unwrap();
        let mut audited = BTreeMap::new();
        audited.insert("cand1".to_string(), Count(72));
        audited.insert("cand2".to_string(), Count(47));
        let risk = compute_risk(&margins, &audited, alpha).unwrap();
        assert!((risk.p_value - 0.0714).abs() < 0.001, "p_value was {}", risk.p_value);
        assert!(risk.risk_limit_met);
    }

    #[test]
    fn insufficient_round_does_not_meet_risk_limit() {
        let c = contest(&[("cand1", 600), ("cand2", 200), ("cand3", 100)], 900);
        let alpha = 0.10;
        let margins = compute_margins(&c, alpha).unwrap();
        let mut audited = BTreeMap::new();
        audited.insert("cand1".to_string(), Count(25));
        audited.insert("cand2".to_string(), Count(18));
        let risk = compute_risk(&margins, &audited, alpha).unwrap();
        assert!(
            (risk.p_value - 1.11).abs() < 0.01,
            "p_value was {}, expected ~1.11",
            risk.p_value
        );
        assert!(!risk.risk_limit_met, "p_value {} should exceed alpha {alpha}", risk.p_value);
    }

    #[test]
    fn no_audited_ballots_yields_p_value_one() {
        let c = contest(&[("cand1", 600), ("cand2", 400)], 1000);
        let alpha = 0.10;
        let margins = compute_margins(&c, alpha).unwrap();
        let risk = compute_risk(&margins, &BTreeMap::new(), alpha).unwrap();
        assert_eq!(risk.p_value, 1.0);
        assert!(!risk.risk_limit_met);
    }

    #[test]
    fn uncontested_contest_is_always_satisfied() {
        let c = contest(&[("cand1", 100)], 100);
        let alpha = 0.10;
        let margins = compute_margins(&c, alpha).unwrap();
        let risk = compute_risk(&margins, &BTreeMap::new(), alpha).unwrap();
        assert!(risk.risk_limit_met);
        assert_eq!(risk.p_value, 0.0);
    }

    #[test]
    fn more_winner_votes_at_constant_total_strictly_lowers_p_value() {
        let c = contest(&[("cand1", 600), ("cand2", 400)], 1000);
        let alpha = 0.10;
        let margins = compute_margins(&c, alpha).unwrap();
        let total = 100u64;
        let mut previous = f64::INFINITY;
        for winner_votes in 50..=90 {
            let mut audited = BTreeMap::new();
            audited.insert("cand1".to_string(), Count(winner_votes));
            audited.insert("cand2".to_string(), Count(total - winner_votes));
            let risk = compute_risk(&margins, &audited, alpha).unwrap();
            assert!(
                risk.p_value < previous,
                "p_value should strictly decrease as winner's share grows at fixed total (winner_votes={winner_votes})"
            );
            previous = risk.p_value;
        }
    }
}
