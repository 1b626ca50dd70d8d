// This file is part of rla-core.
// The ASN closed form is grounded in raire::audit_type::BallotPollingBRAVO::
// bravo_function, which computes the identical quantity for ballot-polling
// BRAVO audits. See SPEC_FULL.md §4.1 / DESIGN.md for the discrepancy this
// resolves against the prose form in the distilled spec.
//
// Auditability and the ASN closed form are gated on the two-way pairwise share
// (reported_w / (reported_w + reported_l)); the s_w fed to the risk engine and
// the planner is the diluted share (reported_w / total_ballots_cast). The two
// coincide in a two-candidate contest but diverge with 3+ candidates — see
// DESIGN.md's open question on this for the fixture this is grounded on.

//! Margin and Average Sample Number (ASN) calculation (§4.1).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::contest::{CandidateId, Contest};
use crate::error::RlaError;

/// The pairwise margin for one (winner, loser) pair, plus its ASN at a given risk limit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PairMargin {
    pub winner: CandidateId,
    pub loser: CandidateId,
    /// Winner's reported vote share of *all* ballots cast for the contest
    /// (reported_w / total_ballots_cast) — the diluted margin, not the
    /// two-way winner+loser share. This is the value the risk engine and
    /// the planner's urn both read as the BRAVO statistic's `s`; auditability
    /// itself is still gated on the two-way share (see `compute_margins`).
    pub s_w: f64,
    /// Average Sample Number for this pair at the configured risk limit. Infinite
    /// if the pair isn't auditable (two-way share <= 0.5).
    pub asn: f64,
}

/// Representative margin summary plus the full set of pairwise margins and the
/// contest's ASN (max over all pairs).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Margins {
    /// Winner's two-way share of the closest (governing) pair: reported_w / (reported_w + reported_l).
    pub p_w: f64,
    /// Loser's two-way share of the closest (governing) pair: reported_l / (reported_w + reported_l).
    pub p_r: f64,
    /// The governing pair's diluted margin: reported_w / total_ballots_cast.
    /// Fed directly to the risk engine and the planner's urn as the BRAVO `s`.
    pub s_w: f64,
    pub pairs: Vec<PairMargin>,
    /// ceil(max over pairs of ASN_wl); 0 if the contest is uncontested.
    pub asn: u64,
}

/// ASN closed form for a single (winner, loser) pair, reported tallies `w`, `l`
/// out of `total_ballots` auditable ballots, at risk limit `alpha`.
///
/// `w <= l` is treated as non-auditable (infinite ASN), matching the spec's
/// "s_wl > 0.5" invariant.
pub fn pair_asn(w: u64, l: u64, total_ballots: u64, alpha: f64) -> f64 {
    if w <= l || total_ballots == 0 {
        return f64::INFINITY;
    }
    let w = w as f64;
    let l = l as f64;
    let n = total_ballots as f64;
    let s = w / (w + l);
    let two_s = 2.0 * s;
    let ln_two_s = two_s.ln();
    let numerator = 0.5 * ln_two_s - alpha.ln();
    // l * ln(2*(1-s)) -> 0 in the limit l -> 0 (a loser with no reported votes),
    // even though ln(2*(1-s)) alone diverges; avoid the 0 * -inf = NaN trap.
    let loser_term = if l == 0.0 { 0.0 } else { l * (2.0 - two_s).ln() };
    let denominator = (w * ln_two_s + loser_term) / n;
    numerator / denominator
}

/// Compute margins and ASN for a contest at the given risk limit.
///
/// Errors with `RlaError::Unauditable` if any reported (winner, loser) pair has
/// `s_wl <= 0.5` — that is fatal for the whole audit, surfaced before any round starts.
pub fn compute_margins(contest: &Contest, alpha: f64) -> Result<Margins, RlaError> {
    contest.validate()?;
    let (winners, losers) = contest.winners_and_losers();
    let votes: &BTreeMap<CandidateId, _> = &contest.reported_votes;

    if losers.is_empty() {
        return Ok(Margins {
            p_w: 1.0,
            p_r: 0.0,
            s_w: 1.0,
            pairs: vec![],
            asn: 0,
        });
    }

    let total = contest.total_ballots_cast.0;
    let mut pairs = Vec::with_capacity(winners.len() * losers.len());
    // Two-way share per pair, parallel to `pairs`: used only to gate auditability
    // and to pick the governing pair below, never stored or reported downstream.
    let mut two_way_shares = Vec::with_capacity(winners.len() * losers.len());
    for &winner in &winners {
        let w = votes[winner].0;
        for &loser in &losers {
            let l = votes[loser].0;
            let two_way = if w + l == 0 { 0.5 } else { w as f64 / (w + l) as f64 };
            if two_way <= 0.5 {
                return Err(RlaError::Unauditable(format!(
                    "reported margin for ({winner}, {loser}) is {two_way:.4}, not > 0.5"
                )));
            }
            let asn = pair_asn(w, l, total, alpha);
            let diluted = w as f64 / total as f64;
            pairs.push(PairMargin {
                winner: winner.clone(),
                loser: loser.clone(),
                s_w: diluted,
                asn,
            });
            two_way_shares.push(two_way);
        }
    }

    // The governing pair is the one with the smallest two-way margin (closest to
    // 0.5): it's both the hardest to confirm and (per the ASN formula above) the
    // one with the largest ASN, so the two selections coincide.
    let governing_index = (0..pairs.len())
        .min_by(|&a, &b| two_way_shares[a].partial_cmp(&two_way_shares[b]).unwrap())
        .expect("non-empty: losers is non-empty");
    let governing = &pairs[governing_index];
    let p_w = two_way_shares[governing_index];
    let p_r = 1.0 - p_w;
    let s_w = governing.s_w;

    let asn = pairs
        .iter()
        .map(|p| p.asn)
        .fold(0.0_f64, f64::max)
        .ceil() as u64;

    Ok(Margins {
        p_w,
        p_r,
        s_w,
        pairs,
        asn,
    })
}
