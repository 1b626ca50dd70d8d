// This file is part of rla-core.
// The Monte-Carlo stopping-probability sizing is grounded in
// tests/test_sampler.py's `simulate_bravo` / `get_sample_sizes` behavior
// (original_source/), which runs repeated trials and reports the size at
// which a target fraction of trials has stopped; tolerance-based assertions
// on its output (rather than exact hardcoded values) mirror that test file's
// own style.

//! The sample-size planner (§4.2): produces a menu of candidate sample
//! sizes for the next round.

use rand::Rng;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::AuditConfig;
use crate::margins::Margins;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum SampleSizeType {
    Asn,
    StoppingProbability,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleSizeOption {
    #[serde(rename = "type")]
    pub kind: SampleSizeType,
    /// The stopping probability this option targets (ASN's own closed-form
    /// probability for the ASN option; 0.70/0.80/0.90 etc. for the others).
    /// Rounded to two decimals to match the spec's documented scalar-not-tuple
    /// resolution of the ASN option's `prob` field.
    pub prob: f64,
    pub size: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SampleSizeMenu {
    pub options: Vec<SampleSizeOption>,
}

impl SampleSizeMenu {
    pub fn asn_option(&self) -> Option<&SampleSizeOption> {
        self.options.iter().find(|o| o.kind == SampleSizeType::Asn)
    }

    /// The size at the configured auto-select target (round_num > 1 always uses
    /// this), falling back to the ASN size if the target isn't present (e.g. a
    /// multi-winner contest where no single s_w governs a clean percentile).
    pub fn size_at_or_near(&self, target_prob: f64) -> u64 {
        self.options
            .iter()
            .filter(|o| o.kind == SampleSizeType::StoppingProbability)
            .min_by(|a, b| {
                (a.prob - target_prob)
                    .abs()
                    .partial_cmp(&(b.prob - target_prob).abs())
                    .unwrap()
            })
            .map(|o| o.size)
            .or_else(|| self.asn_option().map(|o| o.size))
            .unwrap_or(0)
    }
}

/// Run one BRAVO SPRT trial: draw Bernoulli(p_w) outcomes (1 = vote for winner, 0
/// = vote for loser) starting from `sample_w`/`sample_r` already-observed votes,
/// accumulating the log-likelihood ratio, until it exceeds `ln(1/alpha)` or the
/// trial runs past `max_draws` without stopping.
///
/// Returns `Some(total_draws_to_stop)` or `None` if it never stopped within
/// `max_draws`.
fn simulate_one_trial(
    rng: &mut ChaCha8Rng,
    s_w: f64,
    p_w_urn: f64,
    sample_w: u64,
    sample_r: u64,
    alpha: f64,
    max_draws: u64,
) -> Option<u64> {
    let threshold = (1.0 / alpha).ln();
    let ln_two_s = (2.0 * s_w).ln();
    let ln_two_1_minus_s = (2.0 * (1.0 - s_w)).ln();
    let mut log_t = sample_w as f64 * ln_two_s + sample_r as f64 * ln_two_1_minus_s;
    let mut draws = sample_w + sample_r;
    if log_t > threshold {
        return Some(draws);
    }
    while draws < max_draws {
        let vote_for_winner = rng.gen_bool(p_w_urn);
        log_t += if vote_for_winner { ln_two_s } else { ln_two_1_minus_s };
        draws += 1;
        if log_t > threshold {
            return Some(draws);
        }
    }
    None
}

/// Smallest `n` (<= `max_draws`) for which at least `target_prob * trials` of
/// `trials` independent simulated trials have stopped by draw `n`.
fn stopping_size(
    seed_offset: u64,
    s_w: f64,
    sample_w: u64,
    sample_r: u64,
    alpha: f64,
    target_prob: f64,
    trials: u32,
    max_draws: u64,
) -> u64 {
    let mut rng = ChaCha8Rng::seed_from_u64(seed_offset);
    let mut stopping_draws: Vec<u64> = (0..trials)
        .filter_map(|_| {
            simulate_one_trial(&mut rng, s_w, s_w, sample_w, sample_r, alpha, max_draws)
        })
        .collect();
    stopping_draws.sort_unstable();
    let need = (target_prob * trials as f64).ceil() as usize;
    if need == 0 {
        return sample_w + sample_r;
    }
    if stopping_draws.len() < need {
        // Fewer trials stopped than required even at max_draws: report max_draws,
        // the largest size this simulation can vouch for.
        return max_draws;
    }
    stopping_draws[need - 1]
}

/// Build the sample-size menu for a contest given its margins and the
/// cumulative sample results so far (zeros in round 0).
pub fn sample_size_menu(
    margins: &Margins,
    sample_w: u64,
    sample_r: u64,
    config: &AuditConfig,
) -> SampleSizeMenu {
    if margins.asn == 0 {
        // Uncontested: every option is 0, matching spec.md scenario 3.
        return SampleSizeMenu {
            options: vec![
                SampleSizeOption {
                    kind: SampleSizeType::Asn,
                    prob: 1.0,
                    size: 0,
                },
                SampleSizeOption {
                    kind: SampleSizeType::StoppingProbability,
                    prob: 0.70,
                    size: 0,
                },
                SampleSizeOption {
                    kind: SampleSizeType::StoppingProbability,
                    prob: 0.80,
                    size: 0,
                },
                SampleSizeOption {
                    kind: SampleSizeType::StoppingProbability,
                    prob: 0.90,
                    size: 0,
                },
            ],
        };
    }

    let alpha = config.risk_limit;
    let s_w = margins.s_w;
    let asn_size = margins.asn;
    // Stopping probability of reaching the test's threshold by exactly the ASN
    // size, estimated with the same simulator used for the percentile options.
    let asn_prob = stopping_size_probability(s_w, sample_w, sample_r, alpha, asn_size, config);

    let mut options = vec![SampleSizeOption {
        kind: SampleSizeType::Asn,
        prob: round2(asn_prob),
        size: asn_size,
    }];

    for (i, &target) in config.stopping_probabilities.iter().enumerate() {
        let max_draws = (asn_size * 4).max(200);
        let size = stopping_size(
            // distinct seed per percentile so the three simulations are independent,
            // while remaining fully reproducible for fixed config.
            0x5A17_u64.wrapping_add(i as u64),
            s_w,
            sample_w,
            sample_r,
            alpha,
            target,
            config.monte_carlo_trials,
            max_draws,
        );
        options.push(SampleSizeOption {
            kind: SampleSizeType::StoppingProbability,
            prob: round2(target),
            size,
        });
    }

    SampleSizeMenu { options }
}

/// Fraction of simulated trials that stop by exactly `size` draws; used only to
/// report the ASN option's own stopping probability.
fn stopping_size_probability(
    s_w: f64,
    sample_w: u64,
    sample_r: u64,
    alpha: f64,
    size: u64,
    config: &AuditConfig,
) -> f64 {
    let mut rng = ChaCha8Rng::seed_from_u64(0xA58E_u64);
    let trials = config.monte_carlo_trials;
    let stopped = (0..trials)
        .filter(|_| {
            simulate_one_trial(&mut rng, s_w, s_w, sample_w, sample_r, alpha, size).is_some()
        })
        .count();
    stopped as f64 / trials as f64
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contest::{Contest, Count};
    use crate::margins::compute_margins;
    use std::collections::BTreeMap;

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
    fn asn_lower_bound_holds_for_two_candidate_contest() {
        let c = contest(&[("cand1", 600), ("cand2", 400)], 1000);
        let config = AuditConfig::new(10.0, "seed");
        let margins = compute_margins(&c, config.risk_limit).unwrap();
        assert_eq!(margins.asn, 119);
        let menu = sample_size_menu(&margins, 0, 0, &config);
        let asn_size = menu.asn_option().unwrap().size;
        let ninety = menu.size_at_or_near(0.90);
        assert!(asn_size <= ninety, "ASN {asn_size} should be <= 90% size {ninety}");
    }

    #[test]
    fn three_candidate_asn_matches_worked_example() {
        let c = contest(&[("cand1", 600), ("cand2", 200), ("cand3", 100)], 900);
        let config = AuditConfig::new(10.0, "seed");
        let margins = compute_margins(&c, config.risk_limit).unwrap();
        assert_eq!(margins.asn, 22);
    }

    #[test]
    fn uncontested_menu_is_all_zero() {
        let c = contest(&[("cand1", 100)], 100);
        let config = AuditConfig::new(10.0, "seed");
        let margins = compute_margins(&c, config.risk_limit).unwrap();
        assert_eq!(margins.asn, 0);
        let menu = sample_size_menu(&margins, 0, 0, &config);
        assert!(menu.options.iter().all(|o| o.size == 0));
    }

    #[test]
    fn stopping_sizes_increase_with_target_probability() {
        let c = contest(&[("cand1", 600), ("cand2", 400)], 1000);
        let mut config = AuditConfig::new(10.0, "seed");
        config.monte_carlo_trials = 2_000; // keep the test fast; still representative
        let margins = compute_margins(&c, config.risk_limit).unwrap();
        let menu = sample_size_menu(&margins, 0, 0, &config);
        let p70 = menu.size_at_or_near(0.70);
        let p80 = menu.size_at_or_near(0.80);
        let p90 = menu.size_at_or_near(0.90);
        assert!(p70 <= p80, "70% size {p70} should be <= 80% size {p80}");
        assert!(p80 <= p90, "80% size {p80} should be <= 90% size {p90}");
        // Worked example in spec.md: 70% ~130, 80% ~170, 90% ~243 for this contest.
        // Generous tolerance: this is a different Monte-Carlo implementation (see
        // SPEC_FULL.md §4.2), verified here for right order of magnitude only.
        assert!(p90 > 150 && p90 < 400, "90% size {p90} out of plausible range");
    }
}
