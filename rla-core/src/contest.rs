// This file is part of rla-core.
// The wrapper-type style (newtype around usize/u32, zero-cost) is grounded in
// raire::irv::BallotPaperCount / CandidateIndex.

//! The single targeted contest this audit engine operates on (§3 "Contest").
//! Multi-contest audits are a Non-goal; `setup_next_round` rejects a second
//! contest at the orchestrator layer, not here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RlaError;

/// A count of ballots or votes. A thin wrapper so a count is never accidentally
/// added to a candidate id or a percentage.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Count(pub u64);

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl fmt::Debug for Count {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate identified by name. Names, not synthetic indices, are the
/// natural key here: the spec's data model keys the candidate->votes map by
/// name and the order is explicitly irrelevant.
pub type CandidateId = String;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contest {
    pub id: String,
    /// candidate -> reported votes. Order is irrelevant; a BTreeMap gives a
    /// stable iteration order for free, which keeps margin/ASN output
    /// deterministic without an explicit sort step.
    pub reported_votes: BTreeMap<CandidateId, Count>,
    pub total_ballots_cast: Count,
    pub num_winners: u32,
    pub votes_allowed: u32,
}

impl Contest {
    /// Validate the invariant: sum of candidate votes <= total ballots * votes_allowed.
    pub fn validate(&self) -> Result<(), RlaError> {
        if self.num_winners == 0 {
            return Err(RlaError::InputValidation(
                "num_winners must be at least 1".into(),
            ));
        }
        if self.votes_allowed == 0 {
            return Err(RlaError::InputValidation(
                "votes_allowed must be at least 1".into(),
            ));
        }
        if (self.num_winners as usize) > self.reported_votes.len() {
            return Err(RlaError::InputValidation(format!(
                "num_winners ({}) exceeds number of candidates ({})",
                self.num_winners,
                self.reported_votes.len()
            )));
        }
        let total_votes: u64 = self.reported_votes.values().map(|c| c.0).sum();
        let allowed = self.total_ballots_cast.0 * self.votes_allowed as u64;
        if total_votes > allowed {
            return Err(RlaError::InputValidation(format!(
                "{} votes cast in contest {:?} exceeds {} ballots * {} votes allowed = {}",
                total_votes, self.id, self.total_ballots_cast.0, self.votes_allowed, allowed
            )));
        }
        Ok(())
    }

    /// Candidates ranked by reported votes, highest first. Ties are broken by
    /// candidate name so the ranking (and hence winner/loser split) is
    /// reproducible without depending on map iteration order.
    pub fn ranked_candidates(&self) -> Vec<(&CandidateId, Count)> {
        let mut ranked: Vec<(&CandidateId, Count)> =
            self.reported_votes.iter().map(|(k, v)| (k, *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// The top `num_winners` candidates by reported votes, and the rest.
    pub fn winners_and_losers(&self) -> (Vec<&CandidateId>, Vec<&CandidateId>) {
        let ranked = self.ranked_candidates();
        let split = (self.num_winners as usize).min(ranked.len());
        let winners = ranked[..split].iter().map(|(id, _)| *id).collect();
        let losers = ranked[split..].iter().map(|(id, _)| *id).collect();
        (winners, losers)
    }

    pub fn is_uncontested(&self) -> bool {
        let (_, losers) = self.winners_and_losers();
        losers.is_empty()
    }
}
