//! In-memory audit state (§3 "Ambient addition — in-memory store model"): a
//! single election behind a `tokio::sync::RwLock`, mirroring the way the
//! original Flask service kept its audit state in a process-wide dict. A
//! single process serves a single audit; restarting the server forgets it,
//! same as the distilled spec's scope.

use std::collections::BTreeMap;

use rla_core::{
    AuditConfig, BallotDraw, Contest, Count, Manifest, Margins, Round, RoundStatus,
};

/// Everything known about the audit in progress.
#[derive(Default)]
pub struct Election {
    pub config: Option<AuditConfig>,
    pub contest: Option<Contest>,
    pub margins: Option<Margins>,
    pub manifest: Option<Manifest>,
    pub rounds: Vec<Round>,
}

impl Election {
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    pub fn current_round_mut(&mut self) -> Option<&mut Round> {
        self.rounds.last_mut()
    }

    /// Cumulative audited counts across every closed/audited round, keyed by
    /// candidate, as last reported. Callers hand in a full replacement each
    /// round rather than deltas (§6), so the latest round's map alone is
    /// already cumulative.
    pub fn latest_audited_counts(&self) -> BTreeMap<String, Count> {
        self.rounds
            .iter()
            .rev()
            .find(|r| r.status == RoundStatus::Audited || r.status == RoundStatus::Closed)
            .map(|r| r.audited_counts.clone())
            .unwrap_or_default()
    }

    pub fn all_draws(&self) -> Vec<BallotDraw> {
        self.rounds.iter().flat_map(|r| r.sample.clone()).collect()
    }
}

/// Process-wide handle to the single in-progress election.
pub type Store = tokio::sync::RwLock<Election>;

pub fn new_store() -> Store {
    tokio::sync::RwLock::new(Election::default())
}
