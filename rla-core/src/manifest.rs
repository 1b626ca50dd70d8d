// This file is part of rla-core.

//! The ballot manifest (§3 "Manifest"): an ordered sequence of batches, each
//! with a stable name and ballot count, and the canonical linearization the
//! sampler draws slots from.

use serde::{Deserialize, Serialize};

use crate::error::RlaError;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Batch {
    pub name: String,
    pub num_ballots: u64,
    pub storage_location: Option<String>,
    pub tabulator: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Manifest {
    pub batches: Vec<Batch>,
}

/// A ballot slot's position in the manifest: which batch, and its 0-indexed
/// position within that batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BallotSlot {
    pub batch_name: String,
    /// 0-indexed internally; callers presenting this externally add 1.
    pub position: u64,
}

impl Manifest {
    pub fn total_ballots(&self) -> u64 {
        self.batches.iter().map(|b| b.num_ballots).sum()
    }

    /// Validate batch names are unique and every count is positive.
    pub fn validate(&self) -> Result<(), RlaError> {
        if self.batches.is_empty() {
            return Err(RlaError::InputValidation(
                "manifest has no batches".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for batch in &self.batches {
            if batch.name.trim().is_empty() {
                return Err(RlaError::InputValidation(
                    "batch name must not be empty".into(),
                ));
            }
            if batch.num_ballots == 0 {
                return Err(RlaError::InputValidation(format!(
                    "batch {:?} has a non-positive ballot count",
                    batch.name
                )));
            }
            if !seen.insert(&batch.name) {
                return Err(RlaError::InputValidation(format!(
                    "duplicate batch name {:?}",
                    batch.name
                )));
            }
        }
        Ok(())
    }

    /// Map a global slot index (0-indexed, over the canonical linearization:
    /// batches in manifest order, positions 0..N_b within each batch) to its
    /// (batch_name, position).
    pub fn slot_at(&self, global_index: u64) -> Option<BallotSlot> {
        let mut offset = 0u64;
        for batch in &self.batches {
            if global_index < offset + batch.num_ballots {
                return Some(BallotSlot {
                    batch_name: batch.name.clone(),
                    position: global_index - offset,
                });
            }
            offset += batch.num_ballots;
        }
        None
    }
}
