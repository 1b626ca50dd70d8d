// This file is part of rla-core.
// Deterministic hash-to-slot selection is grounded in the broader pack's use
// of SHA-256-family digests for reproducible, publicly-checkable selection
// (e.g. other_examples' CollisionAuditor, which derives a selection index
// from a BLAKE3 digest of public round data the same way). The exact
// digest-to-ticket mapping used by Arlo's own `sampler` dependency is not
// present in original_source/ (only its call sites are) so this is a
// documented Open-Question resolution — see SPEC_FULL.md §4.3 / DESIGN.md.

//! The deterministic sampler (§4.3): given a seed, a manifest, a target
//! size, and how many ballots were already drawn in prior rounds, produces a
//! reproducible ordered sequence of ballot draws.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::RlaError;
use crate::manifest::Manifest;

/// One entry in the sampler's output: a drawn ballot, its ticket number, and
/// how many times this physical ballot has been drawn so far (including this draw).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotDraw {
    /// Lexicographically sortable decimal encoding of the draw's pseudo-random fraction.
    pub ticket_number: String,
    pub batch_name: String,
    /// 1-indexed externally.
    pub position: u64,
    /// How many times this physical (batch, position) has been drawn so far,
    /// across the cumulative sample; first occurrence is 1.
    pub draw_index: u32,
}

/// Digest `seed || ":" || k` with SHA-256 and take the leading 8 bytes as a
/// big-endian u64 numerator over 2^64. 64 bits of hash entropy is vastly more
/// than any real manifest's slot count needs to make collisions astronomically
/// improbable, and keeps the arithmetic in plain integers/f64 rather than a
/// big-integer type.
fn ticket_numerator(seed: &str, k: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(b":");
    hasher.update(k.to_string().as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[0..8].try_into().expect("sha256 digest is 32 bytes"))
}

/// Render the numerator as a fixed-width, zero-padded 20-digit decimal string
/// representing the same fraction to 20 decimal digits of precision. Same-length
/// strings compare lexicographically exactly as their numeric values compare.
fn ticket_string(numerator: u64) -> String {
    let scaled = (numerator as u128 * 10u128.pow(20)) / (1u128 << 64);
    format!("{scaled:020}")
}

/// Map a ticket numerator to a global slot index in [0, total_ballots).
fn slot_for_ticket(numerator: u64, total_ballots: u64) -> u64 {
    let fraction = numerator as f64 / (u64::MAX as f64 + 1.0);
    let slot = (fraction * total_ballots as f64).floor() as u64;
    slot.min(total_ballots.saturating_sub(1))
}

/// Draw `size` ballots from `manifest` using `seed`, continuing from
/// `already_drawn` prior draws (0 for a first round). Draw `k` (global,
/// 1-indexed, `already_drawn+1 ..= already_drawn+size`) depends only on
/// `(seed, k)`, so this function satisfies, by construction:
///
/// - determinism: identical arguments produce identical output.
/// - the prefix property: `draw(seed, m, n, 0)` is a prefix of `draw(seed, m, n+k, 0)`.
/// - extension equivalence: `draw(seed, m, n2, n1) == draw(seed, m, n2, 0)[n1..]` for n1 <= n2.
pub fn draw(
    seed: &str,
    manifest: &Manifest,
    size: u64,
    already_drawn: u64,
) -> Result<Vec<BallotDraw>, RlaError> {
    manifest.validate()?;
    let total = manifest.total_ballots();
    if total == 0 {
        return Err(RlaError::InputValidation(
            "manifest has no ballots to sample".into(),
        ));
    }

    let mut seen_counts: HashMap<(String, u64), u32> = HashMap::new();
    let mut draws = Vec::with_capacity(size as usize);
    for k in (already_drawn + 1)..=(already_drawn + size) {
        let numerator = ticket_numerator(seed, k);
        let slot = slot_for_ticket(numerator, total);
        let ballot_slot = manifest.slot_at(slot).ok_or_else(|| {
            RlaError::Internal(format!("slot {slot} out of range for {total} ballots"))
        })?;
        let key = (ballot_slot.batch_name.clone(), ballot_slot.position);
        let draw_index = seen_counts.entry(key).or_insert(0);
        *draw_index += 1;
        draws.push(BallotDraw {
            ticket_number: ticket_string(numerator),
            batch_name: ballot_slot.batch_name,
            position: ballot_slot.position + 1,
            draw_index: *draw_index,
        });
    }
    Ok(draws)
}
