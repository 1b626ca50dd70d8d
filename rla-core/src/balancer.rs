// This file is part of rla-core.
// The round-robin-seed-then-refine structure mirrors raire_algorithm.rs's
// general shape (build a cheap initial structure, then iteratively improve it
// against a cost function until no improving move remains) adapted here to
// longest-processing-time bin packing instead of assertion search.

//! The audit-board balancer (§4.4): splits a drawn sample across a fixed
//! number of audit boards so that no board is much more loaded than another,
//! while keeping every batch on exactly one board (physical ballot retrieval
//! for a batch must not be split across teams).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;
use crate::sampler::BallotDraw;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardAssignment {
    pub board_index: u32,
    pub draws: Vec<BallotDraw>,
}

/// Index of the largest (first, on ties) value in `loads`.
fn argmax(loads: &[u64]) -> usize {
    let mut best = 0;
    for i in 1..loads.len() {
        if loads[i] > loads[best] {
            best = i;
        }
    }
    best
}

/// Index of the smallest (first, on ties) value in `loads`.
fn argmin(loads: &[u64]) -> usize {
    let mut best = 0;
    for i in 1..loads.len() {
        if loads[i] < loads[best] {
            best = i;
        }
    }
    best
}

/// Split `draws` across `board_count` audit boards so that every batch stays
/// on a single board (§4.4's constraint).
///
/// Seeds boards round-robin over batches in manifest order (`batch i -> board
/// i mod B`), then refines with longest-processing-time: repeatedly find the
/// most- and least-loaded board and move a whole batch from the heavy board
/// to the light one if that strictly reduces the max load; stop at a local
/// optimum. Ties break by board index, the order boards were supplied in
/// (`argmax`/`argmin` both favor the lowest index), so equal inputs always
/// produce equal output.
pub fn assign_boards(draws: &[BallotDraw], manifest: &Manifest, board_count: u32) -> Vec<BoardAssignment> {
    let board_count = (board_count.max(1)) as usize;

    let mut by_batch: HashMap<&str, Vec<&BallotDraw>> = HashMap::new();
    for draw in draws {
        by_batch.entry(draw.batch_name.as_str()).or_default().push(draw);
    }

    // Manifest order, restricted to batches that actually had a ballot drawn.
    let ordered_batches: Vec<&str> = manifest
        .batches
        .iter()
        .map(|b| b.name.as_str())
        .filter(|name| by_batch.contains_key(name))
        .collect();

    let batch_load = |name: &str| by_batch[name].len() as u64;

    let mut board_batches: Vec<Vec<&str>> = vec![Vec::new(); board_count];
    for (i, &name) in ordered_batches.iter().enumerate() {
        board_batches[i % board_count].push(name);
    }

    loop {
        let loads: Vec<u64> = board_batches
            .iter()
            .map(|batches| batches.iter().map(|n| batch_load(n)).sum())
            .collect();
        let max_idx = argmax(&loads);
        let min_idx = argmin(&loads);
        if max_idx == min_idx {
            break;
        }
        let current_max = loads[max_idx];

        let move_pos = board_batches[max_idx].iter().position(|&name| {
            let bl = batch_load(name);
            let new_max = (loads[max_idx] - bl).max(loads[min_idx] + bl);
            new_max < current_max
        });

        match move_pos {
            Some(pos) => {
                let name = board_batches[max_idx].remove(pos);
                board_batches[min_idx].push(name);
            }
            None => break,
        }
    }

    board_batches
        .into_iter()
        .enumerate()
        .map(|(i, batches)| {
            let draws = batches
                .iter()
                .flat_map(|name| by_batch[name].iter().map(|d| (*d).clone()))
                .collect();
            BoardAssignment {
                board_index: i as u32,
                draws,
            }
        })
        .collect()
}
