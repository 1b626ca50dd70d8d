//! Integration tests exercising the full pipeline (margins -> planner ->
//! sampler -> balancer -> round) against the concrete scenarios used to
//! validate this crate's formulas during development (see DESIGN.md).

use std::collections::BTreeMap;

use rla_core::{compute_margins, AuditConfig, Batch, Contest, Count, Manifest, Round, RoundOutcome};

fn two_candidate_contest() -> Contest {
    let mut reported_votes = BTreeMap::new();
    reported_votes.insert("cand1".to_string(), Count(600));
    reported_votes.insert("cand2".to_string(), Count(400));
    Contest {
        id: "two-candidate".into(),
        reported_votes,
        total_ballots_cast: Count(1000),
        num_winners: 1,
        votes_allowed: 1,
    }
}

#[test]
fn two_candidate_asn_is_119() {
    let config = AuditConfig::new(10.0, "fixture-seed");
    let margins = compute_margins(&two_candidate_contest(), config.risk_limit).unwrap();
    assert_eq!(margins.asn, 119);
    assert!((margins.s_w - 0.6).abs() < 1e-9);
}

#[test]
fn three_candidate_asn_is_22() {
    let mut reported_votes = BTreeMap::new();
    reported_votes.insert("cand1".to_string(), Count(600));
    reported_votes.insert("cand2".to_string(), Count(200));
    reported_votes.insert("cand3".to_string(), Count(100));
    let contest = Contest {
        id: "three-candidate".into(),
        reported_votes,
        total_ballots_cast: Count(900),
        num_winners: 1,
        votes_allowed: 1,
    };
    let config = AuditConfig::new(10.0, "fixture-seed");
    let margins = compute_margins(&contest, config.risk_limit).unwrap();
    assert_eq!(margins.asn, 22);
}

#[test]
fn three_candidate_margins_use_two_way_shares_but_a_diluted_governing_s_w() {
    let mut reported_votes = BTreeMap::new();
    reported_votes.insert("cand1".to_string(), Count(600));
    reported_votes.insert("cand2".to_string(), Count(200));
    reported_votes.insert("cand3".to_string(), Count(100));
    let contest = Contest {
        id: "three-candidate".into(),
        reported_votes,
        total_ballots_cast: Count(900),
        num_winners: 1,
        votes_allowed: 1,
    };
    let config = AuditConfig::new(10.0, "fixture-seed");
    let margins = compute_margins(&contest, config.risk_limit).unwrap();
    // Governing pair is (cand1, cand2): two-way shares 600/800 and 200/800.
    assert!((margins.p_w - 0.75).abs() < 1e-9, "p_w was {}", margins.p_w);
    assert!((margins.p_r - 0.25).abs() < 1e-9, "p_r was {}", margins.p_r);
    // But the s_w fed to the risk engine/planner is diluted by all 900 ballots.
    assert!((margins.s_w - 2.0 / 3.0).abs() < 1e-9, "s_w was {}", margins.s_w);
}

#[test]
fn uncontested_contest_needs_no_sample() {
    let mut reported_votes = BTreeMap::new();
    reported_votes.insert("cand1".to_string(), Count(1000));
    let contest = Contest {
        id: "uncontested".into(),
        reported_votes,
        total_ballots_cast: Count(1000),
        num_winners: 1,
        votes_allowed: 1,
    };
    let config = AuditConfig::new(10.0, "fixture-seed");
    let margins = compute_margins(&contest, config.risk_limit).unwrap();
    assert_eq!(margins.asn, 0);
    assert!(margins.pairs.is_empty());
}

#[test]
fn margin_at_or_below_half_is_unauditable() {
    let mut reported_votes = BTreeMap::new();
    reported_votes.insert("cand1".to_string(), Count(500));
    reported_votes.insert("cand2".to_string(), Count(500));
    let contest = Contest {
        id: "tied".into(),
        reported_votes,
        total_ballots_cast: Count(1000),
        num_winners: 1,
        votes_allowed: 1,
    };
    let config = AuditConfig::new(10.0, "fixture-seed");
    let err = compute_margins(&contest, config.risk_limit).unwrap_err();
    assert!(matches!(err, rla_core::RlaError::Unauditable(_)));
}

#[test]
fn full_round_completes_with_a_margin_confirming_sample() {
    let config = AuditConfig::new(10.0, "fixture-seed");
    let contest = two_candidate_contest();
    let margins = compute_margins(&contest, config.risk_limit).unwrap();

    let manifest = Manifest {
        batches: vec![
            Batch {
                name: "pct 1".into(),
                num_ballots: 500,
                storage_location: None,
                tabulator: None,
            },
            Batch {
                name: "pct 2".into(),
                num_ballots: 500,
                storage_location: None,
                tabulator: None,
            },
        ],
    };

    let mut round = Round::planned(1, margins.asn);
    round
        .draw_sample(&config.random_seed, &manifest, 0, config.audit_board_member_count)
        .unwrap();
    assert_eq!(round.sample.len(), margins.asn as usize);

    // Every drawn ballot lands on exactly one board, and every batch stays
    // whole on a single board (two batches, two boards here, so each board
    // gets exactly one batch).
    let sizes: Vec<usize> = round.boards.iter().map(|b| b.draws.len()).collect();
    assert_eq!(sizes.iter().sum::<usize>(), margins.asn as usize);
    for board in &round.boards {
        let batches: std::collections::HashSet<&str> =
            board.draws.iter().map(|d| d.batch_name.as_str()).collect();
        assert!(batches.len() <= 1, "board should carry at most one batch here");
    }

    let mut audited = BTreeMap::new();
    audited.insert("cand1".to_string(), Count(72));
    audited.insert("cand2".to_string(), Count(47));
    let outcome = round.record_results(audited, &margins, config.risk_limit).unwrap();
    assert!(matches!(outcome, RoundOutcome::Complete { .. }));
    round.close().unwrap();
}

#[test]
fn a_second_round_continues_the_same_draw_sequence() {
    let config = AuditConfig::new(10.0, "fixture-seed");
    let manifest = Manifest {
        batches: vec![Batch {
            name: "pct 1".into(),
            num_ballots: 1000,
            storage_location: None,
            tabulator: None,
        }],
    };

    let mut round1 = Round::planned(1, 40);
    round1.draw_sample(&config.random_seed, &manifest, 0, 2).unwrap();

    let mut round2 = Round::planned(2, 30);
    round2
        .draw_sample(&config.random_seed, &manifest, round1.sample.len() as u64, 2)
        .unwrap();

    // round2's draws are exactly the continuation of round1's sequence: drawing
    // round1.len() + round2.len() in one go reproduces both, back to back.
    let combined = rla_core::draw_sample(&config.random_seed, &manifest, 70, 0).unwrap();
    assert_eq!(combined[..40], round1.sample[..]);
    assert_eq!(combined[40..], round2.sample[..]);
}
