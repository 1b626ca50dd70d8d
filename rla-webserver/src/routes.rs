//! HTTP handlers for the audit service (§6). Grounded in
//! `original_source/arlo_server/__init__.py`'s route set (`/audit/status`,
//! `/audit/sample-sizes`, `/audit/manifest`, `/audit/round`,
//! `/audit/results`) translated from Flask's `request.get_json()` /
//! `jsonify()` idiom into axum's typed `Json<T>` extractors.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use rla_core::{
    compute_margins, compute_risk, sample_size_menu, AuditConfig, Contest, Count, Manifest,
    Margins, Round, RoundOutcome, RoundStatus, SampleSizeMenu,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::csv_io::{parse_manifest_csv, report_csv, retrieval_list_csv};
use crate::error::AppError;
use crate::store::Store;

pub type AppState = Arc<Store>;

#[derive(Deserialize)]
pub struct StartAuditRequest {
    pub contest: Contest,
    /// Risk limit as a percent in [1, 20], matching the wire format in §6.
    pub risk_limit_percent: f64,
    pub random_seed: String,
}

#[derive(Serialize)]
pub struct StartAuditResponse {
    pub margins: Margins,
}

/// `POST /audit/contest`: register the contest under audit and compute its
/// reported margins and ASN. Errors with `Unauditable` if any reported pair
/// has a margin of 0.5 or less.
pub async fn start_audit(
    State(store): State<AppState>,
    Json(req): Json<StartAuditRequest>,
) -> Result<Json<StartAuditResponse>, AppError> {
    let config = AuditConfig::new(req.risk_limit_percent, req.random_seed);
    config.validate()?;
    let margins = compute_margins(&req.contest, config.risk_limit)?;
    info!(contest = %req.contest.id, asn = margins.asn, "audit started");

    let mut election = store.write().await;
    election.config = Some(config);
    election.contest = Some(req.contest);
    election.margins = Some(margins.clone());
    election.rounds.clear();
    election.manifest = None;

    Ok(Json(StartAuditResponse { margins }))
}

/// `POST /audit/manifest`: upload the ballot manifest as CSV text.
pub async fn upload_manifest(
    State(store): State<AppState>,
    body: String,
) -> Result<StatusCode, AppError> {
    let manifest = parse_manifest_csv(&body)?;
    let mut election = store.write().await;
    election.manifest = Some(manifest);
    Ok(StatusCode::CREATED)
}

/// Build the sample-size menu (§4.2) for the election's contest, given every
/// ballot audited in prior rounds. Shared by `/audit/sample-sizes` and
/// `/audit/round` (the latter snapshots it onto the round it creates).
fn compute_menu(election: &crate::store::Election) -> Result<SampleSizeMenu, rla_core::RlaError> {
    let config = election
        .config
        .as_ref()
        .ok_or_else(|| rla_core::RlaError::State("no audit has been started".into()))?;
    let margins = election
        .margins
        .as_ref()
        .ok_or_else(|| rla_core::RlaError::State("no audit has been started".into()))?;
    let audited = election.latest_audited_counts();
    // `s_w` is the diluted share (ties across pairs sharing a winner), so pick
    // the governing pair by ASN instead — it's monotonic in the two-way share
    // that actually determines which pair is hardest to confirm (margins.rs).
    let (sample_w, sample_r) = match margins
        .pairs
        .iter()
        .max_by(|a, b| a.asn.partial_cmp(&b.asn).unwrap())
    {
        Some(governing_pair) => (
            audited.get(&governing_pair.winner).map(|c| c.0).unwrap_or(0),
            audited.get(&governing_pair.loser).map(|c| c.0).unwrap_or(0),
        ),
        None => (0, 0), // uncontested; sample_size_menu short-circuits on margins.asn == 0
    };
    Ok(sample_size_menu(margins, sample_w, sample_r, config))
}

/// `GET /audit/sample-sizes`: the next round's menu of candidate sample
/// sizes (§4.2), given the margins computed at `/audit/contest` and every
/// ballot already drawn in prior rounds.
pub async fn sample_sizes(
    State(store): State<AppState>,
) -> Result<Json<SampleSizeMenu>, AppError> {
    let election = store.read().await;
    Ok(Json(compute_menu(&election)?))
}

#[derive(Deserialize, Default)]
pub struct StartRoundRequest {
    /// The auditor's chosen size from the round-1 menu (§4.2). Ignored for
    /// round_num > 1, which always auto-selects the 90% size instead.
    pub sample_size: Option<u64>,
}

#[derive(Serialize)]
pub struct RoundSummary {
    pub round_num: u32,
    pub status: RoundStatus,
    pub sample_size: u64,
}

/// `POST /audit/round`: draw the next round's sample and split it across
/// audit boards. Only one round may be open (drawn-but-not-closed) at a time.
pub async fn start_round(
    State(store): State<AppState>,
    Json(req): Json<StartRoundRequest>,
) -> Result<Json<RoundSummary>, AppError> {
    let mut election = store.write().await;
    if let Some(current) = election.current_round() {
        if current.status != RoundStatus::Closed {
            return Err(rla_core::RlaError::State(format!(
                "round {} is still open",
                current.round_num
            ))
            .into());
        }
    }
    let config = election
        .config
        .as_ref()
        .ok_or_else(|| rla_core::RlaError::State("no audit has been started".into()))?
        .clone();
    let manifest: Manifest = election
        .manifest
        .clone()
        .ok_or_else(|| rla_core::RlaError::State("no manifest has been uploaded".into()))?;
    let already_drawn = election.rounds.iter().map(|r| r.sample.len() as u64).sum();
    let round_num = election.rounds.len() as u32 + 1;

    let menu = compute_menu(&election)?;
    // Round 1 exposes the menu for the auditor to choose from; round_num > 1
    // auto-selects the 90% size and draws immediately, per §4.2.
    let sample_size = if round_num == 1 {
        req.sample_size.ok_or_else(|| {
            rla_core::RlaError::InputValidation(
                "round 1 requires an explicit sample_size chosen from the menu".into(),
            )
        })?
    } else {
        menu.size_at_or_near(0.90)
    };

    let mut round = Round::planned(round_num, sample_size).with_menu(menu);
    round.draw_sample(
        &config.random_seed,
        &manifest,
        already_drawn,
        config.audit_board_member_count,
    )?;
    let summary = RoundSummary {
        round_num: round.round_num,
        status: round.status,
        sample_size: round.sample_size,
    };
    election.rounds.push(round);
    Ok(Json(summary))
}

/// `GET /audit/round/current/retrieval-list.csv`: the current round's drawn
/// ballots, grouped by audit board, as a downloadable CSV.
pub async fn retrieval_list(State(store): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let election = store.read().await;
    let manifest = election
        .manifest
        .as_ref()
        .ok_or_else(|| rla_core::RlaError::State("no manifest has been uploaded".into()))?;
    let (prior_rounds, round) = election
        .rounds
        .split_last()
        .map(|(last, rest)| (rest, last))
        .ok_or_else(|| rla_core::RlaError::State("no round has been started".into()))?;
    let already_audited = prior_rounds
        .iter()
        .flat_map(|r| r.sample.iter())
        .map(|d| (d.batch_name.clone(), d.position))
        .collect();
    let csv = retrieval_list_csv(&round.boards, manifest, &already_audited)?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv")],
        csv,
    ))
}

#[derive(Deserialize)]
pub struct RecordResultsRequest {
    /// Cumulative audited vote counts per candidate, across every round so
    /// far. Accepts either a JSON number or a numeric string per candidate
    /// (the original service's own fixtures mix the two — see DESIGN.md);
    /// anything else is an `InputValidationError`.
    pub audited_counts: BTreeMap<String, serde_json::Value>,
}

/// Coerce a request's audited-count values (each either a JSON number or a
/// string of digits) into `Count`s, rejecting anything else.
fn coerce_audited_counts(
    raw: BTreeMap<String, serde_json::Value>,
) -> Result<BTreeMap<String, Count>, rla_core::RlaError> {
    raw.into_iter()
        .map(|(name, value)| {
            let n = match &value {
                serde_json::Value::Number(n) => n.as_u64(),
                serde_json::Value::String(s) => s.parse::<u64>().ok(),
                _ => None,
            }
            .ok_or_else(|| {
                rla_core::RlaError::InputValidation(format!(
                    "audited count for {name:?} must be an integer or a numeric string, got {value}"
                ))
            })?;
            Ok((name, Count(n)))
        })
        .collect()
}

#[derive(Serialize)]
pub struct RecordResultsResponse {
    pub p_value: f64,
    pub risk_limit_met: bool,
}

/// `POST /audit/round/current/results`: record what the audit boards found
/// and evaluate risk. If the risk limit is met, the round is closed
/// immediately and the audit is complete; otherwise it stays `Audited` so the
/// next round's sample-size menu can be requested.
pub async fn record_results(
    State(store): State<AppState>,
    Json(req): Json<RecordResultsRequest>,
) -> Result<Json<RecordResultsResponse>, AppError> {
    let mut election = store.write().await;
    let margins = election
        .margins
        .clone()
        .ok_or_else(|| rla_core::RlaError::State("no audit has been started".into()))?;
    let alpha = election
        .config
        .as_ref()
        .ok_or_else(|| rla_core::RlaError::State("no audit has been started".into()))?
        .risk_limit;

    let audited_counts = coerce_audited_counts(req.audited_counts)?;

    // Evaluate risk before mutating the round, so a bad request leaves state untouched.
    let risk = compute_risk(&margins, &audited_counts, alpha)?;

    let round = election
        .current_round_mut()
        .ok_or_else(|| rla_core::RlaError::State("no round has been started".into()))?;
    let outcome = round.record_results(audited_counts, &margins, alpha)?;
    if let RoundOutcome::Complete { .. } = outcome {
        round.close()?;
    }

    Ok(Json(RecordResultsResponse {
        p_value: risk.p_value,
        risk_limit_met: risk.risk_limit_met,
    }))
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub contest_id: Option<String>,
    pub margins: Option<Margins>,
    pub rounds: Vec<RoundSummary>,
}

/// `GET /audit/status`: a snapshot of the whole audit's progress.
pub async fn status(State(store): State<AppState>) -> Json<StatusResponse> {
    let election = store.read().await;
    Json(StatusResponse {
        contest_id: election.contest.as_ref().map(|c| c.id.clone()),
        margins: election.margins.clone(),
        rounds: election
            .rounds
            .iter()
            .map(|r| RoundSummary {
                round_num: r.round_num,
                status: r.status,
                sample_size: r.sample_size,
            })
            .collect(),
    })
}

/// `GET /audit/report.csv`: the full audit report (§6 "Report CSV") — the
/// contest's reported totals plus, per round, the sample size, audited
/// counts, p-value, risk-limit-met flag, start/end timestamps, and the
/// explicit list of (batch, position, ticket) samples.
pub async fn report(State(store): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let election = store.read().await;
    let contest = election
        .contest
        .as_ref()
        .ok_or_else(|| rla_core::RlaError::State("no audit has been started".into()))?;
    let config = election
        .config
        .as_ref()
        .ok_or_else(|| rla_core::RlaError::State("no audit has been started".into()))?;
    let csv = report_csv(contest, config, &election.rounds)?;
    Ok(([(header::CONTENT_TYPE, "text/csv")], csv))
}
