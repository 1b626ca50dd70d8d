//! CSV encode/decode for the three file-shaped boundaries in §6: the ballot
//! manifest upload, the retrieval list download, and the final audit report.

use std::collections::{BTreeMap, HashSet};

use rla_core::balancer::BoardAssignment;
use rla_core::{AuditConfig, Batch, Contest, Manifest, Round, RlaError};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct ManifestRow {
    #[serde(alias = "Batch Name", alias = "batch_name")]
    batch_name: String,
    #[serde(alias = "Number of Ballots", alias = "num_ballots")]
    num_ballots: String,
    #[serde(alias = "Storage Location", alias = "storage_location", default)]
    storage_location: String,
    #[serde(alias = "Tabulator", alias = "tabulator", default)]
    tabulator: String,
}

/// Parse a "locale-aware integer" (§6) the way Python's `locale.atoi` does:
/// strip thousands separators (`,`) and surrounding whitespace, then parse
/// the remaining digits. `"1,234"` and `"1234"` both mean 1234; anything left
/// that isn't a plain non-negative integer is rejected.
fn parse_locale_int(field: &str, raw: &str, line: u64) -> Result<u64, RlaError> {
    let stripped: String = raw.chars().filter(|c| *c != ',').collect();
    stripped.trim().parse::<u64>().map_err(|_| {
        RlaError::InputValidation(format!(
            "invalid value for {field:?} on line {line}: {raw:?}"
        ))
    })
}

/// Parse a manifest CSV (§6's Batch Name / Number of Ballots / Storage
/// Location / Tabulator columns) into a `Manifest`.
pub fn parse_manifest_csv(text: &str) -> Result<Manifest, RlaError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let mut batches = Vec::new();
    for result in reader.deserialize::<ManifestRow>() {
        let row = result.map_err(|e| RlaError::InputValidation(format!("manifest CSV: {e}")))?;
        let num_ballots = parse_locale_int("Number of Ballots", &row.num_ballots, batches.len() as u64 + 2)?;
        batches.push(Batch {
            name: row.batch_name,
            num_ballots,
            storage_location: (!row.storage_location.is_empty()).then_some(row.storage_location),
            tabulator: (!row.tabulator.is_empty()).then_some(row.tabulator),
        });
    }
    let manifest = Manifest { batches };
    manifest.validate()?;
    Ok(manifest)
}

#[derive(Serialize)]
struct RetrievalRow {
    #[serde(rename = "Batch Name")]
    batch_name: String,
    #[serde(rename = "Ballot Number")]
    ballot_number: u64,
    #[serde(rename = "Storage Location")]
    storage_location: String,
    #[serde(rename = "Tabulator")]
    tabulator: String,
    #[serde(rename = "Ticket Numbers")]
    ticket_numbers: String,
    #[serde(rename = "Already Audited")]
    already_audited: &'static str,
    #[serde(rename = "Audit Board")]
    audit_board: String,
}

/// Render the drawn-and-balanced sample as the retrieval list audit boards
/// print and carry into the ballot storage room (§6 "Retrieval-list CSV").
///
/// Duplicate draws of the same physical ballot (same batch, same position,
/// possibly different `draw_index`) collapse into a single row whose
/// "Ticket Numbers" column lists every ticket that hit it, ascending.
/// `already_audited` names every (batch, position) drawn in a round before
/// the one being rendered here. Rows are ordered by (audit board, batch
/// name, ballot position), matching §6.
pub fn retrieval_list_csv(
    boards: &[BoardAssignment],
    manifest: &Manifest,
    already_audited: &HashSet<(String, u64)>,
) -> Result<String, RlaError> {
    let batch_info: BTreeMap<&str, &Batch> =
        manifest.batches.iter().map(|b| (b.name.as_str(), b)).collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    for board in boards {
        let board_name = format!("Board {}", board.board_index + 1);

        // Collapse duplicate draws of the same physical ballot, keeping every
        // ticket number that hit it, ascending.
        let mut by_ballot: BTreeMap<(String, u64), Vec<String>> = BTreeMap::new();
        for draw in &board.draws {
            by_ballot
                .entry((draw.batch_name.clone(), draw.position))
                .or_default()
                .push(draw.ticket_number.clone());
        }

        let mut rows: Vec<((String, u64), Vec<String>)> = by_ballot.into_iter().collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for ((batch_name, position), mut tickets) in rows {
            tickets.sort();
            let batch = batch_info.get(batch_name.as_str());
            writer
                .serialize(RetrievalRow {
                    batch_name: batch_name.clone(),
                    ballot_number: position,
                    storage_location: batch
                        .and_then(|b| b.storage_location.clone())
                        .unwrap_or_default(),
                    tabulator: batch.and_then(|b| b.tabulator.clone()).unwrap_or_default(),
                    ticket_numbers: tickets.join(","),
                    already_audited: if already_audited.contains(&(batch_name.clone(), position)) {
                        "Y"
                    } else {
                        "N"
                    },
                    audit_board: board_name.clone(),
                })
                .map_err(|e| RlaError::Internal(format!("retrieval list CSV: {e}")))?;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| RlaError::Internal(format!("retrieval list CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RlaError::Internal(format!("retrieval list CSV: {e}")))
}

#[derive(Serialize)]
struct ReportRow {
    #[serde(rename = "Contest Name")]
    contest_name: String,
    #[serde(rename = "Winners")]
    winners: String,
    #[serde(rename = "Votes Allowed")]
    votes_allowed: u32,
    #[serde(rename = "Total Ballots Cast")]
    total_ballots_cast: u64,
    #[serde(rename = "Reported Votes")]
    reported_votes: String,
    #[serde(rename = "Risk Limit Percent")]
    risk_limit_percent: f64,
    #[serde(rename = "Random Seed")]
    random_seed: String,
    #[serde(rename = "Round")]
    round_num: u32,
    #[serde(rename = "Sample Size")]
    sample_size: u64,
    #[serde(rename = "Audited Counts")]
    audited_counts: String,
    #[serde(rename = "P-Value")]
    p_value: String,
    #[serde(rename = "Risk Limit Met")]
    risk_limit_met: String,
    #[serde(rename = "Started At")]
    started_at: String,
    #[serde(rename = "Ended At")]
    ended_at: String,
    #[serde(rename = "Samples")]
    samples: String,
}

/// Render the audit report CSV (§6): one row per round, with the contest's
/// reported totals repeated on every row and that round's drawn
/// (batch, position, ticket) samples flattened into a single semicolon-joined
/// column, since a round's sample is itself a list.
pub fn report_csv(contest: &Contest, config: &AuditConfig, rounds: &[Round]) -> Result<String, RlaError> {
    let (winners, _losers) = contest.winners_and_losers();
    let winners_str = winners
        .iter()
        .map(|w| w.as_str())
        .collect::<Vec<_>>()
        .join(";");
    let reported_votes_str = contest
        .reported_votes
        .iter()
        .map(|(name, count)| format!("{name}:{count}"))
        .collect::<Vec<_>>()
        .join(";");

    let mut writer = csv::Writer::from_writer(Vec::new());
    if rounds.is_empty() {
        writer
            .serialize(ReportRow {
                contest_name: contest.id.clone(),
                winners: winners_str,
                votes_allowed: contest.votes_allowed,
                total_ballots_cast: contest.total_ballots_cast.0,
                reported_votes: reported_votes_str,
                risk_limit_percent: config.risk_limit * 100.0,
                random_seed: config.random_seed.clone(),
                round_num: 0,
                sample_size: 0,
                audited_counts: String::new(),
                p_value: String::new(),
                risk_limit_met: String::new(),
                started_at: String::new(),
                ended_at: String::new(),
                samples: String::new(),
            })
            .map_err(|e| RlaError::Internal(format!("report CSV: {e}")))?;
    }
    for round in rounds {
        let audited_counts = round
            .audited_counts
            .iter()
            .map(|(name, count)| format!("{name}:{count}"))
            .collect::<Vec<_>>()
            .join(";");
        let samples = round
            .sample
            .iter()
            .map(|d| format!("{}:{}:{}", d.batch_name, d.position, d.ticket_number))
            .collect::<Vec<_>>()
            .join(";");
        writer
            .serialize(ReportRow {
                contest_name: contest.id.clone(),
                winners: winners_str.clone(),
                votes_allowed: contest.votes_allowed,
                total_ballots_cast: contest.total_ballots_cast.0,
                reported_votes: reported_votes_str.clone(),
                risk_limit_percent: config.risk_limit * 100.0,
                random_seed: config.random_seed.clone(),
                round_num: round.round_num,
                sample_size: round.sample_size,
                audited_counts,
                p_value: round
                    .risk
                    .as_ref()
                    .map(|r| format!("{:.6}", r.p_value))
                    .unwrap_or_default(),
                risk_limit_met: round
                    .risk
                    .as_ref()
                    .map(|r| r.risk_limit_met.to_string())
                    .unwrap_or_default(),
                started_at: round.started_at.to_rfc3339(),
                ended_at: round.ended_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                samples,
            })
            .map_err(|e| RlaError::Internal(format!("report CSV: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RlaError::Internal(format!("report CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| RlaError::Internal(format!("report CSV: {e}")))
}
