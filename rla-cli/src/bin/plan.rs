use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use rla_core::{compute_margins, sample_size_menu, AuditConfig, Contest, Margins, SampleSizeMenu};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Compute margins, ASN, and a sample-size menu for a contest from a JSON description
struct CliOptions {
    /// The JSON file describing the contest, risk limit, and random seed
    input_json_file: PathBuf,
    /// The file to store the output. Default is the input file name, with path and
    /// extension if present removed and `_plan.json` added.
    output_json_file: Option<PathBuf>,
    /// Ballots already audited in favor of the governing pair's winner, for a round after the first
    #[arg(long, default_value_t = 0)]
    sample_w: u64,
    /// Ballots already audited in favor of the governing pair's loser, for a round after the first
    #[arg(long, default_value_t = 0)]
    sample_r: u64,
}

#[derive(Deserialize)]
struct PlanInput {
    contest: Contest,
    risk_limit_percent: f64,
    random_seed: String,
}

#[derive(Serialize)]
struct PlanOutput {
    margins: Margins,
    menu: SampleSizeMenu,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .init();
    let args = CliOptions::parse();
    let input: PlanInput = serde_json::from_reader(File::open(&args.input_json_file)?)?;
    let config = AuditConfig::new(input.risk_limit_percent, input.random_seed);
    config.validate()?;
    let margins = compute_margins(&input.contest, config.risk_limit)?;
    log::info!(
        "contest {:?}: governing margin s_w={:.4}, ASN={}",
        input.contest.id,
        margins.s_w,
        margins.asn
    );
    let menu = sample_size_menu(&margins, args.sample_w, args.sample_r, &config);
    let output = PlanOutput { margins, menu };

    let output_file: PathBuf = args.output_json_file.unwrap_or_else(|| {
        let mut stem = args
            .input_json_file
            .file_stem()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("output"));
        stem.as_mut_os_string().push("_plan.json");
        stem
    });
    serde_json::to_writer_pretty(File::create(&output_file)?, &output)?;
    Ok(())
}
