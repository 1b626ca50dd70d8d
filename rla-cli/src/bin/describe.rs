// This reads the output of `plan` and produces a human readable description,
// the same role describe.rs plays for a RAIRE solution.

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use rla_core::{Margins, SampleSizeMenu};
use serde::Deserialize;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Print a human readable description of a sample-size plan
struct CliOptions {
    /// The JSON output from `plan`
    input_file: PathBuf,
}

#[derive(Deserialize)]
struct PlanOutput {
    margins: Margins,
    menu: SampleSizeMenu,
}

fn main() -> anyhow::Result<()> {
    let args = CliOptions::parse();
    let input: PlanOutput = serde_json::from_reader(File::open(&args.input_file)?)?;

    if input.margins.pairs.is_empty() {
        println!("Contest is uncontested; no audit sample is required.");
        return Ok(());
    }

    println!(
        "Governing margin: s_w = {:.4} (p_w = {:.4}, p_r = {:.4})",
        input.margins.s_w, input.margins.p_w, input.margins.p_r
    );
    println!("Contest ASN: {}", input.margins.asn);
    println!();
    println!("Pairwise margins:");
    for pair in &input.margins.pairs {
        println!(
            "  {} vs {}: s_w = {:.4}, ASN = {:.1}",
            pair.winner, pair.loser, pair.s_w, pair.asn
        );
    }
    println!();
    println!("Sample-size menu:");
    for option in &input.menu.options {
        println!("  {:?}: prob = {:.2}, size = {}", option.kind, option.prob, option.size);
    }
    Ok(())
}
