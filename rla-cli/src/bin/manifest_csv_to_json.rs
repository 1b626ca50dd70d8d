// Converts a ballot manifest CSV (§6's Batch Name / Number of Ballots /
// Storage Location / Tabulator columns) to the JSON form the audit engine
// and webserver consume, the same CSV-in/JSON-out shape as parse_raire_csv.rs
// used for the RAIRE CSV format.

use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use rla_core::{Batch, Manifest};
use serde::Deserialize;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Convert a ballot manifest CSV file into the JSON manifest format
struct CliOptions {
    /// The CSV file containing the ballot manifest
    input_csv_file: PathBuf,
    /// The file to store the output. Default is the input file name, with path and
    /// extension if present removed and `.json` added.
    output_json_file: Option<PathBuf>,
}

#[derive(Deserialize)]
struct ManifestRow {
    #[serde(alias = "Batch Name")]
    batch_name: String,
    #[serde(alias = "Number of Ballots")]
    num_ballots: String,
    #[serde(alias = "Storage Location", default)]
    storage_location: String,
    #[serde(alias = "Tabulator", default)]
    tabulator: String,
}

/// Parse a "locale-aware integer" the way Python's `locale.atoi` does: strip
/// thousands separators (`,`) and surrounding whitespace before parsing.
fn parse_locale_int(field: &str, raw: &str) -> anyhow::Result<u64> {
    let stripped: String = raw.chars().filter(|c| *c != ',').collect();
    stripped
        .trim()
        .parse::<u64>()
        .map_err(|_| anyhow::anyhow!("invalid value for {field:?}: {raw:?}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .init();
    let args = CliOptions::parse();

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&args.input_csv_file)?;
    let mut batches = Vec::new();
    for result in reader.deserialize::<ManifestRow>() {
        let row = result?;
        let num_ballots = parse_locale_int("Number of Ballots", &row.num_ballots)?;
        batches.push(Batch {
            name: row.batch_name,
            num_ballots,
            storage_location: (!row.storage_location.is_empty()).then_some(row.storage_location),
            tabulator: (!row.tabulator.is_empty()).then_some(row.tabulator),
        });
    }
    log::info!("parsed {} batches from {:?}", batches.len(), args.input_csv_file);
    let manifest = Manifest { batches };
    manifest.validate()?;

    let output_file: PathBuf = args.output_json_file.unwrap_or_else(|| {
        let mut stem = args
            .input_csv_file
            .file_stem()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("manifest"));
        stem.as_mut_os_string().push(".json");
        stem
    });
    serde_json::to_writer_pretty(File::create(&output_file)?, &manifest)?;
    Ok(())
}
