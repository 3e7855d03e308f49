//! Command-line converter: `finc-marc <source> [input [output [mapping]]]`.

use anyhow::{Context, Result};
use clap::Parser;
use finc_marc::config::Settings;
use finc_marc::logging::init_logging;
use finc_marc::sources::Source;
use finc_marc::{ConversionDriver, FormatTable};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "finc-marc")]
#[command(version, about = "Convert institutional exports into MARC21 binary records")]
struct Cli {
    /// Data source: 109 (khm), 73 (marburg), 148 (bundesarchiv) or 15 (imslp)
    source: Source,

    /// Input file or directory [default: per source]
    input: Option<PathBuf>,

    /// Output MARC file [default: <source>_output.mrc]
    output: Option<PathBuf>,

    /// Extra mapping: IMSLP fieldmap JSON file or legacy export directory
    mapping: Option<PathBuf>,

    /// Settings file [default: ./finc-marc.toml if present]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;
    init_logging(&settings.logging).context("Failed to initialize logging")?;

    let formats = match &settings.formats_file {
        Some(path) => FormatTable::from_json_file(path)
            .with_context(|| format!("Failed to load format table {}", path.display()))?,
        None => FormatTable::default(),
    };

    let input = cli.input.unwrap_or_else(|| cli.source.default_input());
    let output = cli.output.unwrap_or_else(|| cli.source.default_output());
    let mapping = cli
        .source
        .mapping(formats, cli.mapping.as_deref())
        .context("Failed to load extra mapping")?;

    let file = File::create(&output)
        .with_context(|| format!("Failed to create output {}", output.display()))?;
    let mut driver = ConversionDriver::new(BufWriter::new(file), settings.output.encoding);
    let report = driver
        .run(&cli.source.record_source(&input), mapping.as_ref())
        .with_context(|| format!("Conversion of {} failed", input.display()))?;

    info!(
        output = %output.display(),
        written = report.written,
        skipped = report.skipped,
        failed = report.failed,
        "done"
    );
    Ok(())
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
