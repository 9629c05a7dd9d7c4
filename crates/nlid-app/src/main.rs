//! NLID Application
//!
//! Command-line batch runner for directional nonlinear interdependence
//! between EEG channel pairs.
//!
//! # Usage
//!
//! ```bash
//! # Every CSV in a directory, F3 and F4 against Cz
//! nlid analyze --input data/ --reference Cz --target F3 --target F4
//!
//! # Custom parameters, report to a file
//! nlid analyze --input s01.csv --reference Cz --target O1 \
//!     --config params.json --output report.json
//!
//! # Inspect defaults
//! nlid config > params.json
//! nlid bands --config params.json
//! ```

mod loader;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nlid_core::{AnalysisConfig, Montage};
use nlid_native::{BatchConfig, BatchReport, BatchRunner};

/// NLID Application
#[derive(Parser, Debug)]
#[command(name = "nlid")]
#[command(author, version, about = "Nonlinear interdependence between EEG channel pairs", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score target channels against a reference channel
    Analyze {
        /// CSV file or directory of CSV files
        #[arg(short, long)]
        input: PathBuf,

        /// Reference channel (Y)
        #[arg(short, long)]
        reference: String,

        /// Target channel (X); repeat for several
        #[arg(short, long = "target", required = true)]
        targets: Vec<String>,

        /// JSON analysis configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Accept channel names outside the 16-channel 10-20 montage
        #[arg(long)]
        any_channel: bool,
    },

    /// List the band catalog
    Bands {
        /// JSON analysis configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Analyze { input, reference, targets, config, output, any_channel } => {
            let analysis = load_config(config.as_deref())?;
            let mut batch = BatchConfig::new(analysis, reference, targets);
            if any_channel {
                batch.montage = Montage::any();
            }
            run_analyze(&input, batch, output.as_deref())?;
        }
        Commands::Bands { config } => {
            list_bands(&load_config(config.as_deref())?);
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&AnalysisConfig::default())?);
        }
    }

    Ok(())
}

/// Read a JSON configuration, or the defaults when no path is given
fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Validate, load, run, report
fn run_analyze(input: &Path, batch: BatchConfig, output: Option<&Path>) -> anyhow::Result<()> {
    // Configuration problems abort before any file is read
    let runner = BatchRunner::new(batch).context("Invalid analysis configuration")?;

    info!("NLID v{}", env!("CARGO_PKG_VERSION"));
    let recordings = loader::load_input(input)?;
    info!(
        recordings = recordings.len(),
        pairs = runner.pairs().len(),
        bands = runner.pipeline().config().bands.len(),
        "starting batch"
    );

    let report = runner.run(&recordings);
    write_report(&report, output)?;

    let missing = report.rows.iter().filter(|row| row.result.is_missing()).count();
    info!(rows = report.rows.len(), missing, skipped = report.skipped.len(), "report written");
    Ok(())
}

fn write_report(report: &BatchReport, output: Option<&Path>) -> anyhow::Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn list_bands(config: &AnalysisConfig) {
    for band in &config.bands {
        println!("{:<8} {:>6.1} - {:>5.1} Hz", band.name, band.low_hz, band.high_hz);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_requires_target() {
        assert!(Cli::try_parse_from(["nlid", "analyze", "-i", "data", "-r", "Cz"]).is_err());

        let cli = Cli::try_parse_from([
            "nlid", "analyze", "-i", "data", "-r", "Cz", "-t", "F3", "--target", "F4",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze { targets, any_channel, .. } => {
                assert_eq!(targets, ["F3", "F4"]);
                assert!(!any_channel);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_load_config_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{ "embedding": { "dimension": 5 } }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.embedding.dimension, 5);
        assert_eq!(config.embedding.delay, 1);
        assert_eq!(config.sample_rate_hz, 128.0);

        assert_eq!(load_config(None).unwrap(), AnalysisConfig::default());
        assert!(load_config(Some(&dir.path().join("absent.json"))).is_err());
    }

    #[test]
    fn test_analyze_writes_report() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let dir = tempfile::tempdir().unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut csv = String::from("Cz,F3\n");
        for _ in 0..600 {
            csv.push_str(&format!("{},{}\n", rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)));
        }
        std::fs::write(dir.path().join("s01.csv"), csv).unwrap();

        let analysis = AnalysisConfig {
            window: nlid_core::WindowConfig { length: 256, overlap: 0.0 },
            ..Default::default()
        };
        let out = dir.path().join("report.json");
        run_analyze(dir.path(), BatchConfig::new(analysis, "Cz", ["F3"]), Some(&out)).unwrap();

        let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let rows = report["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0]["file"], "s01.csv");
        assert_eq!(rows[0]["band"], "Delta");
        assert_eq!(rows[0]["windows"], 2);
        assert!(report["skipped"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_analyze_rejects_bad_config_before_loading() {
        let batch = BatchConfig::new(AnalysisConfig::default(), "Cz", ["Cz"]);
        let err = run_analyze(Path::new("/nonexistent"), batch, None).unwrap_err();
        assert!(err.to_string().contains("Invalid analysis configuration"));
    }
}
