//! Gait Analysis Core CLI
//!
//! Reads JSON-lines landmark frames, runs the analyzer, and writes JSON-lines
//! results. Logs go to stderr so stdout stays machine-readable.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gait_core::{FrameReader, GaitAnalyzer, GaitConfig, GaitError, Side, StreamingExporter};

#[derive(Parser)]
#[command(name = "gait-core")]
#[command(version)]
#[command(about = "Foot strike classification and gait-cycle tracking from pose landmarks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSON-lines stream of landmark frames
    Analyze(AnalyzeArgs),

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file to merge over the defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Input file, or "-" for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured frame rate
    #[arg(long)]
    fps: Option<f64>,

    /// Override the tracked side(s)
    #[arg(long, value_enum)]
    side: Option<SideArg>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only write frames with a classification, plus the final report
    #[arg(long)]
    contacts_only: bool,

    /// Write only the final report
    #[arg(long)]
    summary_only: bool,

    /// Stop at the first malformed line instead of skipping it
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SideArg {
    Left,
    Right,
    Both,
}

impl SideArg {
    fn sides(self) -> Vec<Side> {
        match self {
            SideArg::Left => vec![Side::Left],
            SideArg::Right => vec![Side::Right],
            SideArg::Both => Side::BOTH.to_vec(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => analyze(args),
        Commands::Config { config } => {
            let config = load_config(config.as_ref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GaitConfig> {
    match path {
        Some(path) => GaitConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(GaitConfig::default()),
    }
}

fn analyze(args: AnalyzeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(side) = args.side {
        config.sides = side.sides();
    }
    let mut analyzer = GaitAnalyzer::new(config).context("invalid configuration")?;

    let input: Box<dyn BufRead> = if args.input == "-" {
        Box::new(BufReader::new(io::stdin().lock()))
    } else {
        let file = File::open(&args.input).with_context(|| format!("failed to open {}", args.input))?;
        Box::new(BufReader::new(file))
    };
    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut exporter = StreamingExporter::new(output).contacts_only(args.contacts_only);

    info!(input = %args.input, version = gait_core::VERSION, "starting analysis");

    let mut skipped_lines = 0usize;
    for frame in FrameReader::new(input) {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err @ GaitError::Frame { .. }) if !args.strict => {
                warn!(error = %err, "skipping malformed frame");
                skipped_lines += 1;
                continue;
            }
            Err(err) => return Err(err).context("failed to read frames"),
        };

        let analysis = analyzer.process_frame(&frame);
        if !args.summary_only {
            exporter.write_frame(&analysis)?;
        }
    }

    let report = analyzer.report();
    exporter.write_report(&report)?;
    exporter.flush()?;

    info!(
        frames = report.frames_processed,
        skipped_lines,
        detection_rate = report.detection_rate,
        dominant = %report.dominant_gait_type,
        cadence_spm = ?report.cadence_spm,
        "analysis complete"
    );
    Ok(())
}
