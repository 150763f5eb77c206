use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use thinkmend::io::{display_name, format_summary, DEFAULT_REPORT_FILE};
use thinkmend::{
    clean_file, diagnose_file, expand_patterns, reconcile_file, recover_file, run_batch, summarize,
    write_json, AsBody, AsHeader, BatchConfig, BatchFailure, DetectorConfig, DiagnosticRecord,
    DuplicationDetector, OutputOptions, Reconciler, RecoveryOutcome, Segmenter, SplitLeadIn,
};

#[derive(Parser)]
#[command(name = "thinkmend")]
#[command(author, version, about = "Reconcile thinking stages and responses in conversation exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Files processed at once (defaults to the number of CPUs)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze exports for thinking-block defects without changing them
    Diagnose {
        /// Export files or glob patterns
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Where to write the per-file JSON report
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        report: PathBuf,

        /// JSON file with reasoning phrases
        #[arg(long)]
        phrases: Option<PathBuf>,
    },

    /// Remove responses that repeat their exchange's thinking stages
    Clean {
        /// Export files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,

        /// Overwrite the input files
        #[arg(long, conflicts_with = "output_dir")]
        in_place: bool,

        /// Directory for cleaned exports
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Find stages present in the raw HTML but missing from the structured form
    Recover {
        /// Export files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,

        /// Directory for recovery records
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// How to treat a block that opens with bold text followed by prose
        #[arg(long, value_enum, default_value_t = Ambiguous::Body)]
        ambiguous: Ambiguous,
    },

    /// Diagnose, clean and recover in one pass
    Reconcile {
        /// Export files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,

        /// Overwrite the input files
        #[arg(long, conflicts_with = "output_dir")]
        in_place: bool,

        /// Directory for cleaned exports and recovery records
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Where to write the per-file JSON report
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        report: PathBuf,

        /// JSON file with reasoning phrases
        #[arg(long)]
        phrases: Option<PathBuf>,

        /// How to treat a block that opens with bold text followed by prose
        #[arg(long, value_enum, default_value_t = Ambiguous::Body)]
        ambiguous: Ambiguous,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Ambiguous {
    /// Keep the whole block as body text
    Body,
    /// Use the bold lead-in as a stage name and drop the rest
    Header,
    /// Use the bold lead-in as a stage name and the rest as its first paragraph
    Split,
}

impl Ambiguous {
    fn segmenter(self) -> Segmenter {
        match self {
            Ambiguous::Body => Segmenter::with_policy(AsBody),
            Ambiguous::Header => Segmenter::with_policy(AsHeader),
            Ambiguous::Split => Segmenter::with_policy(SplitLeadIn),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let batch = cli.jobs.map(|jobs| BatchConfig { jobs }).unwrap_or_default();

    match cli.command {
        Commands::Diagnose {
            patterns,
            report,
            phrases,
        } => diagnose_exports(&patterns, &report, phrases.as_deref(), &batch).await,
        Commands::Clean {
            files,
            in_place,
            output_dir,
        } => {
            let options = OutputOptions {
                in_place,
                output_dir,
            };
            clean_exports(&files, options, &batch).await
        }
        Commands::Recover {
            files,
            output_dir,
            ambiguous,
        } => recover_exports(&files, output_dir, ambiguous, &batch).await,
        Commands::Reconcile {
            files,
            in_place,
            output_dir,
            report,
            phrases,
            ambiguous,
        } => {
            let options = OutputOptions {
                in_place,
                output_dir,
            };
            let detector = load_detector(phrases.as_deref())?;
            let reconciler = Reconciler::new(detector, ambiguous.segmenter());
            reconcile_exports(&files, options, reconciler, &report, &batch).await
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_detector(phrases: Option<&Path>) -> Result<DuplicationDetector> {
    let config = match phrases {
        Some(path) => {
            info!("Loading reasoning phrases from {:?}", path);
            DetectorConfig::from_file(path)?
        }
        None => DetectorConfig::default(),
    };
    Ok(DuplicationDetector::new(config))
}

/// Expand the command-line arguments; `None` when nothing matched
fn resolve_inputs(patterns: &[String]) -> Result<Option<Vec<PathBuf>>> {
    let paths = expand_patterns(patterns)?;
    if paths.is_empty() {
        println!("No JSON files found");
        return Ok(None);
    }
    info!("Found {} files", paths.len());
    Ok(Some(paths))
}

fn ensure_output_dir(dir: Option<&Path>) -> Result<()> {
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }
    Ok(())
}

fn save_report(records: &[DiagnosticRecord], report: &Path) -> Result<()> {
    write_json(&records, report).context("Failed to write diagnostic report")?;
    println!();
    println!("Detailed report saved to: {}", report.display());
    Ok(())
}

async fn diagnose_exports(
    patterns: &[String],
    report: &Path,
    phrases: Option<&Path>,
    batch: &BatchConfig,
) -> Result<()> {
    let detector = load_detector(phrases)?;
    let Some(paths) = resolve_inputs(patterns)? else {
        return Ok(());
    };

    let outcome = run_batch(paths, batch, move |path| diagnose_file(path, &detector)).await;

    let records: Vec<DiagnosticRecord> = outcome
        .completed
        .into_iter()
        .map(|(_, record)| record)
        .collect();
    let summary = summarize(&records);

    print!("{}", format_summary(&records, &summary));
    save_report(&records, report)?;
    print_failures(&outcome.failed);

    Ok(())
}

async fn clean_exports(files: &[String], options: OutputOptions, batch: &BatchConfig) -> Result<()> {
    let Some(paths) = resolve_inputs(files)? else {
        return Ok(());
    };
    ensure_output_dir(options.output_dir.as_deref())?;

    let reconciler = Reconciler::default();
    let outcome = run_batch(paths, batch, move |path| {
        clean_file(path, &reconciler, &options)
    })
    .await;

    println!("Cleanup Summary");
    println!("===============");
    let mut exchanges_cleaned = 0;
    let mut messages_removed = 0;
    for (path, cleaned) in &outcome.completed {
        exchanges_cleaned += cleaned.stats.exchanges_cleaned;
        messages_removed += cleaned.stats.messages_removed;
        println!(
            "{}: {} exchanges cleaned, {} messages removed -> {}",
            display_name(path),
            cleaned.stats.exchanges_cleaned,
            cleaned.stats.messages_removed,
            cleaned.output.display()
        );
    }

    println!();
    println!("Files processed: {}", outcome.completed.len());
    println!("Exchanges cleaned: {}", exchanges_cleaned);
    println!("Messages removed: {}", messages_removed);
    print_failures(&outcome.failed);

    Ok(())
}

async fn recover_exports(
    files: &[String],
    output_dir: Option<PathBuf>,
    ambiguous: Ambiguous,
    batch: &BatchConfig,
) -> Result<()> {
    let Some(paths) = resolve_inputs(files)? else {
        return Ok(());
    };
    ensure_output_dir(output_dir.as_deref())?;

    let reconciler = Reconciler::new(DuplicationDetector::default(), ambiguous.segmenter());
    let outcome = run_batch(paths, batch, move |path| {
        recover_file(path, &reconciler, output_dir.as_deref())
    })
    .await;

    println!("Recovery Summary");
    println!("================");
    let mut recoverable_files = 0;
    let mut stages_recovered = 0;
    for (path, recovered) in &outcome.completed {
        print_recovery(&display_name(path), &recovered.recovery, recovered.output.as_deref());
        if let Some(record) = recovered.recovery.record() {
            recoverable_files += 1;
            stages_recovered += record.recovery_stats.newly_recovered;
        }
    }

    println!();
    println!("Files processed: {}", outcome.completed.len());
    println!("Files with recoverable stages: {}", recoverable_files);
    println!("Stages recovered: {}", stages_recovered);
    print_failures(&outcome.failed);

    Ok(())
}

async fn reconcile_exports(
    files: &[String],
    options: OutputOptions,
    reconciler: Reconciler,
    report: &Path,
    batch: &BatchConfig,
) -> Result<()> {
    let Some(paths) = resolve_inputs(files)? else {
        return Ok(());
    };
    ensure_output_dir(options.output_dir.as_deref())?;

    let outcome = run_batch(paths, batch, move |path| {
        reconcile_file(path, &reconciler, &options)
    })
    .await;

    let mut records = Vec::with_capacity(outcome.completed.len());
    let mut messages_removed = 0;
    let mut stages_recovered = 0;
    for (path, reconciled) in outcome.completed {
        messages_removed += reconciled.clean.stats.messages_removed;
        if let Some(record) = reconciled.recover.recovery.record() {
            stages_recovered += record.recovery_stats.newly_recovered;
        }
        print_recovery(
            &display_name(&path),
            &reconciled.recover.recovery,
            reconciled.recover.output.as_deref(),
        );
        records.push(reconciled.diagnostics);
    }

    println!();
    let summary = summarize(&records);
    print!("{}", format_summary(&records, &summary));
    save_report(&records, report)?;

    println!();
    println!("Messages removed: {}", messages_removed);
    println!("Stages recovered: {}", stages_recovered);
    print_failures(&outcome.failed);

    Ok(())
}

fn print_recovery(name: &str, recovery: &RecoveryOutcome, output: Option<&Path>) {
    match recovery {
        RecoveryOutcome::NoRawDocument => println!("{}: no raw_html, skipped", name),
        RecoveryOutcome::UpToDate {
            total_found,
            current,
        } => println!(
            "{}: {} stages in raw HTML, {} already structured",
            name, total_found, current
        ),
        RecoveryOutcome::Recoverable(record) => {
            println!(
                "{}: {} stages recoverable ({} found, {} structured)",
                name,
                record.recovery_stats.newly_recovered,
                record.recovery_stats.total_found,
                record.recovery_stats.current_in_json
            );
            if let Some(output) = output {
                println!("  saved to {}", output.display());
            }
        }
    }
}

fn print_failures(failed: &[BatchFailure]) {
    if failed.is_empty() {
        return;
    }

    println!();
    println!("Failed ({}):", failed.len());
    for failure in failed {
        println!("  {}: {}", failure.path.display(), failure.error);
    }
}
