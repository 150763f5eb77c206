//! One unit of work per export file.
//!
//! Each job reads a whole file, runs the pure pipeline over it and writes
//! whatever it produces before returning. They are meant to be handed to
//! [`run_batch`](crate::batch::run_batch).

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ExportError;
use crate::heuristics::DuplicationDetector;
use crate::io::{
    cleaned_output_path, display_name, read_export_file, recovery_output_path, write_json,
};
use crate::models::DiagnosticRecord;
use crate::pipeline::{diagnose, CleanStats, Reconciler, RecoveryOutcome};

/// Where cleaned exports are written
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Overwrite the input file
    pub in_place: bool,
    /// Directory for outputs instead of next to the input
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug)]
pub struct CleanOutcome {
    pub output: PathBuf,
    pub stats: CleanStats,
}

#[derive(Debug)]
pub struct RecoverOutcome {
    pub recovery: RecoveryOutcome,
    /// Recovery record location, when one was written
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ReconcileOutcome {
    pub diagnostics: DiagnosticRecord,
    pub clean: CleanOutcome,
    pub recover: RecoverOutcome,
}

/// Analyze one file without changing anything
pub fn diagnose_file(
    path: &Path,
    detector: &DuplicationDetector,
) -> Result<DiagnosticRecord, ExportError> {
    let export = read_export_file(path)?;
    Ok(diagnose(&export, &display_name(path), detector))
}

/// Remove duplicated responses and write the cleaned export
pub fn clean_file(
    path: &Path,
    reconciler: &Reconciler,
    options: &OutputOptions,
) -> Result<CleanOutcome, ExportError> {
    let mut export = read_export_file(path)?;
    let stats = reconciler.clean(&mut export);

    let output = cleaned_output_path(path, options.output_dir.as_deref(), options.in_place);
    write_json(&export, &output)?;

    info!(
        "{}: {} exchanges cleaned, {} messages removed -> {:?}",
        display_name(path),
        stats.exchanges_cleaned,
        stats.messages_removed,
        output
    );

    Ok(CleanOutcome { output, stats })
}

/// Look for stages present only in the raw document
pub fn recover_file(
    path: &Path,
    reconciler: &Reconciler,
    output_dir: Option<&Path>,
) -> Result<RecoverOutcome, ExportError> {
    let export = read_export_file(path)?;
    let recovery = reconciler.recover(&export, &path.display().to_string());
    let output = write_recovery(path, &recovery, output_dir)?;
    Ok(RecoverOutcome { recovery, output })
}

/// Diagnose, clean and recover in one read of the file
pub fn reconcile_file(
    path: &Path,
    reconciler: &Reconciler,
    options: &OutputOptions,
) -> Result<ReconcileOutcome, ExportError> {
    let mut export = read_export_file(path)?;
    let result = reconciler.reconcile(&mut export, &path.display().to_string());

    // Recovery record first; the input is rewritten only after it is saved
    let recovery_output = write_recovery(path, &result.recovery, options.output_dir.as_deref())?;
    let output = cleaned_output_path(path, options.output_dir.as_deref(), options.in_place);
    write_json(&export, &output)?;

    let mut diagnostics = result.diagnostics;
    diagnostics.file = display_name(path);

    Ok(ReconcileOutcome {
        diagnostics,
        clean: CleanOutcome {
            output,
            stats: result.clean,
        },
        recover: RecoverOutcome {
            recovery: result.recovery,
            output: recovery_output,
        },
    })
}

fn write_recovery(
    path: &Path,
    recovery: &RecoveryOutcome,
    output_dir: Option<&Path>,
) -> Result<Option<PathBuf>, ExportError> {
    let Some(record) = recovery.record() else {
        return Ok(None);
    };

    let output = recovery_output_path(path, output_dir);
    write_json(record, &output)?;
    info!(
        "{}: {} stages recoverable, saved to {:?}",
        display_name(path),
        record.recovery_stats.newly_recovered,
        output
    );
    Ok(Some(output))
}
