use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ExportError;
use crate::models::{DiagnosticRecord, DiagnosticSummary};

/// Default file name for the diagnostic report
pub const DEFAULT_REPORT_FILE: &str = "thinking_blocks_diagnostic_report.json";

/// Issues shown per file in the console summary
const ISSUES_SHOWN: usize = 5;

/// Write a value as pretty-printed JSON
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> std::result::Result<(), ExportError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| ExportError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Where a cleaned export goes
///
/// In place, into `output_dir` under the same file name, or next to the
/// input as `<stem>.cleaned.json`.
pub fn cleaned_output_path(input: &Path, output_dir: Option<&Path>, in_place: bool) -> PathBuf {
    if in_place {
        return input.to_path_buf();
    }
    match (output_dir, input.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => sibling_with_suffix(input, "cleaned"),
    }
}

/// Where a recovery record goes: `<stem>.recovered.json`
pub fn recovery_output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let path = sibling_with_suffix(input, "recovered");
    match (output_dir, path.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => path,
    }
}

fn sibling_with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}.{}.json", stem, suffix))
}

/// Display name of a file for records and logs
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Console summary of a diagnostic batch
pub fn format_summary(records: &[DiagnosticRecord], summary: &DiagnosticSummary) -> String {
    let rule = "=".repeat(80);
    let mut output = String::new();

    output.push_str(&format!("{}\nTHINKING BLOCK DIAGNOSTIC SUMMARY\n{}\n\n", rule, rule));
    output.push_str(&format!("Files analyzed: {}\n", summary.files_analyzed));
    output.push_str(&format!("Files with issues: {}\n", summary.files_with_issues));

    output.push_str("\n--- Issue Breakdown ---\n");
    output.push_str(&format!(
        "Files with NO thinking blocks: {}\n",
        summary.files_without_thinking
    ));
    output.push_str(&format!(
        "Files with DUPLICATE thinking: {}\n",
        summary.files_with_duplicates
    ));
    output.push_str(&format!(
        "Files with EMPTY thinking stages: {}\n",
        summary.files_with_empty_stages
    ));

    output.push_str("\n--- By Export Version ---\n");
    for (version, counts) in &summary.by_version {
        output.push_str(&format!("{}:\n", version));
        output.push_str(&format!("  Total: {}\n", counts.total));
        output.push_str(&format!("  With thinking: {}\n", counts.with_thinking));
        output.push_str(&format!("  With duplicates: {}\n", counts.with_duplicates));
    }

    if summary.files_with_issues == 0 {
        return output;
    }

    output.push_str("\n--- Files With Issues ---\n");
    for record in records.iter().filter(|r| r.has_issues()) {
        output.push_str(&format!("\n{} ({}):\n", record.file, record.export_date));
        output.push_str(&format!("  Export version: {}\n", record.export_version));
        output.push_str(&format!("  Thinking messages: {}\n", record.thinking_messages));
        output.push_str(&format!("  With stages: {}\n", record.thinking_with_stages));
        output.push_str(&format!(
            "  Duplicate responses: {}\n",
            record.responses_with_thinking_text
        ));
        output.push_str(&format!("  Issues ({}):\n", record.issues.len()));
        for issue in record.issues.iter().take(ISSUES_SHOWN) {
            output.push_str(&format!("    - {}\n", issue));
        }
        if record.issues.len() > ISSUES_SHOWN {
            output.push_str(&format!(
                "    ... and {} more\n",
                record.issues.len() - ISSUES_SHOWN
            ));
        }
    }

    output
}
