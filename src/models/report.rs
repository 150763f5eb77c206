use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Stage;

/// Per-export analysis summary
///
/// Always derived from an [`Export`](super::Export) and never written back into it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub file: String,
    pub export_date: String,
    pub export_version: String,
    pub exchange_count: usize,
    pub message_count: usize,
    pub thinking_messages: usize,
    pub thinking_with_stages: usize,
    pub thinking_without_stages: usize,
    pub responses_with_thinking_text: usize,
    pub exchanges_with_thinking: usize,
    pub exchanges_without_thinking: usize,
    pub issues: Vec<String>,
}

impl DiagnosticRecord {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Counts for one `export_version`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBreakdown {
    pub total: usize,
    pub with_thinking: usize,
    pub with_duplicates: usize,
}

/// Aggregate over a batch of [`DiagnosticRecord`]s
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub files_analyzed: usize,
    pub files_with_issues: usize,
    pub files_without_thinking: usize,
    pub files_with_duplicates: usize,
    pub files_with_empty_stages: usize,
    /// Keyed by export version, sorted
    pub by_version: BTreeMap<String, VersionBreakdown>,
}

/// Side artifact listing stages found in the raw document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    pub source_file: String,
    pub recovered_thinking_blocks: Vec<RecoveredBlock>,
    pub recovery_stats: RecoveryStats,
}

/// Stages segmented out of one thinking container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveredBlock {
    /// Position of the container among all matched containers
    pub block_index: usize,
    pub stages: Vec<Stage>,
    pub raw_text: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryStats {
    /// Stages segmented from the raw document
    pub total_found: usize,
    /// Stages already present in structured thinking messages
    pub current_in_json: usize,
    pub newly_recovered: usize,
}
