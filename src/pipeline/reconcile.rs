use tracing::{debug, info};

use crate::heuristics::DuplicationDetector;
use crate::models::{DiagnosticRecord, Exchange, Export};

use super::diagnose::diagnose;
use super::recover::{recover, RecoveryOutcome};
use super::segment::Segmenter;

/// Counts from the cleanup step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Exchanges that lost at least one message
    pub exchanges_cleaned: usize,
    pub messages_removed: usize,
}

/// Everything a full reconcile pass produces besides the cleaned export
#[derive(Debug, Clone)]
pub struct ReconcileResult {
    /// Diagnostics taken before cleanup
    pub diagnostics: DiagnosticRecord,
    pub clean: CleanStats,
    pub recovery: RecoveryOutcome,
}

/// Orchestrates duplicate removal, diagnostics and raw-document recovery
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    detector: DuplicationDetector,
    segmenter: Segmenter,
}

impl Reconciler {
    pub fn new(detector: DuplicationDetector, segmenter: Segmenter) -> Self {
        Self {
            detector,
            segmenter,
        }
    }

    pub fn detector(&self) -> &DuplicationDetector {
        &self.detector
    }

    /// Remove responses that repeat their exchange's reasoning
    ///
    /// Existing stages are never edited. `message_count` is recomputed from
    /// what remains. Running this twice changes nothing the second time.
    pub fn clean(&self, export: &mut Export) -> CleanStats {
        let mut stats = CleanStats::default();

        for (index, exchange) in export.exchanges.iter_mut().enumerate() {
            let removed = self.clean_exchange(exchange);
            if removed > 0 {
                debug!("Exchange {}: removed {} duplicate responses", index, removed);
                stats.exchanges_cleaned += 1;
                stats.messages_removed += removed;
            }
        }

        export.message_count = export.total_messages();
        stats
    }

    /// Returns the number of messages removed
    fn clean_exchange(&self, exchange: &mut Exchange) -> usize {
        let stages = exchange.thinking_stages().to_vec();
        if stages.is_empty() {
            return 0;
        }

        let before = exchange.messages.len();
        exchange.messages = std::mem::take(&mut exchange.messages)
            .into_iter()
            .filter_map(|message| self.detector.strip_if_duplicate(message, &stages))
            .collect();

        let removed = before - exchange.messages.len();
        if removed > 0 {
            exchange.renumber();
        }
        removed
    }

    /// Recovery pass only
    pub fn recover(&self, export: &Export, source_file: &str) -> RecoveryOutcome {
        recover(export, source_file, &self.segmenter)
    }

    /// Full pass: diagnose, clean, then look for recoverable stages
    pub fn reconcile(&self, export: &mut Export, source_file: &str) -> ReconcileResult {
        let diagnostics = diagnose(export, source_file, &self.detector);
        let clean = self.clean(export);
        let recovery = self.recover(export, source_file);

        info!(
            "{}: {} issues, {} messages removed from {} exchanges",
            source_file,
            diagnostics.issues.len(),
            clean.messages_removed,
            clean.exchanges_cleaned
        );

        ReconcileResult {
            diagnostics,
            clean,
            recovery,
        }
    }
}
