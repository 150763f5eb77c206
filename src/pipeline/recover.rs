use tracing::{debug, info};

use crate::io::parse_html;
use crate::models::{DocumentNode, Export, RecoveredBlock, RecoveryRecord, RecoveryStats};

use super::segment::{find_thinking_containers, Segmenter};

/// Result of comparing the raw document against the structured stages
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// The export carries no raw document
    NoRawDocument,
    /// Raw document holds no more stages than the structured form
    UpToDate { total_found: usize, current: usize },
    /// More stages in the raw document; needs manual alignment
    Recoverable(RecoveryRecord),
}

impl RecoveryOutcome {
    pub fn record(&self) -> Option<&RecoveryRecord> {
        match self {
            RecoveryOutcome::Recoverable(record) => Some(record),
            _ => None,
        }
    }
}

/// Segment every thinking container of a document
///
/// Containers that yield no stages are skipped but keep their position in
/// `block_index`.
pub fn recover_blocks(root: &DocumentNode, segmenter: &Segmenter) -> Vec<RecoveredBlock> {
    find_thinking_containers(root)
        .into_iter()
        .enumerate()
        .filter_map(|(block_index, container)| {
            let stages = segmenter.segment(container);
            if stages.is_empty() {
                debug!("Container {} yielded no stages", block_index);
                return None;
            }
            Some(RecoveredBlock {
                block_index,
                stages,
                raw_text: container.text_content(),
            })
        })
        .collect()
}

/// Recovery pass over one export
///
/// Never touches the export: recovered stages are only surfaced, since
/// tying a raw block to its owning exchange is left to a person.
pub fn recover(export: &Export, source_file: &str, segmenter: &Segmenter) -> RecoveryOutcome {
    let Some(raw_html) = export.raw_html.as_deref() else {
        return RecoveryOutcome::NoRawDocument;
    };

    debug!("Raw document size: {} bytes", raw_html.len());
    let root = parse_html(raw_html);
    let blocks = recover_blocks(&root, segmenter);

    let total_found: usize = blocks.iter().map(|b| b.stages.len()).sum();
    let current = export.structured_stage_count();

    info!(
        "{}: {} stages in {} raw thinking blocks, {} already structured",
        source_file,
        total_found,
        blocks.len(),
        current
    );

    if total_found <= current {
        return RecoveryOutcome::UpToDate {
            total_found,
            current,
        };
    }

    RecoveryOutcome::Recoverable(RecoveryRecord {
        source_file: source_file.to_string(),
        recovered_thinking_blocks: blocks,
        recovery_stats: RecoveryStats {
            total_found,
            current_in_json: current,
            newly_recovered: total_found - current,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exchange, Message, Stage};

    const RAW: &str = r#"<html><body>
        <div class="model-thinking">
          <p><strong>Clarifying the request</strong></p>
          <p>They want X.</p>
          <p><strong>Drafting a plan</strong></p>
          <p>Do Y then Z.</p>
        </div>
        <div class="model-thinking"><p>no headers here</p></div>
        <div class="model-thinking">
          <p><b>Checking</b></p>
          <p>Looks fine.</p>
        </div>
    </body></html>"#;

    fn export_with(stages: Vec<Stage>, raw: Option<&str>) -> Export {
        Export {
            exchanges: vec![Exchange::new(vec![
                Message::thinking(stages),
                Message::response("answer"),
            ])],
            raw_html: raw.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_recover_blocks_keeps_container_positions() {
        let root = parse_html(RAW);
        let blocks = recover_blocks(&root, &Segmenter::default());

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].block_index, 0);
        assert_eq!(blocks[0].stages.len(), 2);
        assert_eq!(blocks[1].block_index, 2);
        assert_eq!(blocks[1].stages, vec![Stage::new("Checking", "Looks fine.")]);
        assert!(blocks[1].raw_text.starts_with("Checking"));
    }

    #[test]
    fn test_recover_without_raw_document() {
        let export = export_with(vec![], None);
        assert_eq!(
            recover(&export, "a.json", &Segmenter::default()),
            RecoveryOutcome::NoRawDocument
        );
    }

    #[test]
    fn test_recover_reports_missing_stages() {
        let export = export_with(vec![], Some(RAW));
        let outcome = recover(&export, "a.json", &Segmenter::default());

        let record = outcome.record().expect("recoverable");
        assert_eq!(record.source_file, "a.json");
        assert_eq!(
            record.recovery_stats,
            RecoveryStats {
                total_found: 3,
                current_in_json: 0,
                newly_recovered: 3,
            }
        );
        // The export itself is untouched
        assert!(export.exchanges[0].thinking_stages().is_empty());
    }

    #[test]
    fn test_recover_up_to_date() {
        let stages = vec![
            Stage::new("a", "1"),
            Stage::new("b", "2"),
            Stage::new("c", "3"),
        ];
        let export = export_with(stages, Some(RAW));
        assert_eq!(
            recover(&export, "a.json", &Segmenter::default()),
            RecoveryOutcome::UpToDate {
                total_found: 3,
                current: 3
            }
        );
    }

    #[test]
    fn test_recover_raw_document_without_containers() {
        let export = export_with(vec![], Some("<p><b>Lonely</b></p><p>text</p>"));
        assert_eq!(
            recover(&export, "a.json", &Segmenter::default()),
            RecoveryOutcome::UpToDate {
                total_found: 0,
                current: 0
            }
        );
    }
}
