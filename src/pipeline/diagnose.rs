use crate::heuristics::{DuplicationDetector, Verdict};
use crate::models::{DiagnosticRecord, DiagnosticSummary, Export, MessageKind};

const UNKNOWN: &str = "unknown";

/// Analyze one export for thinking-block defects
///
/// Detects:
/// 1. Thinking messages with no stages
/// 2. Responses repeating a stage name of their exchange
/// 3. Responses that read like reasoning in exchanges with no thinking message
///
/// Pure: the export is only read.
pub fn diagnose(export: &Export, file: &str, detector: &DuplicationDetector) -> DiagnosticRecord {
    let mut record = DiagnosticRecord {
        file: file.to_string(),
        export_date: export
            .timestamp_label()
            .unwrap_or_else(|| UNKNOWN.to_string()),
        export_version: export
            .version_label()
            .unwrap_or_else(|| UNKNOWN.to_string()),
        exchange_count: export.stored_exchange_count(),
        message_count: export.message_count,
        ..Default::default()
    };

    for (index, exchange) in export.exchanges.iter().enumerate() {
        let has_thinking = exchange.thinking().is_some();
        let stages = exchange.thinking_stages();

        for message in &exchange.messages {
            match message.kind() {
                MessageKind::Thinking(own_stages) => {
                    record.thinking_messages += 1;
                    if own_stages.is_empty() {
                        record.thinking_without_stages += 1;
                        record
                            .issues
                            .push(format!("Exchange {}: Thinking message has no stages", index));
                    } else {
                        record.thinking_with_stages += 1;
                    }
                }
                MessageKind::Response(text) => match detector.evaluate(text, stages, has_thinking) {
                    Verdict::Duplicate { .. } => {
                        record.responses_with_thinking_text += 1;
                        record.issues.push(format!(
                            "Exchange {}: Response contains duplicate thinking text",
                            index
                        ));
                    }
                    Verdict::SuspectedLeak { .. } => {
                        record.issues.push(format!(
                            "Exchange {}: Response has thinking keywords but no thinking message",
                            index
                        ));
                    }
                    Verdict::Clean => {}
                },
                MessageKind::Other => {}
            }
        }

        if has_thinking {
            record.exchanges_with_thinking += 1;
        } else {
            record.exchanges_without_thinking += 1;
        }
    }

    record
}

/// Aggregate a batch of records
pub fn summarize(records: &[DiagnosticRecord]) -> DiagnosticSummary {
    let mut summary = DiagnosticSummary {
        files_analyzed: records.len(),
        ..Default::default()
    };

    for record in records {
        let has_thinking = record.thinking_messages > 0;
        let has_duplicates = record.responses_with_thinking_text > 0;

        if record.has_issues() {
            summary.files_with_issues += 1;
        }
        if !has_thinking {
            summary.files_without_thinking += 1;
        }
        if has_duplicates {
            summary.files_with_duplicates += 1;
        }
        if record.thinking_without_stages > 0 {
            summary.files_with_empty_stages += 1;
        }

        let version = summary
            .by_version
            .entry(record.export_version.clone())
            .or_default();
        version.total += 1;
        if has_thinking {
            version.with_thinking += 1;
        }
        if has_duplicates {
            version.with_duplicates += 1;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Exchange, Message, Stage, VersionBreakdown};

    fn sample_export() -> Export {
        Export {
            export_version: Some("2.0".into()),
            export_timestamp: Some("2025-01-02T03:04:05Z".into()),
            exchange_count: Some(3.into()),
            message_count: 5,
            exchanges: vec![
                Exchange::new(vec![
                    Message::thinking(vec![Stage::new("Drafting a plan", "...")]),
                    Message::response("Drafting a plan: first I will ..."),
                ]),
                Exchange::new(vec![Message::thinking(vec![]), Message::response("Fine.")]),
                Exchange::new(vec![Message::response("I'm focusing on your question.")]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_diagnose_counts_and_issues() {
        let record = diagnose(&sample_export(), "a.json", &DuplicationDetector::default());

        assert_eq!(record.file, "a.json");
        assert_eq!(record.export_version, "2.0");
        assert_eq!(record.export_date, "2025-01-02T03:04:05Z");
        assert_eq!(record.exchange_count, 3);
        assert_eq!(record.message_count, 5);
        assert_eq!(record.thinking_messages, 2);
        assert_eq!(record.thinking_with_stages, 1);
        assert_eq!(record.thinking_without_stages, 1);
        assert_eq!(record.responses_with_thinking_text, 1);
        assert_eq!(record.exchanges_with_thinking, 2);
        assert_eq!(record.exchanges_without_thinking, 1);
        assert_eq!(
            record.issues,
            vec![
                "Exchange 0: Response contains duplicate thinking text",
                "Exchange 1: Thinking message has no stages",
                "Exchange 2: Response has thinking keywords but no thinking message",
            ]
        );
    }

    #[test]
    fn test_diagnose_empty_export() {
        let record = diagnose(&Export::default(), "empty.json", &DuplicationDetector::default());
        assert_eq!(record.export_version, "unknown");
        assert_eq!(record.export_date, "unknown");
        assert!(!record.has_issues());
    }

    #[test]
    fn test_numeric_version_groups_as_text() {
        let export: Export =
            serde_json::from_str(r#"{"export_version": 2, "exchange_count": 0}"#).unwrap();
        let record = diagnose(&export, "n.json", &DuplicationDetector::default());

        assert_eq!(record.export_version, "2");
        assert_eq!(summarize(&[record]).by_version["2"].total, 1);
    }

    #[test]
    fn test_summarize_groups_by_version() {
        let detector = DuplicationDetector::default();
        let mut older = sample_export();
        older.export_version = Some("1.0".into());
        older.exchanges.truncate(0);

        let records = vec![
            diagnose(&sample_export(), "a.json", &detector),
            diagnose(&sample_export(), "b.json", &detector),
            diagnose(&older, "c.json", &detector),
        ];
        let summary = summarize(&records);

        assert_eq!(summary.files_analyzed, 3);
        assert_eq!(summary.files_with_issues, 2);
        assert_eq!(summary.files_without_thinking, 1);
        assert_eq!(summary.files_with_duplicates, 2);
        assert_eq!(summary.files_with_empty_stages, 2);
        assert_eq!(
            summary.by_version.keys().collect::<Vec<_>>(),
            vec!["1.0", "2.0"]
        );
        assert_eq!(
            summary.by_version["2.0"],
            VersionBreakdown {
                total: 2,
                with_thinking: 2,
                with_duplicates: 2
            }
        );
        assert_eq!(summary.by_version["1.0"].with_thinking, 0);
    }
}
