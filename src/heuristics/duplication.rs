use tracing::debug;

use crate::models::{Message, MessageKind, Stage};

use super::DetectorConfig;

/// Outcome of checking one response against its exchange's reasoning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing suspicious
    Clean,
    /// Response restates the stage with this name; the whole message should go
    Duplicate { stage_name: String },
    /// No thinking message exists but the response reads like reasoning.
    /// Reported only, never removed.
    SuspectedLeak { phrase: String },
}

/// True when `response_text` contains, verbatim, the name of any named stage
///
/// Case-sensitive substring match with no normalization. An empty stage list
/// never matches.
pub fn is_duplicate(response_text: &str, stages: &[Stage]) -> bool {
    matching_stage(response_text, stages).is_some()
}

fn matching_stage<'a>(response_text: &str, stages: &'a [Stage]) -> Option<&'a Stage> {
    stages
        .iter()
        .find(|s| !s.stage_name.is_empty() && response_text.contains(s.stage_name.as_str()))
}

/// First configured reasoning phrase found verbatim in `text`
pub fn find_reasoning_phrase<'a>(text: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases
        .iter()
        .map(String::as_str)
        .find(|p| !p.is_empty() && text.contains(p))
}

/// Decides whether response messages repeat reasoning content
#[derive(Debug, Clone, Default)]
pub struct DuplicationDetector {
    config: DetectorConfig,
}

impl DuplicationDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Classify a response
    ///
    /// With stages present only stage-name containment counts. Without stages
    /// the phrase list is consulted, and only when the exchange has no
    /// thinking message at all.
    pub fn evaluate(&self, response_text: &str, stages: &[Stage], has_thinking: bool) -> Verdict {
        if !stages.is_empty() {
            return match matching_stage(response_text, stages) {
                Some(stage) => Verdict::Duplicate {
                    stage_name: stage.stage_name.clone(),
                },
                None => Verdict::Clean,
            };
        }

        if has_thinking {
            return Verdict::Clean;
        }

        match find_reasoning_phrase(response_text, &self.config.reasoning_phrases) {
            Some(phrase) => Verdict::SuspectedLeak {
                phrase: phrase.to_string(),
            },
            None => Verdict::Clean,
        }
    }

    /// Keep `message` unless it is a response duplicating `stages`
    ///
    /// Returns `None` when the message should be dropped. Content is never
    /// edited.
    pub fn strip_if_duplicate(&self, message: Message, stages: &[Stage]) -> Option<Message> {
        let MessageKind::Response(text) = message.kind() else {
            return Some(message);
        };

        match matching_stage(text, stages) {
            Some(stage) => {
                debug!(
                    "Dropping response {:?}: repeats stage {:?}",
                    message.message_index, stage.stage_name
                );
                None
            }
            None => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stages() -> Vec<Stage> {
        vec![
            Stage::new("Clarifying the request", "The user asks about..."),
            Stage::new("Drafting a plan", "First, outline..."),
        ]
    }

    #[test]
    fn test_stage_name_substring_is_duplicate() {
        assert!(is_duplicate("Clarifying the request", &stages()));
        assert!(is_duplicate("Drafting a plan: first I will ...", &stages()));
    }

    #[test]
    fn test_no_overlap_is_not_duplicate() {
        assert!(!is_duplicate("Paris is the capital of France.", &stages()));
        assert!(!is_duplicate("anything", &[]));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        assert!(!is_duplicate("clarifying the request", &stages()));
        assert!(!is_duplicate("Clarifying  the request", &stages()));
    }

    #[test]
    fn test_empty_stage_names_are_ignored() {
        let stages = vec![Stage::new("", "body only")];
        assert!(!is_duplicate("any text at all", &stages));
    }

    #[test]
    fn test_evaluate_with_stages() {
        let detector = DuplicationDetector::default();
        assert_eq!(
            detector.evaluate("Drafting a plan now", &stages(), true),
            Verdict::Duplicate {
                stage_name: "Drafting a plan".to_string()
            }
        );
        // Phrase list is not consulted when stages exist
        assert_eq!(
            detector.evaluate("I'm thinking about it", &stages(), true),
            Verdict::Clean
        );
    }

    #[test]
    fn test_evaluate_phrase_fallback() {
        let detector = DuplicationDetector::default();
        assert_eq!(
            detector.evaluate("I'm focusing on the edge cases first.", &[], false),
            Verdict::SuspectedLeak {
                phrase: "I'm focusing".to_string()
            }
        );
        // A thinking message (even one without stages) suppresses the fallback
        assert_eq!(
            detector.evaluate("I'm focusing on the edge cases first.", &[], true),
            Verdict::Clean
        );
        assert_eq!(detector.evaluate("The answer is 4.", &[], false), Verdict::Clean);
    }

    #[test]
    fn test_custom_phrases() {
        let detector = DuplicationDetector::new(DetectorConfig {
            reasoning_phrases: vec!["Let me ponder".to_string()],
        });
        assert_eq!(
            detector.evaluate("Let me ponder this.", &[], false),
            Verdict::SuspectedLeak {
                phrase: "Let me ponder".to_string()
            }
        );
        assert_eq!(detector.evaluate("I'm thinking", &[], false), Verdict::Clean);
    }

    #[test]
    fn test_strip_if_duplicate() {
        let detector = DuplicationDetector::default();

        let leaked = Message::response("Clarifying the request\n\nThe user asks about...");
        assert!(detector.strip_if_duplicate(leaked, &stages()).is_none());

        let answer = Message::response("Here is the answer.");
        let kept = detector.strip_if_duplicate(answer.clone(), &stages()).unwrap();
        assert_eq!(kept, answer);

        // Thinking messages are never dropped, whatever they contain
        let thinking = Message::thinking(stages());
        assert!(detector.strip_if_duplicate(thinking, &stages()).is_some());
    }
}
