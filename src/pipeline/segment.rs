use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::models::{DocumentNode, NodeRole, Stage};

/// Attribute marking a thinking container explicitly
pub const THOUGHTS_MARKER_ATTR: &str = "data-test-id";
pub const THOUGHTS_MARKER_VALUE: &str = "model-thoughts";

/// How a single block reads once flattened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockClass {
    /// The whole block is one bold span
    Header(String),
    /// Plain prose
    Body(String),
    /// Opens with a bold span but carries more prose after it
    Ambiguous {
        /// The whole block, flattened
        text: String,
        lead: String,
        rest: String,
    },
}

/// What an ambiguous block turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Header(String),
    Body(String),
    /// Start a stage and seed its body
    HeaderWithBody { name: String, body: String },
}

/// Decides what to do with blocks that start with a bold lead-in
///
/// `text` is the whole flattened block; `lead` and `rest` split it at the end
/// of the bold span.
pub trait AmbiguityPolicy: fmt::Debug + Send + Sync {
    fn resolve(&self, text: &str, lead: &str, rest: &str) -> Resolution;
}

/// Keep the whole block as prose of the current stage
#[derive(Debug, Clone, Copy, Default)]
pub struct AsBody;

impl AmbiguityPolicy for AsBody {
    fn resolve(&self, text: &str, _lead: &str, _rest: &str) -> Resolution {
        Resolution::Body(text.to_string())
    }
}

/// Treat the lead-in as a stage title and drop what follows it
#[derive(Debug, Clone, Copy, Default)]
pub struct AsHeader;

impl AmbiguityPolicy for AsHeader {
    fn resolve(&self, _text: &str, lead: &str, _rest: &str) -> Resolution {
        Resolution::Header(lead.to_string())
    }
}

/// Treat the lead-in as a stage title and the remainder as its first paragraph
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitLeadIn;

impl AmbiguityPolicy for SplitLeadIn {
    fn resolve(&self, _text: &str, lead: &str, rest: &str) -> Resolution {
        Resolution::HeaderWithBody {
            name: lead.to_string(),
            body: rest.to_string(),
        }
    }
}

/// Classify one block, or `None` if it has no visible text
pub fn classify_block(block: &DocumentNode) -> Option<BlockClass> {
    let text = block.text_content();
    if text.is_empty() {
        return None;
    }

    let Some(emphasis) = block.first_with_role(NodeRole::Emphasis) else {
        return Some(BlockClass::Body(text));
    };

    let lead = emphasis.text_content();
    if lead == text {
        return Some(BlockClass::Header(text));
    }

    let rest = match text.strip_prefix(lead.as_str()) {
        Some(rest) if !lead.is_empty() => rest.trim_start().to_string(),
        _ => return Some(BlockClass::Body(text)),
    };

    Some(BlockClass::Ambiguous { text, lead, rest })
}

/// Blocks of a container in document order
///
/// Wrapper blocks (blocks holding other blocks) are walked through rather
/// than returned, so no text is visited twice. Loose text directly under
/// the container or a wrapper is not a block and is skipped.
pub fn leaf_blocks(container: &DocumentNode) -> Vec<&DocumentNode> {
    let mut blocks = Vec::new();
    collect_blocks(container, &mut blocks);
    blocks
}

fn collect_blocks<'a>(node: &'a DocumentNode, out: &mut Vec<&'a DocumentNode>) {
    for child in node.children() {
        match child.role() {
            NodeRole::Text => {}
            NodeRole::Block if !child.has_descendant_with_role(NodeRole::Block) => out.push(child),
            _ => collect_blocks(child, out),
        }
    }
}

/// Find thinking containers in a document
///
/// Selectors are tried in order and the first that matches anything wins:
/// the explicit marker attribute, then a class token containing "thinking",
/// then one containing "thought" (both case-insensitive). Nested matches are
/// all returned.
pub fn find_thinking_containers(root: &DocumentNode) -> Vec<&DocumentNode> {
    let by_marker =
        |n: &DocumentNode| n.attr(THOUGHTS_MARKER_ATTR) == Some(THOUGHTS_MARKER_VALUE);
    let by_thinking_class = |n: &DocumentNode| has_class_containing(n, "thinking");
    let by_thought_class = |n: &DocumentNode| has_class_containing(n, "thought");

    let selectors: [&dyn Fn(&DocumentNode) -> bool; 3] =
        [&by_marker, &by_thinking_class, &by_thought_class];

    for selector in selectors {
        let found = root.find_all(selector);
        if !found.is_empty() {
            return found;
        }
    }

    Vec::new()
}

fn has_class_containing(node: &DocumentNode, needle: &str) -> bool {
    node.class_tokens()
        .any(|token| token.to_lowercase().contains(needle))
}

/// Stage being accumulated
struct PendingStage {
    name: String,
    paragraphs: Vec<String>,
}

impl PendingStage {
    fn new(name: String) -> Self {
        Self {
            name,
            paragraphs: Vec::new(),
        }
    }

    /// Finished stage, or `None` if no prose ever arrived
    fn finish(self) -> Option<Stage> {
        let body = self.paragraphs.join("\n\n");
        let body = body.trim();
        if body.is_empty() {
            debug!("Dropping stage {:?}: empty body", self.name);
            return None;
        }
        Some(Stage::new(self.name, body))
    }
}

/// Splits a thinking container into named stages
#[derive(Debug, Clone)]
pub struct Segmenter {
    policy: Arc<dyn AmbiguityPolicy>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::with_policy(AsBody)
    }
}

impl Segmenter {
    pub fn with_policy(policy: impl AmbiguityPolicy + 'static) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// Segment a container into stages
    ///
    /// Pass one classifies every leaf block; pass two walks the classes with
    /// a single pending stage. Prose before the first header is dropped, as
    /// is any header that never receives prose. Stage names may repeat.
    pub fn segment(&self, container: &DocumentNode) -> Vec<Stage> {
        let classes: Vec<BlockClass> = leaf_blocks(container)
            .into_iter()
            .filter_map(classify_block)
            .collect();

        let mut stages = Vec::new();
        let mut pending: Option<PendingStage> = None;

        for class in classes {
            let resolution = match class {
                BlockClass::Header(name) => Resolution::Header(name),
                BlockClass::Body(text) => Resolution::Body(text),
                BlockClass::Ambiguous { text, lead, rest } => {
                    self.policy.resolve(&text, &lead, &rest)
                }
            };

            match resolution {
                Resolution::Header(name) => {
                    stages.extend(pending.take().and_then(PendingStage::finish));
                    pending = Some(PendingStage::new(name));
                }
                Resolution::HeaderWithBody { name, body } => {
                    stages.extend(pending.take().and_then(PendingStage::finish));
                    let mut stage = PendingStage::new(name);
                    stage.paragraphs.push(body);
                    pending = Some(stage);
                }
                Resolution::Body(text) => match pending.as_mut() {
                    Some(stage) => stage.paragraphs.push(text),
                    None => debug!("Dropping block before first header: {:?}", text),
                },
            }
        }

        stages.extend(pending.and_then(PendingStage::finish));
        stages
    }
}

/// Segment with the default policy
pub fn segment(container: &DocumentNode) -> Vec<Stage> {
    Segmenter::default().segment(container)
}
