use std::collections::BTreeMap;

/// Tags treated as paragraph-like blocks
pub const BLOCK_TAGS: &[&str] = &["p", "div"];

/// Tags treated as emphasis (stage-title candidates)
pub const EMPHASIS_TAGS: &[&str] = &["strong", "b"];

/// A node of a recovered document tree
///
/// Built transiently from a raw document and thrown away after segmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Lower-case tag name
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<DocumentNode>,
}

/// What a node means to the segmenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Block,
    Emphasis,
    Inline,
    Text,
}

impl DocumentNode {
    pub fn element(tag: impl Into<String>) -> Self {
        DocumentNode::Element(Element {
            tag: tag.into(),
            ..Default::default()
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        DocumentNode::Text(text.into())
    }

    /// Set an attribute; no effect on text nodes
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let DocumentNode::Element(el) = &mut self {
            el.attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Append a child; no effect on text nodes
    pub fn with_child(mut self, child: DocumentNode) -> Self {
        if let DocumentNode::Element(el) = &mut self {
            el.children.push(child);
        }
        self
    }

    pub fn with_children(self, children: impl IntoIterator<Item = DocumentNode>) -> Self {
        children.into_iter().fold(self, DocumentNode::with_child)
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            DocumentNode::Element(el) => Some(el.tag.as_str()),
            DocumentNode::Text(_) => None,
        }
    }

    pub fn role(&self) -> NodeRole {
        match self.tag() {
            None => NodeRole::Text,
            Some(tag) if BLOCK_TAGS.contains(&tag) => NodeRole::Block,
            Some(tag) if EMPHASIS_TAGS.contains(&tag) => NodeRole::Emphasis,
            Some(_) => NodeRole::Inline,
        }
    }

    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Element(el) => &el.children,
            DocumentNode::Text(_) => &[],
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        match self {
            DocumentNode::Element(el) => el.attributes.get(name).map(String::as_str),
            DocumentNode::Text(_) => None,
        }
    }

    /// Whitespace-separated tokens of the `class` attribute
    pub fn class_tokens(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Concatenation of every text node below this one, untouched
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            DocumentNode::Text(text) => out.push_str(text),
            DocumentNode::Element(el) => {
                for child in &el.children {
                    child.push_text(out);
                }
            }
        }
    }

    /// Flattened text: whitespace runs collapsed to one space, ends trimmed
    pub fn text_content(&self) -> String {
        self.raw_text().split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Pre-order walk, starting with this node
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Every node (this one included) matching `predicate`, in document order
    pub fn find_all<F>(&self, predicate: F) -> Vec<&DocumentNode>
    where
        F: Fn(&DocumentNode) -> bool,
    {
        self.descendants().filter(|n| predicate(*n)).collect()
    }

    /// First node strictly below this one with the given role
    pub fn first_with_role(&self, role: NodeRole) -> Option<&DocumentNode> {
        self.descendants().skip(1).find(|n| n.role() == role)
    }

    pub fn has_descendant_with_role(&self, role: NodeRole) -> bool {
        self.first_with_role(role).is_some()
    }
}

/// Iterator returned by [`DocumentNode::descendants`]
pub struct Descendants<'a> {
    stack: Vec<&'a DocumentNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a DocumentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
