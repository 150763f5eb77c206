use scraper::{ElementRef, Html, Node};

use crate::models::{DocumentNode, Element};

/// Elements whose content is never visible text
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Parse a raw HTML capture into an owned [`DocumentNode`] tree
///
/// The returned root is the `<html>` element. Comments, doctypes and
/// script/style bodies are left out.
pub fn parse_html(raw_html: &str) -> DocumentNode {
    let document = Html::parse_document(raw_html);
    convert_element(document.root_element())
}

fn convert_element(element: ElementRef<'_>) -> DocumentNode {
    let value = element.value();

    let attributes = value
        .attrs()
        .map(|(name, v)| (name.to_string(), v.to_string()))
        .collect();

    let children = element
        .children()
        .filter_map(|child| match child.value() {
            Node::Element(el) if SKIPPED_TAGS.contains(&el.name()) => None,
            Node::Element(_) => ElementRef::wrap(child).map(convert_element),
            Node::Text(text) => Some(DocumentNode::Text(text.to_string())),
            _ => None,
        })
        .collect();

    DocumentNode::Element(Element {
        tag: value.name().to_string(),
        attributes,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeRole, Stage};
    use crate::pipeline::{find_thinking_containers, segment};

    const CAPTURE: &str = r#"<!DOCTYPE html>
        <html><head><style>p { color: red }</style></head>
        <body>
          <div class="conversation">
            <div data-test-id="model-thoughts" class="thoughts-container">
              <div>
                <p><strong>Clarifying the request</strong></p>
                <p>The user wants a <em>short</em> answer.</p>
                <p><b>Drafting a plan</b></p>
                <p>List the steps.</p>
                <script>console.log("ignored")</script>
              </div>
            </div>
            <div class="response">The answer.</div>
          </div>
        </body></html>"#;

    #[test]
    fn test_parse_html_tree() {
        let root = parse_html(CAPTURE);
        assert_eq!(root.tag(), Some("html"));
        assert!(!root.text_content().contains("color: red"));
        assert!(!root.text_content().contains("console.log"));

        let marked = root.find_all(|n| n.attr("data-test-id") == Some("model-thoughts"));
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].attr("class"), Some("thoughts-container"));
    }

    #[test]
    fn test_emphasis_roles_from_markup() {
        let root = parse_html("<p><b>x</b><strong>y</strong><i>z</i></p>");
        let p = root.find_all(|n| n.tag() == Some("p"))[0];
        let roles: Vec<_> = p.children().iter().map(DocumentNode::role).collect();
        assert_eq!(roles, vec![NodeRole::Emphasis, NodeRole::Emphasis, NodeRole::Inline]);
    }

    #[test]
    fn test_lead_in_spacing_preserved() {
        let root = parse_html(r#"<div class="thinking"><p><b>Plan</b></p><p><b>Note:</b>x=1</p></div>"#);
        let containers = find_thinking_containers(&root);

        assert_eq!(segment(containers[0]), vec![Stage::new("Plan", "Note:x=1")]);
    }

    #[test]
    fn test_capture_segments_into_stages() {
        let root = parse_html(CAPTURE);
        let containers = find_thinking_containers(&root);
        assert_eq!(containers.len(), 1);

        assert_eq!(
            segment(containers[0]),
            vec![
                Stage::new("Clarifying the request", "The user wants a short answer."),
                Stage::new("Drafting a plan", "List the steps."),
            ]
        );
    }
}
