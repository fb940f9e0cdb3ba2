use crate::parsers::text::{self, TextOptions};
use scraper::{ElementRef, Html, Node};

/// Elements whose end starts a new paragraph in the flattened text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "section", "tr",
];

/// Flattens an HTML fragment into plain text, one paragraph per block element
pub fn to_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);

    let mut raw = String::new();
    collect_text(doc.root_element(), &mut raw);

    let options = TextOptions {
        preserve_paragraphs: true,
        ..TextOptions::default()
    };
    text::normalize(&raw, &options)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => {
                if matches!(e.name(), "script" | "style") {
                    continue;
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if BLOCK_ELEMENTS.contains(&e.name()) {
                    out.push_str("\n\n");
                }
            }
            _ => {}
        }
    }
}
