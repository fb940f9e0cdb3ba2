use crate::parsers::text::{self, TextOptions};

#[test]
fn test_split_into_paragraphs() {
    assert!(text::split_into_paragraphs("").is_empty());

    let result = text::split_into_paragraphs("Line 1a\n  Line 1b\n\n\n\nLine 2a");
    assert_eq!(result.len(), 2);
    assert_eq!(result[0], vec!["Line 1a", "Line 1b"]);
    assert_eq!(result[1], vec!["Line 2a"]);
}

#[test]
fn test_default_options_flatten_everything() {
    let input = "Paragraph 1.\n\n\nParagraph   2.\nstill 2.";
    assert_eq!(
        text::normalize(input, &TextOptions::default()),
        "Paragraph 1. Paragraph 2. still 2."
    );
}

#[test]
fn test_preserved_paragraphs_collapse_blank_lines() {
    let options = TextOptions {
        preserve_paragraphs: true,
        ..TextOptions::default()
    };
    let input = "Jane Doe\nSenior Engineer\n\n\n\nSKILLS\nRust,   Go\tKubernetes\n";
    assert_eq!(
        text::normalize(input, &options),
        "Jane Doe Senior Engineer\n\nSKILLS Rust, Go Kubernetes"
    );
}

#[test]
fn test_whitespace_only_input() {
    assert_eq!(text::normalize(" \n\t\n ", &TextOptions::default()), "");
}

#[test]
fn test_without_whitespace_normalization() {
    let options = TextOptions {
        preserve_paragraphs: false,
        normalize_whitespace: false,
    };
    assert_eq!(text::normalize("a  b\nc", &options), "a  b c");
}
