use crate::parsers::{self, ContentKind, html};

#[test]
fn test_detect_content_kind() {
    assert_eq!(ContentKind::detect("<p>Hello</p>"), ContentKind::Html);
    assert_eq!(ContentKind::detect("Line<br/>break"), ContentKind::Html);
    assert_eq!(ContentKind::detect("Salary < 100k"), ContentKind::Text);
    assert_eq!(ContentKind::detect("plain words"), ContentKind::Text);
}

#[test]
fn test_block_elements_become_paragraphs() {
    let fragment = "<h2>About</h2><p>We build   <b>tools</b>.</p><ul><li>Rust</li><li>Go</li></ul>";
    assert_eq!(html::to_text(fragment), "About\n\nWe build tools.\n\nRust\n\nGo");
}

#[test]
fn test_scripts_and_styles_are_dropped() {
    let fragment = "<style>p { color: red }</style><p>Visible</p><script>alert(1)</script>";
    assert_eq!(html::to_text(fragment), "Visible");
}

#[test]
fn test_plain_text_dispatch() {
    assert_eq!(parsers::plain_text("<p>One</p><p>Two</p>"), "One\n\nTwo");
    assert_eq!(parsers::plain_text("  One\n\nTwo  "), "One Two");
}
