use regex::Regex;
use std::sync::OnceLock;

/// Longest file stem derived from a URL
const MAX_STEM_LEN: usize = 100;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"))
}

/// Convert a URL to a string usable as a file stem
pub fn sanitize_filename(url: &str) -> String {
    let stripped = url
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    let name = unsafe_chars().replace_all(stripped, "_");

    // Byte cut is safe: the name is ASCII after replacement
    if name.len() > MAX_STEM_LEN {
        name[..MAX_STEM_LEN].to_string()
    } else {
        name.into_owned()
    }
}
