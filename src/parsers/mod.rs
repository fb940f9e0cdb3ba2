//! Plain-text cleanup for content coming back from the scraping service and
//! for the résumé before it is embedded in a prompt.

pub mod html;
pub mod text;

#[cfg(test)]
mod tests;

/// Kind of content a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Markup that has to be flattened
    Html,
    /// Already plain text
    Text,
}

impl ContentKind {
    /// Sniffs the content: anything with an opening and closing tag is HTML
    pub fn detect(content: &str) -> Self {
        let trimmed = content.trim_start();
        let has_tag = trimmed.contains("</") || trimmed.contains("/>") || trimmed.starts_with('<');
        if has_tag && trimmed.contains('>') {
            ContentKind::Html
        } else {
            ContentKind::Text
        }
    }
}

/// Converts a scraped field into normalized plain text
pub fn plain_text(content: &str) -> String {
    match ContentKind::detect(content) {
        ContentKind::Html => {
            ::log::trace!("Flattening HTML field ({} bytes)", content.len());
            html::to_text(content)
        }
        ContentKind::Text => text::normalize(content, &text::TextOptions::default()),
    }
}
