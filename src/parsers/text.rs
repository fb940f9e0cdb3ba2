/// Options for plain-text normalization
#[derive(Debug, Clone, Copy)]
pub struct TextOptions {
    /// Keep blank-line paragraph breaks (collapsed to exactly one blank line)
    pub preserve_paragraphs: bool,
    /// Collapse runs of spaces and tabs
    pub normalize_whitespace: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            preserve_paragraphs: false,
            normalize_whitespace: true,
        }
    }
}

/// Normalizes text according to options
pub fn normalize(text: &str, options: &TextOptions) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let paragraphs = split_into_paragraphs(text);
    let processed: Vec<String> = paragraphs
        .iter()
        .map(|para| {
            let joined = para.join(" ");
            if options.normalize_whitespace {
                joined.split_whitespace().collect::<Vec<_>>().join(" ")
            } else {
                joined
            }
        })
        .filter(|para| !para.is_empty())
        .collect();

    if options.preserve_paragraphs {
        processed.join("\n\n")
    } else {
        processed.join(" ")
    }
}

/// Splits text into paragraphs of trimmed lines, separated by blank lines
pub fn split_into_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(trimmed);
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs
}
