use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One scraped job listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    /// Title of the position
    pub title: String,

    /// Link to the posting (if known)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Plain-text description
    #[serde(default)]
    pub description: String,

    /// Remaining extracted fields (location, compensation, skills, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl JobPosting {
    /// Create a new posting without metadata
    pub fn new(title: impl Into<String>, url: Option<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url,
            description: description.into(),
            metadata: Map::new(),
        }
    }

    /// Attach a metadata field
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// A metadata field rendered as text, if present and non-empty
    pub fn metadata_text(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Array(items) if !items.is_empty() => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// One ranked posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The recommended posting
    pub job: JobPosting,

    /// 1-based rank, 1 is the best fit
    pub rank: u32,

    /// Why the model picked this posting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Candidate résumé as written, minus surrounding blank space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeText(String);

impl ResumeText {
    /// Wrap résumé text; whitespace-only text is rejected
    pub fn new(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ConfigError::ResumeEmpty(origin.to_path_buf()));
        }
        Ok(Self(text.to_string()))
    }

    /// Load the résumé from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ResumeUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let resume = Self::new(&raw, path)?;
        ::log::info!("Loaded résumé from {} ({} chars)", path.display(), resume.0.len());
        Ok(resume)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_metadata_text() {
        let job = JobPosting::new("Engineer", None, "")
            .with_metadata("location", json!("  Remote "))
            .with_metadata("key_skills", json!(["Rust", "SQL"]))
            .with_metadata("compensation", json!(""));

        assert_eq!(job.metadata_text("location").as_deref(), Some("Remote"));
        assert_eq!(job.metadata_text("key_skills").as_deref(), Some("Rust, SQL"));
        assert_eq!(job.metadata_text("compensation"), None);
        assert_eq!(job.metadata_text("missing"), None);
    }

    #[test]
    fn test_resume_load_and_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\nSkills\n- Rust\n- Go\n\nExperience\n- Acme   2020-2024\n").unwrap();
        let resume = ResumeText::load(file.path()).unwrap();
        assert_eq!(
            resume.as_str(),
            "Skills\n- Rust\n- Go\n\nExperience\n- Acme   2020-2024"
        );

        let empty = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            ResumeText::load(empty.path()),
            Err(ConfigError::ResumeEmpty(_))
        ));
        assert!(matches!(
            ResumeText::new(" \n\t\n ", Path::new("blank.txt")),
            Err(ConfigError::ResumeEmpty(_))
        ));

        assert!(matches!(
            ResumeText::load(Path::new("/definitely/not/here.txt")),
            Err(ConfigError::ResumeUnreadable { .. })
        ));
    }
}
