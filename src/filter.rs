use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// Configuration for filtering the apply links found on a listing page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkFilterConfig {
    /// Only keep links on the same host as the listing page
    #[serde(default)]
    pub same_host_only: bool,

    /// Regex patterns a link must match (if empty, all links are included unless excluded)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns for links to drop (these take precedence over include patterns)
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        // Static assets are never postings
        r"(?i)\.(jpg|jpeg|png|gif|css|js|ico|svg|woff|woff2|ttf|eot)$".to_string(),
    ]
}

impl Default for LinkFilterConfig {
    fn default() -> Self {
        Self {
            same_host_only: false,
            include_patterns: Vec::new(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

/// Resolves and filters apply links
#[derive(Debug)]
pub struct LinkFilter {
    config: LinkFilterConfig,
    include_regexes: Vec<Regex>,
    exclude_regexes: Vec<Regex>,
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self::new(LinkFilterConfig::default()).expect("Default regex patterns should be valid")
    }
}

impl LinkFilter {
    /// Create a new link filter from configuration
    pub fn new(config: LinkFilterConfig) -> Result<Self, regex::Error> {
        let include_regexes = config
            .include_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude_regexes = config
            .exclude_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            config,
            include_regexes,
            exclude_regexes,
        })
    }

    /// Resolves raw links against the listing page and returns the unique
    /// ones that pass the filter, in their original order
    pub fn apply(&self, base: &Url, links: &[String]) -> Vec<Url> {
        let mut seen = HashSet::new();
        let mut accepted = Vec::new();

        for link in links {
            let link = link.trim();
            if link.is_empty() {
                continue;
            }

            let resolved = match base.join(link) {
                Ok(url) => normalize_url(&url),
                Err(e) => {
                    ::log::debug!("Skipping unresolvable link {:?}: {}", link, e);
                    continue;
                }
            };

            if !self.accepts(&resolved, base) {
                ::log::debug!("Link filter rejected: {}", resolved);
                continue;
            }

            if seen.insert(resolved.as_str().to_string()) {
                accepted.push(resolved);
            } else {
                ::log::trace!("Skipping duplicate link: {}", resolved);
            }
        }

        accepted
    }

    /// Determine if a resolved link is kept
    pub fn accepts(&self, url: &Url, base: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }

        if self.config.same_host_only && url.host_str() != base.host_str() {
            return false;
        }

        let url_str = url.as_str();
        if self.exclude_regexes.iter().any(|re| re.is_match(url_str)) {
            return false;
        }

        self.include_regexes.is_empty() || self.include_regexes.iter().any(|re| re.is_match(url_str))
    }
}

/// Strips the fragment, which never identifies a different posting
pub fn normalize_url(url: &Url) -> Url {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/jobs").unwrap()
    }

    fn links(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relative_links_resolve_and_dedupe() {
        let filter = LinkFilter::default();
        let raw = links(&[
            "/jobs/1",
            "https://example.com/jobs/1#apply",
            "jobs/2",
            "https://boards.example.org/acme/3",
            "",
        ]);

        let result: Vec<String> = filter
            .apply(&base(), &raw)
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(
            result,
            vec![
                "https://example.com/jobs/1",
                "https://example.com/jobs/2",
                "https://boards.example.org/acme/3",
            ]
        );
    }

    #[test]
    fn test_non_http_and_assets_are_dropped() {
        let filter = LinkFilter::default();
        let raw = links(&[
            "mailto:jobs@example.com",
            "javascript:void(0)",
            "/static/logo.PNG",
            "/jobs/7",
        ]);

        let result = filter.apply(&base(), &raw);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].as_str(), "https://example.com/jobs/7");
    }

    #[test]
    fn test_same_host_only() {
        let config = LinkFilterConfig {
            same_host_only: true,
            ..LinkFilterConfig::default()
        };
        let filter = LinkFilter::new(config).unwrap();
        let raw = links(&["/jobs/1", "https://other.com/jobs/2"]);

        let result = filter.apply(&base(), &raw);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].host_str(), Some("example.com"));
    }

    #[test]
    fn test_regex_patterns() {
        let config = LinkFilterConfig {
            same_host_only: false,
            include_patterns: vec![r"/jobs/\d+$".to_string()],
            exclude_patterns: vec![r"/jobs/9\d*$".to_string()],
        };
        let filter = LinkFilter::new(config).unwrap();
        let raw = links(&["/jobs/12", "/about", "/jobs/90"]);

        let result = filter.apply(&base(), &raw);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].path(), "/jobs/12");
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let config = LinkFilterConfig {
            include_patterns: vec!["(unclosed".to_string()],
            ..LinkFilterConfig::default()
        };
        assert!(LinkFilter::new(config).is_err());
    }
}
