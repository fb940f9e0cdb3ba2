use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with the run configuration, detected before any network call
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable '{0}'")]
    MissingCredential(&'static str),

    #[error("invalid jobs URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no jobs URL given (use --jobs-url or set jobs_url in the config file)")]
    MissingJobsUrl,

    #[error("rate limit must be at least 1 call per window")]
    ZeroRateLimit,

    #[error("rate limit window must be longer than zero seconds")]
    ZeroWindow,

    #[error("{0} must be at least 1")]
    ZeroValue(&'static str),

    #[error("failed to read résumé from {path}: {source}")]
    ResumeUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("résumé at {0} is empty")]
    ResumeEmpty(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    ConfigFileUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigFileInvalid {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid link pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("--use-cache requires --output-dir")]
    CacheWithoutOutputDir,
}

/// Failures of the scraping stage
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("scraping service request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("scraping service timed out")]
    Timeout,

    #[error("scraping service returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unparseable scrape response: {0}")]
    Malformed(String),

    #[error("no apply links found on {0}")]
    NoLinks(String),

    #[error("no job postings could be extracted")]
    NoPostings,

    #[error("max jobs is 0, nothing to scrape")]
    ZeroMaxJobs,
}

impl From<reqwest::Error> for ScrapeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScrapeError::Timeout
        } else {
            ScrapeError::Http(e)
        }
    }
}

/// Failures of the ranking stage
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("language model request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("language model request timed out")]
    Timeout,

    #[error("language model returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("language model returned empty content")]
    EmptyContent,

    #[error("unparseable ranking: {0}")]
    Malformed(String),

    #[error("ranking references job index {index}, but only {count} jobs were submitted")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("ranking lists job index {0} more than once")]
    DuplicateIndex(usize),

    #[error("language model returned no rankings")]
    EmptyRanking,

    #[error("no jobs to rank")]
    NoJobs,
}

impl From<reqwest::Error> for RecommendationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RecommendationError::Timeout
        } else {
            RecommendationError::Http(e)
        }
    }
}

/// Failures while persisting results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Scraping,
    Recommending,
    Writing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Scraping => "scraping",
            Stage::Recommending => "recommending",
            Stage::Writing => "writing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// A failed run, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),

    #[error("ScrapeError: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("RecommendationError: {0}")]
    Recommendation(#[from] RecommendationError),

    #[error("IOError: {0}")]
    Output(#[from] OutputError),

    #[error("interrupted")]
    Interrupted,
}

impl PipelineError {
    /// The stage a failure belongs to (unknown for interrupts)
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Config(_) => Some(Stage::Init),
            PipelineError::Scrape(_) => Some(Stage::Scraping),
            PipelineError::Recommendation(_) => Some(Stage::Recommending),
            PipelineError::Output(_) => Some(Stage::Writing),
            PipelineError::Interrupted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_display_names_kind() {
        let err = PipelineError::from(ScrapeError::Timeout);
        assert_eq!(err.to_string(), "ScrapeError: scraping service timed out");
        assert_eq!(err.stage(), Some(Stage::Scraping));

        let err = PipelineError::from(RecommendationError::IndexOutOfRange { index: 7, count: 3 });
        assert!(err.to_string().starts_with("RecommendationError:"));
        assert_eq!(err.stage(), Some(Stage::Recommending));
    }
}
