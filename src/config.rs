use crate::error::ConfigError;
use crate::filter::LinkFilterConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const FIRECRAWL_API_KEY: &str = "FIRECRAWL_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const FIRECRAWL_API_URL: &str = "FIRECRAWL_API_URL";
const OPENAI_API_URL: &str = "OPENAI_API_URL";
const OPENAI_MODEL: &str = "OPENAI_MODEL";

/// Settings for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Page listing the jobs
    #[serde(default)]
    pub jobs_url: String,

    /// Résumé file
    #[serde(default = "default_resume_path")]
    pub resume_path: PathBuf,

    /// Cap on scraped postings
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Number of ranked results requested
    #[serde(default = "default_num_recommendations")]
    pub num_recommendations: usize,

    /// Where result files go; console only when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Max API calls per window
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Rolling window length in seconds
    #[serde(default = "default_window_size_secs")]
    pub window_size_secs: u64,

    /// Max posting extractions in flight
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Per HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on waiting for one service response in seconds, rate limit pauses excluded
    #[serde(default = "default_response_timeout_secs")]
    pub response_timeout_secs: u64,

    /// Reuse and store extracted postings in the output directory
    #[serde(default)]
    pub use_cache: bool,

    /// Apply link filtering rules
    #[serde(default)]
    pub link_filter: LinkFilterConfig,
}

fn default_resume_path() -> PathBuf {
    PathBuf::from("resume.txt")
}

fn default_max_jobs() -> usize {
    10
}

fn default_num_recommendations() -> usize {
    5
}

fn default_rate_limit() -> u32 {
    10
}

fn default_window_size_secs() -> u64 {
    60
}

fn default_max_concurrency() -> usize {
    5
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_response_timeout_secs() -> u64 {
    600
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new("")
    }
}

impl RunConfig {
    /// Create a configuration with default values
    pub fn new(jobs_url: &str) -> Self {
        Self {
            jobs_url: jobs_url.to_string(),
            resume_path: default_resume_path(),
            max_jobs: default_max_jobs(),
            num_recommendations: default_num_recommendations(),
            output_dir: None,
            rate_limit: default_rate_limit(),
            window_size_secs: default_window_size_secs(),
            max_concurrency: default_max_concurrency(),
            request_timeout_secs: default_request_timeout_secs(),
            response_timeout_secs: default_response_timeout_secs(),
            use_cache: false,
            link_filter: LinkFilterConfig::default(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigFileUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json(&contents).map_err(|source| ConfigError::ConfigFileInvalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check the values that cannot be expressed in the types
    pub fn validate(&self) -> Result<Url, ConfigError> {
        let url = self.jobs_url()?;
        if self.rate_limit == 0 {
            return Err(ConfigError::ZeroRateLimit);
        }
        if self.window_size_secs == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroValue("concurrency"));
        }
        if self.num_recommendations == 0 {
            return Err(ConfigError::ZeroValue("num-recommendations"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("request-timeout"));
        }
        if self.response_timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("response-timeout"));
        }
        if self.use_cache && self.output_dir.is_none() {
            return Err(ConfigError::CacheWithoutOutputDir);
        }
        Ok(url)
    }

    /// The jobs URL, parsed; only http(s) pages can be scraped
    pub fn jobs_url(&self) -> Result<Url, ConfigError> {
        if self.jobs_url.trim().is_empty() {
            return Err(ConfigError::MissingJobsUrl);
        }
        let url = Url::parse(self.jobs_url.trim()).map_err(|e| ConfigError::InvalidUrl {
            url: self.jobs_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                url: self.jobs_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(url)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_size_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

/// API credentials and endpoints for the two external services
#[derive(Clone)]
pub struct Credentials {
    pub scraper_api_key: String,
    pub llm_api_key: String,
    pub scraper_base_url: String,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("scraper_api_key", &"<redacted>")
            .field("llm_api_key", &"<redacted>")
            .field("scraper_base_url", &self.scraper_base_url)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .finish()
    }
}

impl Credentials {
    /// Read credentials from the environment, loading `.env` if present
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(key))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            scraper_api_key: require(FIRECRAWL_API_KEY)?,
            llm_api_key: require(OPENAI_API_KEY)?,
            scraper_base_url: optional(FIRECRAWL_API_URL, "https://api.firecrawl.dev"),
            llm_base_url: optional(OPENAI_API_URL, "https://api.openai.com/v1"),
            llm_model: optional(OPENAI_MODEL, "gpt-4o"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            RunConfig::from_json(r#"{"jobs_url": "https://example.com/jobs", "max_jobs": 3}"#)
                .unwrap();
        assert_eq!(config.max_jobs, 3);
        assert_eq!(config.num_recommendations, 5);
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.window_size_secs, 60);
        assert_eq!(config.resume_path, PathBuf::from("resume.txt"));
        assert!(!config.link_filter.exclude_patterns.is_empty());
    }

    #[test]
    fn test_validate() {
        let config = RunConfig::new("https://example.com/jobs");
        assert_eq!(config.validate().unwrap().host_str(), Some("example.com"));

        assert!(matches!(
            RunConfig::default().validate(),
            Err(ConfigError::MissingJobsUrl)
        ));
        assert!(matches!(
            RunConfig::new("ftp://example.com").validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            RunConfig::new("not a url").validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));

        let mut config = RunConfig::new("https://example.com/jobs");
        config.rate_limit = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroRateLimit)));

        let mut config = RunConfig::new("https://example.com/jobs");
        config.use_cache = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CacheWithoutOutputDir)
        ));

        let mut config = RunConfig::new("https://example.com/jobs");
        config.response_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroValue("response-timeout"))
        ));

        // More recommendations than jobs only truncates the result
        let mut config = RunConfig::new("https://example.com/jobs");
        config.max_jobs = 2;
        config.num_recommendations = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_required() {
        let missing = Credentials::from_lookup(lookup(&[(FIRECRAWL_API_KEY, "fc")]));
        assert!(matches!(
            missing,
            Err(ConfigError::MissingCredential(OPENAI_API_KEY))
        ));

        let blank = Credentials::from_lookup(lookup(&[
            (FIRECRAWL_API_KEY, "  "),
            (OPENAI_API_KEY, "sk"),
        ]));
        assert!(matches!(
            blank,
            Err(ConfigError::MissingCredential(FIRECRAWL_API_KEY))
        ));
    }

    #[test]
    fn test_credentials_overrides() {
        let creds = Credentials::from_lookup(lookup(&[
            (FIRECRAWL_API_KEY, "fc"),
            (OPENAI_API_KEY, "sk-secret-value"),
            (OPENAI_MODEL, "gpt-4o-mini"),
        ]))
        .unwrap();
        assert_eq!(creds.llm_model, "gpt-4o-mini");
        assert_eq!(creds.scraper_base_url, "https://api.firecrawl.dev");
        assert!(!format!("{:?}", creds).contains("secret-value"));
    }
}
