use crate::error::ScrapeError;
use crate::filter::LinkFilter;
use crate::parsers;
use crate::rate_limiter::RateLimiter;
use crate::results::JobPosting;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Instruction sent along with every posting extraction
const EXTRACT_PROMPT: &str =
    "Extract details about the job posting. Leave fields blank if uncertain. Do not make things up.";

/// Delay between polls of an asynchronous extraction job
const EXTRACT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Polls before a pending extraction is given up
const MAX_EXTRACT_POLLS: usize = 150;

/// Default bound on waiting for one service response
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Fields of an extracted posting that map onto `JobPosting` itself
const CORE_FIELDS: &[&str] = &["job_title", "title", "description", "apply_link"];

/// Raw access to a scraping service
#[async_trait]
pub trait ScrapeBackend: Send + Sync {
    /// Scrape the listing page and return the apply links found on it
    async fn listing_links(&self, page: &Url) -> Result<Vec<String>, ScrapeError>;

    /// Start extracting one posting
    async fn extract_posting(&self, link: &Url) -> Result<Extraction, ScrapeError>;

    /// Check on a pending extraction; `None` while it is still running
    async fn poll_extraction(&self, id: &str) -> Result<Option<Value>, ScrapeError> {
        Err(ScrapeError::Malformed(format!(
            "extraction {} is pending but polling is unsupported",
            id
        )))
    }
}

/// State of a posting extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// The posting as an untyped JSON object
    Ready(Value),
    /// Still running on the service under this job id
    Pending(String),
}

/// JSON schema for the listing page scrape
pub fn apply_links_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "apply_links": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["apply_links"]
    })
}

/// JSON schema for one extracted posting
pub fn posting_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "job_title": { "type": "string" },
            "description": { "type": "string" },
            "sub_division_of_organization": { "type": "string" },
            "key_skills": { "type": "array", "items": { "type": "string" } },
            "compensation": { "type": "string" },
            "location": { "type": "string" },
            "apply_link": { "type": "string" }
        },
        "required": ["job_title"]
    })
}

/// Scrapes postings through a backend, paced by the shared rate limiter
pub struct ScraperClient {
    backend: Arc<dyn ScrapeBackend>,
    limiter: Arc<RateLimiter>,
    filter: Arc<LinkFilter>,
    max_jobs: usize,
    max_concurrency: usize,
    call_timeout: Duration,
}

impl ScraperClient {
    pub fn new(
        backend: Arc<dyn ScrapeBackend>,
        limiter: Arc<RateLimiter>,
        filter: LinkFilter,
        max_jobs: usize,
        max_concurrency: usize,
    ) -> Self {
        Self {
            backend,
            limiter,
            filter: Arc::new(filter),
            max_jobs,
            max_concurrency: max_concurrency.max(1),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound each service response; rate limit pauses are not counted
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Scrape up to `max_jobs` postings from the listing page.
    ///
    /// Postings that fail to extract are skipped; the call fails only when
    /// the listing itself fails or nothing could be extracted.
    pub async fn scrape(&self, page: &Url) -> Result<Vec<JobPosting>, ScrapeError> {
        if self.max_jobs == 0 {
            return Err(ScrapeError::ZeroMaxJobs);
        }

        ::log::info!("Scraping job listing page: {}", page);
        self.limiter.acquire().await;
        let raw_links = bounded(self.call_timeout, self.backend.listing_links(page)).await?;

        let mut links = self.filter.apply(page, &raw_links);
        ::log::info!(
            "Found {} apply links ({} after filtering)",
            raw_links.len(),
            links.len()
        );
        if links.is_empty() {
            return Err(ScrapeError::NoLinks(page.to_string()));
        }
        links.truncate(self.max_jobs);

        let postings = self.extract_all(links).await;
        if postings.is_empty() {
            return Err(ScrapeError::NoPostings);
        }

        ::log::info!("Extracted {} job postings", postings.len());
        Ok(postings)
    }

    /// Extracts postings concurrently, keeping link order in the output
    async fn extract_all(&self, links: Vec<Url>) -> Vec<JobPosting> {
        let total = links.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, link) in links.into_iter().enumerate() {
            let backend = Arc::clone(&self.backend);
            let limiter = Arc::clone(&self.limiter);
            let semaphore = Arc::clone(&semaphore);
            let call_timeout = self.call_timeout;

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };

                let extracted = extract_one(backend.as_ref(), &limiter, &link, call_timeout).await;
                let posting = match extracted {
                    Ok(value) => match posting_from_value(&value, &link) {
                        Ok(posting) => {
                            ::log::info!("Extracted posting {}/{}: {}", index + 1, total, link);
                            Some(posting)
                        }
                        Err(e) => {
                            ::log::warn!("Skipping {}: {}", link, e);
                            None
                        }
                    },
                    Err(e) => {
                        ::log::warn!("Failed to extract {}: {}", link, e);
                        None
                    }
                };
                (index, posting)
            });
        }

        let mut slots: Vec<Option<JobPosting>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, posting)) => slots[index] = posting,
                Err(e) => ::log::error!("Extraction task failed: {}", e),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// Extracts one posting, polling the service while it is pending.
///
/// Every call, polls included, goes through the rate limiter first.
async fn extract_one(
    backend: &dyn ScrapeBackend,
    limiter: &RateLimiter,
    link: &Url,
    call_timeout: Duration,
) -> Result<Value, ScrapeError> {
    limiter.acquire().await;
    let id = match bounded(call_timeout, backend.extract_posting(link)).await? {
        Extraction::Ready(value) => return Ok(value),
        Extraction::Pending(id) => id,
    };

    for _ in 0..MAX_EXTRACT_POLLS {
        tokio::time::sleep(EXTRACT_POLL_INTERVAL).await;
        limiter.acquire().await;
        if let Some(value) = bounded(call_timeout, backend.poll_extraction(&id)).await? {
            return Ok(value);
        }
        ::log::debug!("Extraction {} for {} still pending", id, link);
    }
    Err(ScrapeError::Timeout)
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ScrapeError>>,
) -> Result<T, ScrapeError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ScrapeError::Timeout)?
}

/// Converts an extracted JSON object into a posting.
///
/// The title is required; the description is flattened to plain text; an
/// `apply_link` that is not an absolute http(s) URL falls back to the link
/// the posting was extracted from.
pub fn posting_from_value(value: &Value, link: &Url) -> Result<JobPosting, ScrapeError> {
    let fields = value
        .as_object()
        .ok_or_else(|| ScrapeError::Malformed(format!("expected an object, got {}", value)))?;

    let title = ["job_title", "title"]
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|t| !t.is_empty())
        .ok_or_else(|| ScrapeError::Malformed("posting has no title".to_string()))?;

    let description = fields
        .get("description")
        .and_then(Value::as_str)
        .map(parsers::plain_text)
        .unwrap_or_default();

    let url = fields
        .get("apply_link")
        .and_then(Value::as_str)
        .and_then(|s| Url::parse(s.trim()).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or_else(|| link.clone());

    let metadata: Map<String, Value> = fields
        .iter()
        .filter(|(key, v)| !CORE_FIELDS.contains(&key.as_str()) && !v.is_null())
        .map(|(key, v)| (key.clone(), v.clone()))
        .collect();

    Ok(JobPosting {
        title: title.to_string(),
        url: Some(url.to_string()),
        description,
        metadata,
    })
}

/// Firecrawl-compatible scraping service
pub struct FirecrawlBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    data: Option<ScrapeData>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    json: Option<ApplyLinks>,
}

#[derive(Debug, Deserialize)]
struct ApplyLinks {
    #[serde(default)]
    apply_links: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    status: Option<String>,
    data: Option<Value>,
    error: Option<String>,
}

impl FirecrawlBackend {
    pub fn new(client: reqwest::Client, api_key: String, base_url: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ScrapeError> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ScrapeError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ScrapeError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Api {
                status: status.as_u16(),
                message: super::error_message(response).await,
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ScrapeError::Malformed(e.to_string()))
    }
}

/// Returns the data of a finished extraction, `None` while it is pending
fn finished_extract(response: &ExtractResponse) -> Result<Option<Value>, ScrapeError> {
    match response.status.as_deref() {
        Some("failed") | Some("cancelled") => Err(ScrapeError::Malformed(
            response
                .error
                .clone()
                .unwrap_or_else(|| "extraction failed".to_string()),
        )),
        Some("completed") | None => match &response.data {
            Some(data) if !data.is_null() => Ok(Some(data.clone())),
            _ if response.status.is_some() => {
                Err(ScrapeError::Malformed("extraction returned no data".to_string()))
            }
            _ => Ok(None),
        },
        Some(_) => Ok(None),
    }
}

#[async_trait]
impl ScrapeBackend for FirecrawlBackend {
    async fn listing_links(&self, page: &Url) -> Result<Vec<String>, ScrapeError> {
        let body = json!({
            "url": page.as_str(),
            "formats": ["json"],
            "jsonOptions": { "schema": apply_links_schema() }
        });
        let response: ScrapeResponse = self.post("/v1/scrape", &body).await?;
        if !response.success {
            return Err(ScrapeError::Malformed("scrape reported failure".to_string()));
        }

        response
            .data
            .and_then(|d| d.json)
            .map(|j| j.apply_links)
            .ok_or_else(|| ScrapeError::Malformed("scrape result has no json section".to_string()))
    }

    async fn extract_posting(&self, link: &Url) -> Result<Extraction, ScrapeError> {
        let body = json!({
            "urls": [link.as_str()],
            "prompt": EXTRACT_PROMPT,
            "schema": posting_schema()
        });
        let response: ExtractResponse = self.post("/v1/extract", &body).await?;
        if !response.success {
            return Err(ScrapeError::Malformed(
                response
                    .error
                    .unwrap_or_else(|| "extract reported failure".to_string()),
            ));
        }

        if let Some(data) = finished_extract(&response)? {
            return Ok(Extraction::Ready(data));
        }
        match response.id {
            Some(id) => Ok(Extraction::Pending(id)),
            None => Err(ScrapeError::Malformed(
                "extract returned neither data nor a job id".to_string(),
            )),
        }
    }

    async fn poll_extraction(&self, id: &str) -> Result<Option<Value>, ScrapeError> {
        let job: ExtractResponse = self.get(&format!("/v1/extract/{}", id)).await?;
        let data = finished_extract(&job)?;
        if data.is_none() {
            ::log::debug!("Extraction {} is {:?}", id, job.status);
        }
        Ok(data)
    }
}
