use crate::error::RecommendationError;
use crate::rate_limiter::RateLimiter;
use crate::results::{JobPosting, Recommendation, ResumeText};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a career advisor. You compare a candidate's résumé with job \
postings and rank the postings by how well they fit the candidate's experience and skills. \
Only reference postings by the index they were given.";

/// Longest description embedded in the prompt, in characters
const MAX_DESCRIPTION_CHARS: usize = 4000;

/// Default bound on waiting for the model's reply
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Raw access to a language model
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send a prompt and return the model's text reply, which must follow `schema`
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<String, RecommendationError>;
}

/// JSON schema the model's reply must follow
pub fn ranking_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "rankings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "index": { "type": "integer" },
                        "rationale": { "type": "string" }
                    },
                    "required": ["index", "rationale"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["rankings"],
        "additionalProperties": false
    })
}

#[derive(Debug, Deserialize)]
struct RankingResponse {
    rankings: Vec<RankedIndex>,
}

#[derive(Debug, Deserialize)]
struct RankedIndex {
    index: usize,
    #[serde(default)]
    rationale: Option<String>,
}

/// A posting as it is shown to the model
#[derive(Serialize)]
struct PromptJob<'a> {
    index: usize,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    description: String,
    #[serde(flatten)]
    metadata: &'a serde_json::Map<String, Value>,
}

/// Ranks postings against a résumé through a language model
pub struct RecommenderClient {
    backend: Arc<dyn CompletionBackend>,
    limiter: Arc<RateLimiter>,
    call_timeout: Duration,
}

impl RecommenderClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            backend,
            limiter,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Bound the wait for the reply; the rate limit pause is not counted
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Ask for the `count` best-fitting postings, best first.
    ///
    /// Asking for more than there are postings returns all of them, ranked.
    pub async fn recommend(
        &self,
        resume: &ResumeText,
        jobs: &[JobPosting],
        count: usize,
    ) -> Result<Vec<Recommendation>, RecommendationError> {
        if jobs.is_empty() {
            return Err(RecommendationError::NoJobs);
        }
        let wanted = count.min(jobs.len());
        if wanted < count {
            ::log::info!(
                "Only {} jobs available, requesting {} recommendations instead of {}",
                jobs.len(),
                wanted,
                count
            );
        }

        let prompt = build_prompt(resume, jobs, wanted)?;

        self.limiter.acquire().await;
        ::log::info!("Requesting {} recommendations for {} jobs", wanted, jobs.len());
        let reply = tokio::time::timeout(
            self.call_timeout,
            self.backend.complete(&prompt, &ranking_schema()),
        )
        .await
        .map_err(|_| RecommendationError::Timeout)??;

        let recommendations = parse_rankings(&reply, jobs, wanted)?;
        if recommendations.len() < wanted {
            ::log::warn!(
                "Model ranked only {} of {} requested jobs",
                recommendations.len(),
                wanted
            );
        }
        Ok(recommendations)
    }
}

/// Builds the user prompt embedding the résumé and the indexed job list
pub fn build_prompt(
    resume: &ResumeText,
    jobs: &[JobPosting],
    count: usize,
) -> Result<String, RecommendationError> {
    let listed: Vec<PromptJob<'_>> = jobs
        .iter()
        .enumerate()
        .map(|(index, job)| PromptJob {
            index,
            title: &job.title,
            url: job.url.as_deref(),
            description: truncate_chars(&job.description, MAX_DESCRIPTION_CHARS),
            metadata: &job.metadata,
        })
        .collect();
    let listings = serde_json::to_string_pretty(&listed)
        .map_err(|e| RecommendationError::Malformed(e.to_string()))?;

    Ok(format!(
        "<instructions>\n\
         Analyze the resume and job listings, and return the top {count} roles that best fit \
         the candidate's experience and skills, best fit first.\n\
         Respond with a JSON object {{\"rankings\": [{{\"index\": <job index>, \"rationale\": <one or two sentences>}}]}} \
         containing exactly {count} entries with distinct indices.\n\
         </instructions>\n\n\
         <resume>\n{resume}\n</resume>\n\n\
         <job_listings>\n{listings}\n</job_listings>\n",
        count = count,
        resume = resume.as_str(),
        listings = listings,
    ))
}

/// Maps the model's reply back onto the submitted jobs.
///
/// Every referenced index must exist and appear once; the model's order is
/// kept and cut to `count` entries.
pub fn parse_rankings(
    reply: &str,
    jobs: &[JobPosting],
    count: usize,
) -> Result<Vec<Recommendation>, RecommendationError> {
    let text = strip_json_fences(reply);
    if text.is_empty() {
        return Err(RecommendationError::EmptyContent);
    }

    let response: RankingResponse =
        serde_json::from_str(text).map_err(|e| RecommendationError::Malformed(e.to_string()))?;
    if response.rankings.is_empty() {
        return Err(RecommendationError::EmptyRanking);
    }

    let mut seen = HashSet::new();
    for ranked in &response.rankings {
        if ranked.index >= jobs.len() {
            return Err(RecommendationError::IndexOutOfRange {
                index: ranked.index,
                count: jobs.len(),
            });
        }
        if !seen.insert(ranked.index) {
            return Err(RecommendationError::DuplicateIndex(ranked.index));
        }
    }

    Ok(response
        .rankings
        .into_iter()
        .take(count)
        .enumerate()
        .map(|(position, ranked)| Recommendation {
            job: jobs[ranked.index].clone(),
            rank: position as u32 + 1,
            rationale: ranked
                .rationale
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
        })
        .collect())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// OpenAI-compatible chat completions service
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    refusal: Option<String>,
}

impl OpenAiBackend {
    pub fn new(client: reqwest::Client, api_key: String, base_url: &str, model: &str) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str, schema: &Value) -> Result<String, RecommendationError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": { "name": "job_rankings", "strict": true, "schema": schema }
            }
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecommendationError::Api {
                status: status.as_u16(),
                message: super::error_message(response).await,
            });
        }

        let body = response.text().await?;
        let chat: ChatResponse =
            serde_json::from_str(&body).map_err(|e| RecommendationError::Malformed(e.to_string()))?;
        let message = chat
            .choices
            .into_iter()
            .next()
            .ok_or(RecommendationError::EmptyContent)?
            .message;

        if let Some(refusal) = message.refusal {
            return Err(RecommendationError::Malformed(format!("model refused: {}", refusal)));
        }
        message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(RecommendationError::EmptyContent)
    }
}
