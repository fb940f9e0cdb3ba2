//! Wrappers around the two hosted services.
//!
//! Each client owns the domain logic (pacing, validation, mapping into typed
//! results) and talks to its service through a backend trait, so the HTTP
//! layer can be swapped for a deterministic stub.

pub mod recommender;
pub mod scraper;

pub use recommender::{CompletionBackend, OpenAiBackend, RecommenderClient};
pub use scraper::{Extraction, FirecrawlBackend, ScrapeBackend, ScraperClient};

use std::time::Duration;

/// Builds the shared HTTP client with a per-request timeout
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Reads an error body, preferring the service's own message field
async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message").or(Some(e)))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or(body)
}
