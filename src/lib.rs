//! Scrape a job board, rank its postings against a résumé with a language
//! model, and print or save the shortlist.

pub mod clients;
pub mod config;
pub mod error;
pub mod filter;
pub mod output;
pub mod parsers;
pub mod pipeline;
pub mod rate_limiter;
pub mod results;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{Credentials, RunConfig};
pub use error::{ConfigError, OutputError, PipelineError, RecommendationError, ScrapeError, Stage};
pub use pipeline::{Pipeline, RunReport};
pub use rate_limiter::RateLimiter;
pub use results::{JobPosting, Recommendation, ResumeText};
