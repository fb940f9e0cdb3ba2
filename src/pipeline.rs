use crate::clients::{
    self, CompletionBackend, FirecrawlBackend, OpenAiBackend, RecommenderClient, ScrapeBackend,
    ScraperClient,
};
use crate::config::{Credentials, RunConfig};
use crate::error::{ConfigError, PipelineError, ScrapeError, Stage};
use crate::filter::LinkFilter;
use crate::output::{self, ArtifactStore};
use crate::rate_limiter::RateLimiter;
use crate::results::{JobPosting, Recommendation, ResumeText};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Postings that were ranked
    pub jobs_considered: usize,
    /// Ranked shortlist, best first
    pub recommendations: Vec<Recommendation>,
    /// Result file, when an output directory was configured
    pub output_file: Option<PathBuf>,
}

/// Scrape → recommend → write, with one rate limiter shared by both services
pub struct Pipeline {
    config: RunConfig,
    jobs_url: Url,
    scraper: ScraperClient,
    recommender: RecommenderClient,
    store: Option<ArtifactStore>,
    stage: Stage,
}

impl Pipeline {
    /// Wire a pipeline over arbitrary service backends
    pub fn new(
        config: RunConfig,
        scrape_backend: Arc<dyn ScrapeBackend>,
        completion_backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, ConfigError> {
        let jobs_url = config.validate()?;
        if config.num_recommendations > config.max_jobs {
            ::log::warn!(
                "Requested {} recommendations from at most {} jobs; results will be truncated",
                config.num_recommendations,
                config.max_jobs
            );
        }
        let limiter = Arc::new(RateLimiter::new(config.rate_limit, config.window())?);
        ::log::debug!(
            "Rate limit: {} calls per {}s",
            limiter.limit(),
            limiter.window().as_secs()
        );
        let filter = LinkFilter::new(config.link_filter.clone())?;

        let scraper = ScraperClient::new(
            scrape_backend,
            Arc::clone(&limiter),
            filter,
            config.max_jobs,
            config.max_concurrency,
        )
        .with_call_timeout(config.response_timeout());
        let recommender = RecommenderClient::new(completion_backend, limiter)
            .with_call_timeout(config.response_timeout());
        let store = config
            .output_dir
            .as_deref()
            .map(|dir| ArtifactStore::new(dir, jobs_url.as_str()));

        Ok(Self {
            config,
            jobs_url,
            scraper,
            recommender,
            store,
            stage: Stage::Init,
        })
    }

    /// Wire a pipeline over the hosted services
    pub fn from_credentials(
        config: RunConfig,
        credentials: &Credentials,
    ) -> Result<Self, ConfigError> {
        let http = clients::http_client(config.request_timeout()).map_err(ConfigError::HttpClient)?;

        let scrape_backend = FirecrawlBackend::new(
            http.clone(),
            credentials.scraper_api_key.clone(),
            &credentials.scraper_base_url,
        );
        let completion_backend = OpenAiBackend::new(
            http,
            credentials.llm_api_key.clone(),
            &credentials.llm_base_url,
            &credentials.llm_model,
        );
        ::log::info!("Using model {}", completion_backend.model());

        Self::new(config, Arc::new(scrape_backend), Arc::new(completion_backend))
    }

    /// Stage the pipeline is in (or failed in)
    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        ::log::debug!("Pipeline stage {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Run all stages; the first failure aborts the run
    pub async fn run(&mut self, resume: &ResumeText) -> Result<RunReport, PipelineError> {
        self.enter(Stage::Scraping);
        let jobs = self.scrape().await?;

        self.enter(Stage::Recommending);
        let recommendations = self.recommend(resume, &jobs).await?;

        self.enter(Stage::Writing);
        // Console first, so results survive an unwritable output directory
        println!("{}", output::render(&recommendations));
        let output_file = match &self.store {
            Some(store) => {
                let path = store.write_results(self.jobs_url.as_str(), &recommendations)?;
                ::log::info!("Saved recommendations to {}", path.display());
                Some(path)
            }
            None => None,
        };

        self.enter(Stage::Done);
        Ok(RunReport {
            jobs_considered: jobs.len(),
            recommendations,
            output_file,
        })
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>, PipelineError> {
        let cache = self.store.as_ref().filter(|_| self.config.use_cache);

        if let Some(mut jobs) = cache.and_then(|store| store.load_cached_jobs()) {
            jobs.truncate(self.config.max_jobs);
            if jobs.is_empty() {
                return Err(ScrapeError::ZeroMaxJobs.into());
            }
            return Ok(jobs);
        }

        let jobs = self.scraper.scrape(&self.jobs_url).await?;

        if let Some(store) = cache {
            match store.store_jobs(&jobs) {
                Ok(path) => ::log::info!("Cached {} jobs at {}", jobs.len(), path.display()),
                Err(e) => ::log::warn!("Not caching jobs: {}", e),
            }
        }
        Ok(jobs)
    }

    async fn recommend(
        &self,
        resume: &ResumeText,
        jobs: &[JobPosting],
    ) -> Result<Vec<Recommendation>, PipelineError> {
        let recommendations = self
            .recommender
            .recommend(resume, jobs, self.config.num_recommendations)
            .await?;

        ::log::info!("Received {} job recommendations", recommendations.len());
        Ok(recommendations)
    }
}
