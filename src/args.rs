use clap::Parser;
use clap::error::{Error as ClapError, ErrorKind};
use job_shortlist::config::RunConfig;
use job_shortlist::error::ConfigError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "job-shortlist")]
#[command(about = "Scrapes a job board and ranks its postings against your résumé")]
#[command(version)]
pub struct Args {
    /// URL of the jobs page to scrape
    #[arg(short = 'u', long)]
    pub jobs_url: Option<String>,

    /// Path to your résumé file [default: resume.txt]
    #[arg(short, long)]
    pub resume_path: Option<PathBuf>,

    /// Maximum number of jobs to scrape [default: 10]
    #[arg(short, long)]
    pub max_jobs: Option<usize>,

    /// Number of job recommendations to return [default: 5]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub num_recommendations: Option<u64>,

    /// Directory to save the results to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum API requests per window [default: 10]
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit: Option<u32>,

    /// Rate limit window in seconds [default: 60]
    #[arg(short, long = "window-size", value_parser = clap::value_parser!(u64).range(1..))]
    pub window_size: Option<u64>,

    /// Maximum concurrent posting extractions [default: 5]
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,

    /// Timeout for a single API request in seconds [default: 120]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout: Option<u64>,

    /// Upper bound on waiting for one service response in seconds [default: 600]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub response_timeout: Option<u64>,

    /// Reuse extracted postings cached in the output directory
    #[arg(long)]
    pub use_cache: bool,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Args {
    /// Build the run configuration: file values first, then flags on top
    pub fn into_config(self) -> Result<RunConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                ::log::info!("Loading configuration from {}", path.display());
                RunConfig::from_file(path)?
            }
            None => RunConfig::default(),
        };

        if let Some(url) = self.jobs_url {
            config.jobs_url = url;
        }
        if let Some(path) = self.resume_path {
            config.resume_path = path;
        }
        if let Some(max_jobs) = self.max_jobs {
            config.max_jobs = max_jobs;
        }
        if let Some(n) = self.num_recommendations {
            config.num_recommendations = n as usize;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = Some(dir);
        }
        if let Some(limit) = self.rate_limit {
            config.rate_limit = limit;
        }
        if let Some(window) = self.window_size {
            config.window_size_secs = window;
        }
        if let Some(concurrency) = self.concurrency {
            config.max_concurrency = concurrency as usize;
        }
        if let Some(timeout) = self.request_timeout {
            config.request_timeout_secs = timeout;
        }
        if let Some(timeout) = self.response_timeout {
            config.response_timeout_secs = timeout;
        }
        if self.use_cache {
            config.use_cache = true;
        }

        Ok(config)
    }
}

/// Exit status for a failed parse: 0 for help and version output, 1 otherwise
pub fn parse_exit_code(err: &ClapError) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp
        | ErrorKind::DisplayVersion
        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_short_flags() {
        let args = Args::try_parse_from([
            "job-shortlist",
            "-u",
            "https://example.com/jobs",
            "-r",
            "cv.txt",
            "-m",
            "20",
            "-n",
            "3",
            "-o",
            "out",
            "-l",
            "5",
            "-w",
            "30",
        ])
        .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.jobs_url, "https://example.com/jobs");
        assert_eq!(config.resume_path, PathBuf::from("cv.txt"));
        assert_eq!(config.max_jobs, 20);
        assert_eq!(config.num_recommendations, 3);
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.rate_limit, 5);
        assert_eq!(config.window_size_secs, 30);
    }

    #[test]
    fn test_defaults() {
        let config = Args::try_parse_from(["job-shortlist", "--jobs-url", "https://example.com"])
            .unwrap()
            .into_config()
            .unwrap();

        assert_eq!(config.resume_path, PathBuf::from("resume.txt"));
        assert_eq!(config.max_jobs, 10);
        assert_eq!(config.num_recommendations, 5);
        assert_eq!(config.rate_limit, 10);
        assert_eq!(config.window_size_secs, 60);
        assert!(config.output_dir.is_none());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        assert!(Args::try_parse_from(["job-shortlist", "-u", "https://example.com", "-l", "0"]).is_err());
        assert!(Args::try_parse_from(["job-shortlist", "-u", "https://example.com", "-w", "0"]).is_err());
    }

    #[test]
    fn test_parse_failures_exit_with_one() {
        let exit_code = |argv: &[&str]| parse_exit_code(&Args::try_parse_from(argv).unwrap_err());

        assert_eq!(exit_code(&["job-shortlist", "-u", "https://example.com", "-l", "0"]), 1);
        assert_eq!(exit_code(&["job-shortlist", "-m", "abc"]), 1);
        assert_eq!(exit_code(&["job-shortlist", "--no-such-flag"]), 1);
        assert_eq!(exit_code(&["job-shortlist", "--help"]), 0);
        assert_eq!(exit_code(&["job-shortlist", "--version"]), 0);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"jobs_url": "https://example.com/jobs", "max_jobs": 4, "rate_limit": 3}}"#
        )
        .unwrap();

        let args = Args::try_parse_from([
            "job-shortlist",
            "--config",
            file.path().to_str().unwrap(),
            "--max-jobs",
            "8",
        ])
        .unwrap();
        let config = args.into_config().unwrap();

        assert_eq!(config.jobs_url, "https://example.com/jobs");
        assert_eq!(config.max_jobs, 8);
        assert_eq!(config.rate_limit, 3);
    }
}
