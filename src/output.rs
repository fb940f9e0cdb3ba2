use crate::error::OutputError;
use crate::results::{JobPosting, Recommendation};
use crate::utils::sanitize_filename;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Contents of a persisted result file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    pub jobs_url: String,
    pub generated_at_unix: u64,
    pub recommendations: Vec<Recommendation>,
}

/// Renders the ranked list for the console
pub fn render(recommendations: &[Recommendation]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recommended jobs:");

    for rec in recommendations {
        let _ = writeln!(out, "\n{}. {}", rec.rank, rec.job.title);
        if let Some(url) = &rec.job.url {
            let _ = writeln!(out, "   Link: {}", url);
        }
        for (label, key) in [("Location", "location"), ("Compensation", "compensation")] {
            if let Some(value) = rec.job.metadata_text(key) {
                let _ = writeln!(out, "   {}: {}", label, value);
            }
        }
        if let Some(rationale) = &rec.rationale {
            let _ = writeln!(out, "   Why: {}", rationale);
        }
    }

    out
}

/// Files written to the output directory for one jobs URL
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    stem: String,
}

impl ArtifactStore {
    pub fn new(dir: &Path, jobs_url: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            stem: sanitize_filename(jobs_url),
        }
    }

    /// Where the ranked results go
    pub fn results_path(&self) -> PathBuf {
        self.dir.join(format!("recommendations-{}.json", self.stem))
    }

    /// Where extracted postings are cached
    pub fn jobs_cache_path(&self) -> PathBuf {
        self.dir.join(format!("jobs-{}.json", self.stem))
    }

    /// Previously extracted postings, if a readable cache exists
    pub fn load_cached_jobs(&self) -> Option<Vec<JobPosting>> {
        let path = self.jobs_cache_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                ::log::warn!("Ignoring unreadable cache {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Vec<JobPosting>>(&contents) {
            Ok(jobs) if !jobs.is_empty() => {
                ::log::info!("Loaded {} cached jobs from {}", jobs.len(), path.display());
                Some(jobs)
            }
            Ok(_) => None,
            Err(e) => {
                ::log::warn!("Ignoring invalid cache {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Cache extracted postings for later runs
    pub fn store_jobs(&self, jobs: &[JobPosting]) -> Result<PathBuf, OutputError> {
        let path = self.jobs_cache_path();
        write_json(&path, jobs)?;
        Ok(path)
    }

    /// Persist the ranked results
    pub fn write_results(
        &self,
        jobs_url: &str,
        recommendations: &[Recommendation],
    ) -> Result<PathBuf, OutputError> {
        let generated_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let file = ResultFile {
            jobs_url: jobs_url.to_string(),
            generated_at_unix,
            recommendations: recommendations.to_vec(),
        };

        let path = self.results_path();
        write_json(&path, &file)?;
        Ok(path)
    }
}

/// Writes pretty JSON through a temp file so readers never see a partial file
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| OutputError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .and_then(|_| std::fs::rename(&tmp, path))
        .map_err(|source| {
            let _ = std::fs::remove_file(&tmp);
            OutputError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
}
