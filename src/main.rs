use clap::Parser;
use job_shortlist::config::Credentials;
use job_shortlist::error::PipelineError;
use job_shortlist::{Pipeline, ResumeText};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging, `info` unless RUST_LOG says otherwise
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments; bad flags are fatal like any other error
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = args::parse_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let code = match run(args).await {
        Ok(()) => 0,
        Err(e) => {
            match e.stage() {
                Some(stage) => ::log::error!("Run failed during {}: {}", stage, e),
                None => ::log::error!("Run {}", e),
            }
            eprintln!("error: {}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(args: Args) -> Result<(), PipelineError> {
    let config = args.into_config()?;
    config.validate()?;

    // Credentials and résumé are checked before any network call
    let credentials = Credentials::from_env()?;
    let resume = ResumeText::load(&config.resume_path)?;

    ::log::info!("Starting job search on {}", config.jobs_url);
    let start_time = std::time::Instant::now();
    let mut pipeline = Pipeline::from_credentials(config, &credentials)?;

    tokio::select! {
        result = pipeline.run(&resume) => {
            let report = result?;
            ::log::info!(
                "Ranked {} of {} jobs in {:.2} seconds",
                report.recommendations.len(),
                report.jobs_considered,
                start_time.elapsed().as_secs_f64()
            );
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            ::log::warn!("Interrupted, discarding partial results");
            Err(PipelineError::Interrupted)
        }
    }
}
