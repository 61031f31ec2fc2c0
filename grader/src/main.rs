use std::path::Path;
use std::process::ExitCode;

use grader::TravelAgencyGrader;
use grader::context::Collaborators;
use grader::random::SharedRandom;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging(&util::config::log_level());

    let Some(repo_path) = std::env::args().nth(1) else {
        eprintln!("Usage: grader <path-to-checked-out-exercise>");
        return ExitCode::from(2);
    };

    let grader = TravelAgencyGrader;
    match grader
        .grade_repository(
            Path::new(&repo_path),
            SharedRandom::entropy(),
            Collaborators::production(),
        )
        .await
    {
        Ok(report) => {
            println!("{}", report.render());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Grading aborted: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
