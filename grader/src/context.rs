//! Run-scoped grading state.
//!
//! One [`GradingContext`] lives for one repository run. It owns the
//! generated server ports, the configured start timeout, the API clients
//! pointed at those ports, the collaborator handles, and the sticky failure
//! flags stages use to decide whether to run at all.

use std::sync::Arc;
use std::time::Duration;

use runner::ci::{CiStatusSource, GitHubActions};
use runner::git_history::{CommitInspector, GitLogInspector};
use runner::maven::{BuildTool, MavenInvoker};
use runner::repo::ExerciseRepo;

use crate::clients::{PredictionApiClient, SiteApiClient};
use crate::random::SharedRandom;

/// External collaborators consumed by the stages, substitutable in tests.
#[derive(Clone)]
pub struct Collaborators {
    pub build: Arc<dyn BuildTool>,
    pub ci: Arc<dyn CiStatusSource>,
    pub commits: Arc<dyn CommitInspector>,
}

impl Collaborators {
    pub fn production() -> Self {
        Self {
            build: Arc::new(MavenInvoker::new()),
            ci: Arc::new(GitHubActions::new()),
            commits: Arc::new(GitLogInspector),
        }
    }
}

pub struct GradingContext {
    pub repo: ExerciseRepo,
    pub prediction_server_port: u16,
    pub site_server_port: u16,
    pub server_start_timeout: Duration,
    pub site_client: SiteApiClient,
    pub prediction_client: PredictionApiClient,
    pub collaborators: Collaborators,
    random: SharedRandom,
    compilation_failed: bool,
    test_failed: bool,
    dependent_server_failed: bool,
}

impl GradingContext {
    /// Builds a context with ports drawn from disjoint ranges so concurrent
    /// grading runs do not collide.
    pub fn new(repo: ExerciseRepo, random: SharedRandom, collaborators: Collaborators) -> Self {
        let prediction_server_port = 7000 + random.next_int(600) as u16;
        let site_server_port = 9000 + random.next_int(600) as u16;
        Self::with_ports(
            repo,
            random,
            collaborators,
            prediction_server_port,
            site_server_port,
        )
    }

    pub fn with_ports(
        repo: ExerciseRepo,
        random: SharedRandom,
        collaborators: Collaborators,
        prediction_server_port: u16,
        site_server_port: u16,
    ) -> Self {
        Self {
            repo,
            prediction_server_port,
            site_server_port,
            server_start_timeout: Duration::from_secs(util::config::server_start_timeout()),
            site_client: SiteApiClient::new(site_server_port),
            prediction_client: PredictionApiClient::new(prediction_server_port),
            collaborators,
            random,
            compilation_failed: false,
            test_failed: false,
            dependent_server_failed: false,
        }
    }

    pub fn random(&self) -> SharedRandom {
        self.random.clone()
    }

    pub fn compilation_failed(&self) -> bool {
        self.compilation_failed
    }

    pub fn test_failed(&self) -> bool {
        self.test_failed
    }

    pub fn dependent_server_failed(&self) -> bool {
        self.dependent_server_failed
    }

    /// A compilation failure implies failed tests and failed dependent
    /// servers; the cascade is atomic and never reverts.
    pub fn mark_compilation_failed(&mut self) {
        self.compilation_failed = true;
        self.mark_test_failed();
    }

    pub fn mark_test_failed(&mut self) {
        self.test_failed = true;
        self.mark_dependent_server_failed();
    }

    pub fn mark_dependent_server_failed(&mut self) {
        self.dependent_server_failed = true;
    }
}
