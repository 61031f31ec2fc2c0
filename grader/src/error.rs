//! Fatal harness errors.
//!
//! Expected grading failures are explanations inside a [`GradePart`]; the
//! variants here are the conditions that legitimately abort a run.
//!
//! [`GradePart`]: crate::report::GradePart

use runner::maven::LaunchError;
use runner::repo::RepoError;

use crate::prediction_server::ServerBindError;

#[derive(Debug, thiserror::Error)]
pub enum GraderError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    MockServer(#[from] ServerBindError),
}
