//! Maven goal execution.
//!
//! Two modes are needed by the pipeline: blocking goal runs (`clean
//! test-compile`, `install`, `verify`) whose exit status feeds the grade,
//! and asynchronous runs (`spring-boot:run` of a single module) that keep a
//! student server alive while the stage probes it over HTTP. The async mode
//! hands back a [`ServiceHandle`] that must be stopped on every exit path.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

pub const SPRING_BOOT_PLUGIN: &str = "org.springframework.boot:spring-boot-maven-plugin:2.6.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Ok,
    Failed,
}

/// Outcome of a blocking goal run.
#[derive(Debug)]
pub struct GoalResult {
    pub status: GoalStatus,
    /// Tail of the combined output, kept for logs only.
    pub log_tail: String,
}

impl GoalResult {
    pub fn is_ok(&self) -> bool {
        self.status == GoalStatus::Ok
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

/// A student server running as a subprocess.
///
/// Dropping the handle kills the process, but stages call [`stop`] explicitly
/// so they can then wait for the port to be released before returning.
///
/// [`stop`]: ServiceHandle::stop
pub struct ServiceHandle {
    child: Child,
    description: String,
}

impl ServiceHandle {
    pub fn new(child: Child, description: impl Into<String>) -> Self {
        Self {
            child,
            description: description.into(),
        }
    }

    /// Kills the subprocess and reaps it.
    pub async fn stop(mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(service = %self.description, "kill failed: {e}");
            return;
        }
        if let Err(e) = self.child.wait().await {
            warn!(service = %self.description, "wait after kill failed: {e}");
        }
        debug!(service = %self.description, "stopped");
    }
}

/// Build tool invocation boundary, substitutable in tests.
#[async_trait]
pub trait BuildTool: Send + Sync {
    /// Runs goals to completion; a non-zero exit is a `Failed` result, not an error.
    async fn execute_goals(&self, repo: &Path, goals: &[&str]) -> GoalResult;

    /// Starts a long-running goal (a student server) and returns its handle.
    async fn execute_goals_async(
        &self,
        repo: &Path,
        goals: &[&str],
    ) -> Result<ServiceHandle, LaunchError>;
}

/// Invokes the `mvn` binary configured through the environment.
pub struct MavenInvoker {
    binary: PathBuf,
}

impl MavenInvoker {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(util::config::maven_binary()),
        }
    }

    fn command(&self, repo: &Path, goals: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--batch-mode").args(goals).current_dir(repo);
        cmd
    }
}

impl Default for MavenInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildTool for MavenInvoker {
    async fn execute_goals(&self, repo: &Path, goals: &[&str]) -> GoalResult {
        debug!(?goals, "running maven");
        let output = self.command(repo, goals).output().await;
        match output {
            Ok(output) => {
                let status = if output.status.success() {
                    GoalStatus::Ok
                } else {
                    GoalStatus::Failed
                };
                GoalResult {
                    status,
                    log_tail: tail(&output.stdout, 40),
                }
            }
            Err(e) => {
                warn!("maven invocation failed: {e}");
                GoalResult {
                    status: GoalStatus::Failed,
                    log_tail: e.to_string(),
                }
            }
        }
    }

    async fn execute_goals_async(
        &self,
        repo: &Path,
        goals: &[&str],
    ) -> Result<ServiceHandle, LaunchError> {
        debug!(?goals, "starting maven goal in the background");
        let child = self
            .command(repo, goals)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                command: format!("{} {}", self.binary.display(), goals.join(" ")),
                source,
            })?;
        Ok(ServiceHandle::new(child, goals.join(" ")))
    }
}

fn tail(bytes: &[u8], lines: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}
