//! Checked-out exercise introspection.
//!
//! The grader receives a path to an already cloned student repository and
//! needs three facts about it: whether it is under version control at all,
//! which branch is checked out, and the GitHub slug of its `origin` remote
//! (absent for repositories hosted elsewhere).

use std::path::{Path, PathBuf};

use regex::Regex;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("`{}` is not a git repository", .0.display())]
    NotAGitRepository(PathBuf),
    #[error("git invocation failed: {0}")]
    Git(String),
}

/// Handle to the student repository being graded.
#[derive(Debug, Clone)]
pub struct ExerciseRepo {
    pub path: PathBuf,
    pub branch: String,
    /// `owner/repository`, when the `origin` remote points at GitHub.
    pub github_slug: Option<String>,
}

impl ExerciseRepo {
    pub fn is_git_repository(path: &Path) -> bool {
        path.join(".git").exists()
    }

    /// Opens a checked-out repository, resolving branch and GitHub slug.
    pub async fn open(path: &Path) -> Result<Self, RepoError> {
        if !Self::is_git_repository(path) {
            return Err(RepoError::NotAGitRepository(path.to_path_buf()));
        }
        let branch = git(path, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let github_slug = match git(path, &["remote", "get-url", "origin"]).await {
            Ok(url) => parse_github_slug(&url),
            Err(_) => None,
        };
        Ok(Self {
            path: path.to_path_buf(),
            branch,
            github_slug,
        })
    }
}

pub(crate) async fn git(repo: &Path, args: &[&str]) -> Result<String, RepoError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .await
        .map_err(|e| RepoError::Git(e.to_string()))?;
    if !output.status.success() {
        return Err(RepoError::Git(format!(
            "`git {}` exited with {}",
            args.join(" "),
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn parse_github_slug(remote_url: &str) -> Option<String> {
    let re = Regex::new(r"github\.com[:/]([^/]+/[^/\s]+?)(?:\.git)?$").unwrap();
    re.captures(remote_url.trim())
        .map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_parsed_from_ssh_and_https_remotes() {
        assert_eq!(
            parse_github_slug("git@github.com:lernejo/travel_agency.git"),
            Some("lernejo/travel_agency".to_string())
        );
        assert_eq!(
            parse_github_slug("https://github.com/lernejo/travel_agency"),
            Some("lernejo/travel_agency".to_string())
        );
        assert_eq!(parse_github_slug("https://gitlab.com/a/b.git"), None);
    }
}
