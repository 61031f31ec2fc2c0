//! Commit message hygiene inspection.
//!
//! Flags "meaningless" commits in the student history: one-word messages,
//! fixup/squash leftovers and duplicated subjects that should have been
//! squashed onto their first occurrence.

use async_trait::async_trait;

use crate::repo::{ExerciseRepo, RepoError, git};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeaninglessCommit {
    pub short_id: String,
    pub message: String,
    pub reason: String,
}

#[async_trait]
pub trait CommitInspector: Send + Sync {
    async fn meaningless_commits(
        &self,
        repo: &ExerciseRepo,
    ) -> Result<Vec<MeaninglessCommit>, RepoError>;
}

/// Reads history through `git log` and classifies subjects.
pub struct GitLogInspector;

#[async_trait]
impl CommitInspector for GitLogInspector {
    async fn meaningless_commits(
        &self,
        repo: &ExerciseRepo,
    ) -> Result<Vec<MeaninglessCommit>, RepoError> {
        let raw = git(
            &repo.path,
            &["log", "--no-merges", "--format=%h\u{1f}%s"],
        )
        .await?;
        let mut commits: Vec<(String, String)> = raw
            .lines()
            .filter_map(|l| {
                l.split_once('\u{1f}')
                    .map(|(id, subject)| (id.to_string(), subject.to_string()))
            })
            .collect();
        // git log is newest-first, classification walks history in commit order
        commits.reverse();
        Ok(classify(&commits))
    }
}

fn classify(commits: &[(String, String)]) -> Vec<MeaninglessCommit> {
    let mut seen: Vec<(String, String)> = Vec::new();
    let mut flagged = Vec::new();

    for (short_id, subject) in commits {
        let words = subject.split_whitespace().count();
        if words <= 1 {
            flagged.push(MeaninglessCommit {
                short_id: short_id.clone(),
                message: subject.clone(),
                reason: format!("{words} word is too short"),
            });
        } else if let Some(stripped) = subject
            .strip_prefix("fixup!")
            .or_else(|| subject.strip_prefix("squash!"))
        {
            let target = find_subject(&seen, stripped.trim());
            flagged.push(MeaninglessCommit {
                short_id: short_id.clone(),
                message: subject.clone(),
                reason: format!("Should be squashed on {}", target.unwrap_or("its target")),
            });
        } else if let Some(first) = find_subject(&seen, subject) {
            flagged.push(MeaninglessCommit {
                short_id: short_id.clone(),
                message: subject.clone(),
                reason: format!("Should be squashed on {first}"),
            });
        }
        seen.push((short_id.clone(), subject.clone()));
    }
    flagged
}

fn find_subject<'a>(seen: &'a [(String, String)], subject: &str) -> Option<&'a str> {
    seen.iter()
        .find(|(_, s)| s.eq_ignore_ascii_case(subject))
        .map(|(id, _)| id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: &str, subject: &str) -> (String, String) {
        (id.to_string(), subject.to_string())
    }

    #[test]
    fn one_word_messages_are_flagged() {
        let flagged = classify(&[commit("d360aea", "Fix"), commit("470bae6", "Add travel lookup")]);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].short_id, "d360aea");
        assert_eq!(flagged[0].reason, "1 word is too short");
    }

    #[test]
    fn duplicated_subjects_point_at_their_first_occurrence() {
        let flagged = classify(&[
            commit("470bae6", "Implement inscription"),
            commit("e744312", "Implement inscription"),
        ]);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].short_id, "e744312");
        assert_eq!(flagged[0].reason, "Should be squashed on 470bae6");
    }

    #[test]
    fn fixup_commits_are_flagged() {
        let flagged = classify(&[
            commit("470bae6", "Add prediction client"),
            commit("e744312", "fixup! Add prediction client"),
        ]);
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].reason, "Should be squashed on 470bae6");
    }

    #[test]
    fn clean_history_yields_nothing() {
        let flagged = classify(&[
            commit("a", "Add inscription endpoint"),
            commit("b", "Wire prediction client"),
        ]);
        assert!(flagged.is_empty());
    }
}
