//! Penalty stage: commit message hygiene.

use async_trait::async_trait;

use crate::context::GradingContext;
use crate::error::GraderError;
use crate::parts::PartGrader;
use crate::report::GradePart;

const MIN_GRADE: f64 = -4.0;

pub struct CommitsPart;

#[async_trait]
impl PartGrader for CommitsPart {
    fn name(&self) -> String {
        "Git (proper descriptive messages)".to_string()
    }

    fn min_grade(&self) -> f64 {
        MIN_GRADE
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError> {
        let commits = match context
            .collaborators
            .commits
            .meaningless_commits(&context.repo)
            .await
        {
            Ok(commits) => commits,
            Err(e) => {
                return Ok(self.result(vec![format!("History inspection failed: {e}")], 0.0));
            }
        };

        let mut messages: Vec<String> = commits
            .iter()
            .map(|mc| format!("`{}` {} --> {}", mc.short_id, mc.message, mc.reason))
            .collect();
        if messages.is_empty() {
            messages.push("OK".to_string());
        }
        Ok(self.result(messages, commits.len() as f64 * MIN_GRADE / 8.0))
    }
}
