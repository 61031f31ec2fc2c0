//! Part 2: the latest completed CI run of the graded branch must be green.

use async_trait::async_trait;
use runner::ci::RunConclusion;

use crate::context::GradingContext;
use crate::error::GraderError;
use crate::parts::PartGrader;
use crate::report::GradePart;

const MAX_GRADE: f64 = 2.0;

pub struct CiPart;

#[async_trait]
impl PartGrader for CiPart {
    fn name(&self) -> String {
        "Part 2 - CI".to_string()
    }

    fn max_grade(&self) -> Option<f64> {
        Some(MAX_GRADE)
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError> {
        let Some(slug) = context.repo.github_slug.clone() else {
            return Ok(self.result(vec!["Not a GitHub project".to_string()], 0.0));
        };
        let branch = context.repo.branch.clone();

        let runs = match context
            .collaborators
            .ci
            .completed_runs(&slug, &branch)
            .await
        {
            Ok(runs) => runs,
            Err(e) => {
                return Ok(self.result(vec![format!("Failed to fetch CI runs: {e}")], 0.0));
            }
        };

        let mut branch_runs = runs.iter().filter(|r| r.head_branch == branch);
        let Some(latest) = branch_runs.next() else {
            return Ok(self.result(
                vec![format!(
                    "No CI runs for branch `{branch}`, check https://github.com/{slug}/actions"
                )],
                0.0,
            ));
        };

        if latest.conclusion != Some(RunConclusion::Success) {
            let conclusion = latest
                .conclusion
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Ok(self.result(
                vec![format!(
                    "Latest CI run of branch `{branch}` was expected to be in *success* state but found: {conclusion}"
                )],
                MAX_GRADE / 2.0,
            ))
        } else {
            Ok(self.result(vec![], MAX_GRADE))
        }
    }
}
