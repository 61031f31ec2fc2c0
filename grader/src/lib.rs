//! # Travel agency grader
//!
//! Automated grading harness for the `travel_agency` exercise. A run checks
//! out nothing itself: given the path of an already cloned student
//! repository, it sequences heterogeneous checks (build and tests, CI
//! status, coverage, live probing of the two student HTTP services,
//! cross-service data coherence, commit hygiene, coding style) into one
//! deterministic pipeline with failure propagation between stages, and
//! produces an itemized [`report::GradeReport`].

pub mod clients;
pub mod context;
pub mod dataset;
pub mod error;
pub mod json;
pub mod parts;
pub mod prediction_server;
pub mod random;
pub mod report;

use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::clients::WeatherExpectation;
use crate::context::{Collaborators, GradingContext};
use crate::error::GraderError;
use crate::parts::{
    CiPart, CoherencePart, CommitsPart, CompilationPart, CoveragePart, PartGrader,
    PredictionApiPart, SiteApiPart, StylePart,
};
use crate::random::SharedRandom;
use crate::report::{GradePart, GradeReport};

pub struct TravelAgencyGrader;

impl TravelAgencyGrader {
    /// The stage pipeline, in grading order.
    pub fn graders() -> Vec<Box<dyn PartGrader>> {
        vec![
            Box::new(CompilationPart),
            Box::new(CiPart),
            Box::new(CoveragePart),
            Box::new(SiteApiPart),
            Box::new(PredictionApiPart),
            Box::new(CoherencePart::new(WeatherExpectation::Colder)),
            Box::new(CoherencePart::new(WeatherExpectation::Warmer)),
            Box::new(CommitsPart),
            Box::new(StylePart),
        ]
    }

    /// Runs every stage sequentially against one context.
    pub async fn run(&self, context: &mut GradingContext) -> Result<GradeReport, GraderError> {
        let mut parts = Vec::new();
        for grader in Self::graders() {
            let started = Instant::now();
            let part = grader.grade(context).await?;
            debug!(stage = %part.name, elapsed = ?started.elapsed(), "stage graded");
            parts.push(part);
        }
        Ok(GradeReport { parts })
    }

    /// Grades the repository checked out at `path`.
    ///
    /// A directory that is not under version control short-circuits into a
    /// single zero-credit part covering the whole exercise.
    pub async fn grade_repository(
        &self,
        path: &Path,
        random: SharedRandom,
        collaborators: Collaborators,
    ) -> Result<GradeReport, GraderError> {
        if !runner::repo::ExerciseRepo::is_git_repository(path) {
            let max_total: f64 = Self::graders().iter().filter_map(|g| g.max_grade()).sum();
            return Ok(GradeReport {
                parts: vec![GradePart {
                    name: "exercise".to_string(),
                    grade: 0.0,
                    max_grade: Some(max_total),
                    explanations: vec!["Not a Git project".to_string()],
                }],
            });
        }
        let repo = runner::repo::ExerciseRepo::open(path).await?;
        let mut context = GradingContext::new(repo, random, collaborators);
        self.run(&mut context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_pipeline_keeps_its_grading_order() {
        let names: Vec<String> = TravelAgencyGrader::graders()
            .iter()
            .map(|g| g.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "Part 1 - Compilation & Tests",
                "Part 2 - CI",
                "Part 3 - Code Coverage",
                "Part 4 - Site API structure",
                "Part 5 - Prediction API",
                "Part 6 - HTTP client and data coherence (colder)",
                "Part 6 - HTTP client and data coherence (warmer)",
                "Git (proper descriptive messages)",
                "Coding style",
            ]
        );
    }

    #[test]
    fn bounded_stages_sum_to_twenty() {
        let max_total: f64 = TravelAgencyGrader::graders()
            .iter()
            .filter_map(|g| g.max_grade())
            .sum();
        assert_eq!(max_total, 20.0);
    }

    #[tokio::test]
    async fn a_directory_without_git_is_not_graded() {
        let dir = tempfile::tempdir().unwrap();
        let report = TravelAgencyGrader
            .grade_repository(
                dir.path(),
                SharedRandom::entropy(),
                Collaborators::production(),
            )
            .await
            .unwrap();
        assert_eq!(report.parts.len(), 1);
        assert_eq!(report.parts[0].name, "exercise");
        assert_eq!(report.parts[0].grade, 0.0);
        assert_eq!(report.parts[0].explanations, vec!["Not a Git project"]);
    }
}
