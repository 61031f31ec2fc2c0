//! Penalty stage: coding style.
//!
//! Runs the static-analysis rule set over the student sources and lists
//! offending files, least-offending first so the cheapest fixes are read
//! first.

use async_trait::async_trait;
use runner::style::{FileReport, analyze_repository};

use crate::context::GradingContext;
use crate::error::GraderError;
use crate::parts::PartGrader;
use crate::report::GradePart;

const MIN_GRADE: f64 = -4.0;

pub struct StylePart;

#[async_trait]
impl PartGrader for StylePart {
    fn name(&self) -> String {
        "Coding style".to_string()
    }

    fn min_grade(&self) -> f64 {
        MIN_GRADE
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError> {
        let Some(mut reports) = analyze_repository(&context.repo.path) else {
            return Ok(self.result(vec!["No analysis can be performed".to_string()], 0.0));
        };

        reports.sort_by(|a, b| {
            a.violations
                .len()
                .cmp(&b.violations.len())
                .then_with(|| a.name.cmp(&b.name))
        });

        let violations: usize = reports.iter().map(|r| r.violations.len()).sum();
        let mut messages: Vec<String> = reports.iter().map(file_block).collect();
        if messages.is_empty() {
            messages.push("OK".to_string());
        }
        Ok(self.result(messages, violations as f64 * MIN_GRADE / 4.0))
    }
}

fn file_block(report: &FileReport) -> String {
    let bullets: Vec<String> = report
        .violations
        .iter()
        .map(|v| format!("L.{}: {}", v.line, v.message.trim()))
        .collect();
    format!("{}\n            * {}", report.name, bullets.join("\n            * "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Collaborators;
    use crate::random::{SequenceRandom, SharedRandom};
    use runner::repo::ExerciseRepo;
    use std::fs;
    use std::path::Path;

    fn context(root: &Path) -> GradingContext {
        GradingContext::new(
            ExerciseRepo {
                path: root.to_path_buf(),
                branch: "main".to_string(),
                github_slug: None,
            },
            SharedRandom::new(SequenceRandom::new(vec![])),
            Collaborators::production(),
        )
    }

    fn write_source(root: &Path, module: &str, name: &str, content: &str) {
        let dir = root.join(module).join("src/main/java/fr/lernejo");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn no_sources_means_no_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = context(dir.path());
        let part = StylePart.grade(&mut context).await.unwrap();
        assert_eq!(part.grade, 0.0);
        assert_eq!(part.explanations, vec!["No analysis can be performed"]);
    }

    #[tokio::test]
    async fn clean_sources_are_ok_at_zero() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            "site",
            "Clean.java",
            "package fr.lernejo;\n\npublic class Clean {\n    private final int value = 3;\n\n    public int value() {\n        return value;\n    }\n}\n",
        );
        let mut context = context(dir.path());
        let part = StylePart.grade(&mut context).await.unwrap();
        assert_eq!(part.grade, 0.0);
        assert_eq!(part.explanations, vec!["OK"]);
    }

    #[tokio::test]
    async fn each_violation_costs_a_quarter_of_the_floor() {
        let dir = tempfile::tempdir().unwrap();
        write_source(
            dir.path(),
            "site",
            "Pojo.java",
            "package fr.lernejo;\n\npublic class Pojo {\n    private String machin;\n\n    public String machin() {\n        return machin;\n    }\n}\n",
        );
        let mut context = context(dir.path());
        let part = StylePart.grade(&mut context).await.unwrap();
        assert_eq!(part.grade, -1.0);
        assert_eq!(
            part.explanations,
            vec![
                "fr.lernejo.Pojo\n            * L.4: The field `machin` must have modifier `final`"
            ]
        );
    }
}
