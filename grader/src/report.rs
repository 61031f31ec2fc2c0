//! Grade report types.
//!
//! Every stage contributes one [`GradePart`]; the report aggregates them
//! and renders the result for the student.

use serde::Serialize;

/// A named, bounded score contribution with its explanations.
///
/// Stages without an upper bound (penalty-only checks) carry `max_grade:
/// None` and a negative lower bound enforced at construction time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradePart {
    pub name: String,
    pub grade: f64,
    pub max_grade: Option<f64>,
    pub explanations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GradeReport {
    pub parts: Vec<GradePart>,
}

impl GradeReport {
    pub fn total(&self) -> f64 {
        self.parts.iter().map(|p| p.grade).sum()
    }

    pub fn max_total(&self) -> f64 {
        self.parts.iter().filter_map(|p| p.max_grade).sum()
    }

    /// Markdown-ish rendition printed at the end of a run.
    pub fn render(&self) -> String {
        let mut out = format!("# Grade: {} / {}\n", self.total(), self.max_total());
        for part in &self.parts {
            match part.max_grade {
                Some(max) => out.push_str(&format!("\n## {}: {} / {}\n", part.name, part.grade, max)),
                None => out.push_str(&format!("\n## {}: {}\n", part.name, part.grade)),
            }
            for explanation in &part.explanations {
                out.push_str(&format!("  * {explanation}\n"));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(name: &str, grade: f64, max_grade: Option<f64>) -> GradePart {
        GradePart {
            name: name.to_string(),
            grade,
            max_grade,
            explanations: vec![],
        }
    }

    #[test]
    fn totals_ignore_unbounded_parts_for_the_max() {
        let report = GradeReport {
            parts: vec![
                part("a", 4.0, Some(4.0)),
                part("b", 1.0, Some(2.0)),
                part("penalty", -1.0, None),
            ],
        };
        assert_eq!(report.total(), 4.0);
        assert_eq!(report.max_total(), 6.0);
    }

    #[test]
    fn render_lists_explanations() {
        let report = GradeReport {
            parts: vec![GradePart {
                name: "Part 2 - CI".to_string(),
                grade: 0.0,
                max_grade: Some(2.0),
                explanations: vec!["Not a GitHub project".to_string()],
            }],
        };
        let text = report.render();
        assert!(text.contains("## Part 2 - CI: 0 / 2"));
        assert!(text.contains("  * Not a GitHub project"));
    }
}
