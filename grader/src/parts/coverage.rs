//! Part 3: line coverage across all modules.
//!
//! Full credit from a 0.75 merged ratio; below that the grade scales
//! linearly. The message quotes the historical 80% target while the
//! numeric gate stays at 0.75.

use async_trait::async_trait;
use runner::coverage;

use crate::context::GradingContext;
use crate::error::GraderError;
use crate::parts::{PartGrader, format_double};
use crate::report::GradePart;

const MAX_GRADE: f64 = 4.0;
const RATIO_GATE: f64 = 0.75;

pub struct CoveragePart;

#[async_trait]
impl PartGrader for CoveragePart {
    fn name(&self) -> String {
        "Part 3 - Code Coverage".to_string()
    }

    fn max_grade(&self) -> Option<f64> {
        Some(MAX_GRADE)
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError> {
        if context.test_failed() {
            return Ok(self.result(
                vec!["Coverage not available when there is test failures".to_string()],
                0.0,
            ));
        }

        let reports = coverage::collect_reports(&context.repo.path);
        if reports.is_empty() {
            return Ok(self.result(
                vec!["No JaCoCo report produced after `mvn verify`, check tests and plugins"
                    .to_string()],
                0.0,
            ));
        }

        let ratio = coverage::merge(&reports).ratio();
        if ratio < RATIO_GATE {
            let grade = util::maths::round(ratio * MAX_GRADE / RATIO_GATE, 2);
            Ok(self.result(
                vec![format!(
                    "Code coverage: {}%, expected: > 80% with `mvn verify`",
                    format_double(util::maths::round(ratio * 100.0, 2))
                )],
                grade,
            ))
        } else {
            Ok(self.result(vec![], MAX_GRADE))
        }
    }
}
