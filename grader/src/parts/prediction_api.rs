//! Part 5: the prediction API contract.
//!
//! Starts the student's `prediction-engine` alone and checks one sampled
//! country: echoed country, exactly two temperature points, and every
//! point inside the reference boundaries.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use util::ports;

use crate::clients::{ApiResponse, SAMPLE_PREDICTION_PAYLOAD};
use crate::context::GradingContext;
use crate::dataset;
use crate::error::GraderError;
use crate::json::Decoded;
use crate::parts::{
    PartGrader, bad_payload_message, format_double, prediction_run_goals, server_start_failure,
};
use crate::report::GradePart;

const MAX_GRADE: f64 = 2.0;

pub struct PredictionApiPart;

#[async_trait]
impl PartGrader for PredictionApiPart {
    fn name(&self) -> String {
        "Part 5 - Prediction API".to_string()
    }

    fn max_grade(&self) -> Option<f64> {
        Some(MAX_GRADE)
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError> {
        if context.compilation_failed() {
            return Ok(self.result(
                vec![
                    "Not trying to start **prediction-engine** server as compilation failed"
                        .to_string(),
                ],
                0.0,
            ));
        }

        let goals = prediction_run_goals(context.prediction_server_port);
        let goal_refs: Vec<&str> = goals.iter().map(String::as_str).collect();
        let handle = context
            .collaborators
            .build
            .execute_goals_async(&context.repo.path, &goal_refs)
            .await?;

        let part = self.probe(context).await;

        handle.stop().await;
        if let Err(e) =
            ports::wait_for_port_free(context.prediction_server_port, Duration::from_secs(5)).await
        {
            warn!("prediction server teardown: {e}");
        }
        Ok(part)
    }
}

impl PredictionApiPart {
    async fn probe(&self, context: &GradingContext) -> GradePart {
        if ports::wait_for_port(context.prediction_server_port, context.server_start_timeout)
            .await
            .is_err()
        {
            return self.result(vec![server_start_failure(context)], 0.0);
        }

        let boundary = dataset::get_one(&context.random());
        let query = format!("GET `/api/temperature?country={}`", boundary.country);

        let response = match context
            .prediction_client
            .get_temperature(boundary.country)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return self.result(
                    vec![format!("Failed to call **prediction-engine** API: {e}")],
                    0.0,
                );
            }
        };

        match response {
            ApiResponse::Error { status } => self.result(
                vec![format!(
                    "Unsuccessful response of {query}: {}",
                    status.as_u16()
                )],
                0.0,
            ),
            ApiResponse::Success {
                body: Decoded::Fault(fault),
                ..
            } => self.result(
                vec![bad_payload_message(SAMPLE_PREDICTION_PAYLOAD, &fault)],
                MAX_GRADE - MAX_GRADE * 2.0 / 3.0,
            ),
            ApiResponse::Success {
                body: Decoded::Value(prediction),
                ..
            } => {
                let mut grade = MAX_GRADE;
                let mut errors = Vec::new();

                if !boundary.country.eq_ignore_ascii_case(&prediction.country) {
                    grade -= MAX_GRADE / 2.0;
                    errors.push(format!(
                        "{query} should respond with a message containing the same country that was passed in the query, expected `{}` but get `{}`",
                        boundary.country, prediction.country
                    ));
                }
                if prediction.temperatures.len() != 2 {
                    grade -= MAX_GRADE / 2.0;
                    errors.push(format!(
                        "{query} should respond with a message containing temperatures of the last *two* days, but got {} temperature(s)",
                        prediction.temperatures.len()
                    ));
                }
                for point in &prediction.temperatures {
                    if point.temperature < boundary.min || point.temperature > boundary.max {
                        grade -= MAX_GRADE / 2.0;
                        errors.push(format!(
                            "{query} should respond with temperatures generated from the given `countriesTempData.csv` file, however got a temperature of `{}` for **{}** whereas it should be between `{}` and `{}`",
                            format_double(point.temperature),
                            boundary.country,
                            format_double(boundary.min),
                            format_double(boundary.max)
                        ));
                        break;
                    }
                }

                self.result(errors, grade)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Collaborators;
    use crate::random::{SequenceRandom, SharedRandom};
    use runner::repo::ExerciseRepo;
    use std::path::PathBuf;

    #[tokio::test]
    async fn skipped_when_compilation_failed() {
        let mut context = GradingContext::new(
            ExerciseRepo {
                path: PathBuf::from("/tmp/unused"),
                branch: "main".to_string(),
                github_slug: None,
            },
            SharedRandom::new(SequenceRandom::new(vec![])),
            Collaborators::production(),
        );
        context.mark_compilation_failed();

        let part = PredictionApiPart.grade(&mut context).await.unwrap();

        assert_eq!(part.grade, 0.0);
        assert_eq!(
            part.explanations,
            vec!["Not trying to start **prediction-engine** server as compilation failed"]
        );
    }
}
