//! Part 4: structure of the site API.
//!
//! Starts the mock prediction backend and the student's `site` module, then
//! drives the two mandated endpoints: inscription then travels lookup.
//! Violations accumulate instead of short-circuiting, so a student with
//! both endpoints missing sees both diagnostics at once.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use util::ports;

use crate::clients::{ApiResponse, SAMPLE_TRAVELS_PAYLOAD, WeatherExpectation};
use crate::context::GradingContext;
use crate::error::GraderError;
use crate::json::Decoded;
use crate::parts::{
    PartGrader, bad_payload_message, generate_inscription, server_start_failure, site_run_goals,
};
use crate::prediction_server::MockPredictionServer;
use crate::report::GradePart;

const MAX_GRADE: f64 = 4.0;

pub struct SiteApiPart;

#[async_trait]
impl PartGrader for SiteApiPart {
    fn name(&self) -> String {
        "Part 4 - Site API structure".to_string()
    }

    fn max_grade(&self) -> Option<f64> {
        Some(MAX_GRADE)
    }

    async fn grade(&self, context: &mut GradingContext) -> Result<GradePart, GraderError> {
        if context.compilation_failed() {
            return Ok(self.result(
                vec!["Not trying to start **site** server as compilation failed".to_string()],
                0.0,
            ));
        }

        let mock =
            MockPredictionServer::start(context.prediction_server_port, context.random()).await?;
        let goals = site_run_goals(context.site_server_port, context.prediction_server_port);
        let goal_refs: Vec<&str> = goals.iter().map(String::as_str).collect();
        let handle = match context
            .collaborators
            .build
            .execute_goals_async(&context.repo.path, &goal_refs)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                mock.close().await;
                return Err(e.into());
            }
        };

        let part = self.probe(context).await;

        handle.stop().await;
        if let Err(e) =
            ports::wait_for_port_free(context.site_server_port, Duration::from_secs(5)).await
        {
            warn!("site server teardown: {e}");
        }
        mock.close().await;

        if !part.explanations.is_empty() {
            context.mark_dependent_server_failed();
        }
        Ok(part)
    }
}

impl SiteApiPart {
    async fn probe(&self, context: &GradingContext) -> GradePart {
        if ports::wait_for_port(context.site_server_port, context.server_start_timeout)
            .await
            .is_err()
        {
            return self.result(vec![server_start_failure(context)], 0.0);
        }

        let random = context.random();
        let expectation = if random.next_boolean() {
            WeatherExpectation::Warmer
        } else {
            WeatherExpectation::Colder
        };
        let inscription = generate_inscription(&random, expectation);

        let mut grade = MAX_GRADE;
        let mut errors = Vec::new();

        let inscription_query = "POST `/api/inscription`";
        match context.site_client.post_inscription(&inscription).await {
            Ok(status) if status.is_success() => {}
            Ok(status) => {
                grade -= MAX_GRADE / 2.0;
                errors.push(format!(
                    "Unsuccessful response of {inscription_query}: {}",
                    status.as_u16()
                ));
            }
            Err(e) => {
                grade -= MAX_GRADE / 2.0;
                errors.push(format!("Failed to call **site** {inscription_query}: {e}"));
            }
        }

        let travels_query = format!("GET `/api/travels?userName={}`", inscription.user_name);
        match context.site_client.get_travels(&inscription.user_name).await {
            Ok(ApiResponse::Success {
                body: Decoded::Value(_),
                ..
            }) => {}
            Ok(ApiResponse::Success {
                body: Decoded::Fault(fault),
                ..
            }) => {
                grade -= MAX_GRADE * 2.0 / 3.0;
                errors.push(bad_payload_message(SAMPLE_TRAVELS_PAYLOAD, &fault));
            }
            Ok(ApiResponse::Error { status }) => {
                grade -= MAX_GRADE / 2.0;
                errors.push(format!(
                    "Unsuccessful response of {travels_query}: {}",
                    status.as_u16()
                ));
            }
            Err(e) => {
                grade -= MAX_GRADE / 2.0;
                errors.push(format!("Failed to call **site** {travels_query}: {e}"));
            }
        }

        self.result(errors, grade)
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

        let part = SiteApiPart.grade(&mut context).await.unwrap();

        assert_eq!(part.grade, 0.0);
        assert_eq!(
            part.explanations,
            vec!["Not trying to start **site** server as compilation failed"]
        );
    }
}
