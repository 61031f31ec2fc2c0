//! Part 6: HTTP client and data coherence.
//!
//! Runs once per weather expectation. The mock prediction backend is wired
//! to an engineered dataset in which a known subset of candidate countries
//! satisfies the inscription by at least `minimum_temperature_distance + 2`
//! degrees; the student's site must return exactly that subset.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, Utc};
use tracing::{info, warn};
use util::ports;

use crate::clients::{
    ApiResponse, Inscription, Prediction, SAMPLE_TRAVELS_PAYLOAD, TempPoint, WeatherExpectation,
};
use crate::context::GradingContext;
use crate::error::GraderError;
use crate::json::Decoded;
use crate::parts::{
    COUNTRIES, PartGrader, bad_payload_message, generate_inscription, server_start_failure,
    site_run_goals,
};
use crate::prediction_server::MockPredictionServer;
use crate::random::SharedRandom;
use crate::report::GradePart;

const MAX_GRADE: f64 = 2.0;

pub struct CoherencePart {
    expectation: WeatherExpectation,
}

impl CoherencePart {
    pub fn new(expectation: WeatherExpectation) -> Self {
        Self { expectation }
    }
}

#[async_trait]
impl PartGrader for CoherencePart {
    fn name(&self) -> String {
        format!(
            "Part 6 - HTTP client and data coherence ({})",
            self.expectation
        )
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
        if context.dependent_server_failed() {
            return Ok(self.result(vec!["Skipping due to previous errors".to_string()], 0.0));
        }

        let random = context.random();
        let inscription = generate_inscription(&random, self.expectation);
        let user_country_temp = (random.next_int(15) + 15) as f64;
        info!(user_name = %inscription.user_name, country = %inscription.user_country, "using inscription");
        let expected_matching = build_matching_countries(&random, &inscription.user_country);
        info!(?expected_matching, "matching countries");

        let prediction_fn =
            engineered_prediction_fn(user_country_temp, expected_matching.clone(), inscription.clone());
        let mock =
            MockPredictionServer::with_prediction_fn(context.prediction_server_port, prediction_fn)
                .await?;
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

        let part = self
            .probe(context, &mock, &inscription, &expected_matching)
            .await;

        handle.stop().await;
        if let Err(e) =
            ports::wait_for_port_free(context.site_server_port, Duration::from_secs(5)).await
        {
            warn!("site server teardown: {e}");
        }
        mock.close().await;
        Ok(part)
    }
}

impl CoherencePart {
    async fn probe(
        &self,
        context: &GradingContext,
        mock: &MockPredictionServer,
        inscription: &Inscription,
        expected_matching: &BTreeSet<String>,
    ) -> GradePart {
        if ports::wait_for_port(context.site_server_port, context.server_start_timeout)
            .await
            .is_err()
        {
            return self.result(vec![server_start_failure(context)], 0.0);
        }

        let inscription_query = "POST `/api/inscription`";
        match context.site_client.post_inscription(inscription).await {
            Ok(status) if status.is_success() => {}
            Ok(status) => {
                return self.result(
                    vec![format!(
                        "Unsuccessful response of {inscription_query}: {}",
                        status.as_u16()
                    )],
                    0.0,
                );
            }
            Err(e) => {
                return self.result(
                    vec![format!("Failed to call **site** {inscription_query}: {e}")],
                    0.0,
                );
            }
        }

        let travels_query = format!("GET `/api/travels?userName={}`", inscription.user_name);
        let travels = match context.site_client.get_travels(&inscription.user_name).await {
            Ok(ApiResponse::Success {
                body: Decoded::Value(travels),
                ..
            }) => travels,
            Ok(ApiResponse::Success {
                body: Decoded::Fault(fault),
                ..
            }) => {
                return self.result(
                    vec![bad_payload_message(SAMPLE_TRAVELS_PAYLOAD, &fault)],
                    0.0,
                );
            }
            Ok(ApiResponse::Error { status }) => {
                return self.result(
                    vec![format!(
                        "Unsuccessful response of {travels_query}: {}",
                        status.as_u16()
                    )],
                    0.0,
                );
            }
            Err(e) => {
                return self.result(
                    vec![format!("Failed to call **site** {travels_query}: {e}")],
                    0.0,
                );
            }
        };

        if mock.exchanges().await.is_empty() {
            return self.result(
                vec!["Expected calls to the prediction-engine API, but none was recorded"
                    .to_string()],
                0.0,
            );
        }

        let actual_matching: BTreeSet<String> = travels
            .iter()
            .map(|t| t.country.to_lowercase())
            .collect();
        if &actual_matching != expected_matching {
            return self.result(
                vec![format!(
                    "Expected the following countries to be returned:\n\t* {}\nBut found :\n\t* {}",
                    join_set(expected_matching),
                    join_set(&actual_matching)
                )],
                0.0,
            );
        }

        self.result(vec![], MAX_GRADE)
    }
}

fn join_set(set: &BTreeSet<String>) -> String {
    set.iter().cloned().collect::<Vec<_>>().join("\n\t* ")
}

/// A random-sized set of candidate countries, excluding the user's own.
fn build_matching_countries(random: &SharedRandom, user_country: &str) -> BTreeSet<String> {
    let target = (random.next_int(4) + 2) as usize;
    let mut matching = BTreeSet::new();
    while matching.len() < target {
        let country =
            COUNTRIES[random.next_int(COUNTRIES.len() as u32 - 1) as usize].to_lowercase();
        if country != user_country {
            matching.insert(country);
        }
    }
    matching
}

/// Prediction function embodying the engineered dataset: matching countries
/// sit `minimum_temperature_distance + 2` degrees away from the user's home
/// temperature in the expected direction, every other country at home level.
fn engineered_prediction_fn(
    user_country_temp: f64,
    matching_countries: BTreeSet<String>,
    inscription: Inscription,
) -> impl Fn(&str) -> Option<Prediction> + Send + Sync + 'static {
    move |country| {
        let lower = country.to_lowercase();
        let temperature = if inscription.user_country == lower
            || !matching_countries.contains(&lower)
        {
            user_country_temp
        } else {
            let distance = inscription.minimum_temperature_distance as f64 + 2.0;
            match inscription.weather_expectation {
                WeatherExpectation::Warmer => user_country_temp + distance,
                WeatherExpectation::Colder => user_country_temp - distance,
            }
        };
        Some(build_prediction(country, temperature))
    }
}

fn build_prediction(country: &str, temperature: f64) -> Prediction {
    let today = Utc::now().date_naive();
    Prediction {
        country: country.to_string(),
        temperatures: vec![
            TempPoint {
                date: today.to_string(),
                temperature: temperature + 1.0,
            },
            TempPoint {
                date: (today - Days::new(1)).to_string(),
                temperature: temperature - 1.0,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::SequenceRandom;

    fn inscription(expectation: WeatherExpectation) -> Inscription {
        Inscription {
            user_email: "u@lernejo.fr".to_string(),
            user_name: "u".to_string(),
            user_country: "bahrain".to_string(),
            weather_expectation: expectation,
            minimum_temperature_distance: 6,
        }
    }

    #[test]
    fn matching_countries_exclude_the_user_country() {
        // draws: size (0 -> 2 countries), then indices 0 (user country,
        // rejected), 4 and 11
        let random = SharedRandom::new(SequenceRandom::new(vec![0, 0, 4, 11]));
        let matching = build_matching_countries(&random, "bahrain");
        assert_eq!(
            matching,
            BTreeSet::from(["belgium".to_string(), "brazil".to_string()])
        );
    }

    #[test]
    fn matching_countries_sit_beyond_the_minimum_distance() {
        let matching = BTreeSet::from(["belgium".to_string()]);
        let predict = engineered_prediction_fn(
            20.0,
            matching,
            inscription(WeatherExpectation::Warmer),
        );

        let prediction = predict("Belgium").unwrap();
        for point in &prediction.temperatures {
            assert!(point.temperature - 20.0 > 6.0);
        }

        let home = predict("Bahrain").unwrap();
        assert_eq!(home.temperatures[0].temperature, 21.0);
        assert_eq!(home.temperatures[1].temperature, 19.0);
    }

    #[test]
    fn colder_expectation_inverts_the_distance() {
        let matching = BTreeSet::from(["estonia".to_string()]);
        let predict = engineered_prediction_fn(
            20.0,
            matching,
            inscription(WeatherExpectation::Colder),
        );
        let prediction = predict("Estonia").unwrap();
        for point in &prediction.temperatures {
            assert!(20.0 - point.temperature > 6.0);
        }
    }

    #[test]
    fn non_matching_countries_stay_at_home_temperature() {
        let matching = BTreeSet::from(["belgium".to_string()]);
        let predict = engineered_prediction_fn(
            20.0,
            matching,
            inscription(WeatherExpectation::Warmer),
        );
        let prediction = predict("Fiji").unwrap();
        assert_eq!(prediction.temperatures[0].temperature, 21.0);
        assert_eq!(prediction.temperatures[1].temperature, 19.0);
    }
}
