//! End-to-end stage scenarios against stub student services.
//!
//! The build tool is scripted: "starting a student server" spawns an inert
//! subprocess while the test itself serves the student endpoints, which
//! lets each scenario pick the exact behavior under grade.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use grader::clients::WeatherExpectation;
use grader::context::{Collaborators, GradingContext};
use grader::parts::{CoherencePart, PartGrader, PredictionApiPart, SiteApiPart};
use grader::random::{SequenceRandom, SharedRandom};
use runner::maven::{BuildTool, GoalResult, GoalStatus, LaunchError, ServiceHandle};
use runner::repo::ExerciseRepo;

struct ScriptedLaunch;

#[async_trait]
impl BuildTool for ScriptedLaunch {
    async fn execute_goals(&self, _repo: &Path, _goals: &[&str]) -> GoalResult {
        GoalResult {
            status: GoalStatus::Ok,
            log_tail: String::new(),
        }
    }

    async fn execute_goals_async(
        &self,
        _repo: &Path,
        goals: &[&str],
    ) -> Result<ServiceHandle, LaunchError> {
        // inert stand-in for the student server process
        let child = tokio::process::Command::new("sleep")
            .arg("3600")
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                command: goals.join(" "),
                source,
            })?;
        Ok(ServiceHandle::new(child, goals.join(" ")))
    }
}

struct StubServer {
    task: JoinHandle<()>,
}

impl StubServer {
    async fn serve(port: u16, app: Router) -> Self {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .expect("stub server port should be free");
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { task }
    }

    fn stop(self) {
        self.task.abort();
    }
}

async fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn test_context(random: SharedRandom, prediction_port: u16, site_port: u16) -> GradingContext {
    let mut context = GradingContext::with_ports(
        ExerciseRepo {
            path: PathBuf::from("/tmp/stub-exercise"),
            branch: "main".to_string(),
            github_slug: None,
        },
        random,
        Collaborators {
            build: Arc::new(ScriptedLaunch),
            ..Collaborators::production()
        },
        prediction_port,
        site_port,
    );
    context.server_start_timeout = Duration::from_secs(3);
    context
}

#[tokio::test]
async fn site_stage_reports_both_missing_endpoints() {
    let prediction_port = free_port().await;
    let site_port = free_port().await;
    // a listening site without any route answers 404 everywhere
    let stub = StubServer::serve(site_port, Router::new()).await;

    let mut context = test_context(SharedRandom::entropy(), prediction_port, site_port);
    let part = SiteApiPart.grade(&mut context).await.unwrap();

    assert_eq!(part.grade, 0.0);
    assert_eq!(part.explanations.len(), 2);
    assert_eq!(
        part.explanations[0],
        "Unsuccessful response of POST `/api/inscription`: 404"
    );
    assert!(
        part.explanations[1].starts_with("Unsuccessful response of GET `/api/travels?userName="),
        "{}",
        part.explanations[1]
    );
    assert!(part.explanations[1].ends_with("`: 404"));
    assert!(context.dependent_server_failed());
    assert!(!context.compilation_failed());

    stub.stop();
}

#[tokio::test]
async fn prediction_stage_flags_an_echoed_country_mismatch() {
    let prediction_port = free_port().await;
    let site_port = free_port().await;
    let app = Router::new().route(
        "/api/temperature",
        get(|| async {
            Json(serde_json::json!({
                "country": "WrongCountry",
                "temperatures": [
                    {"date": "2026-08-05", "temperature": 10.0},
                    {"date": "2026-08-04", "temperature": 12.0}
                ]
            }))
        }),
    );
    let stub = StubServer::serve(prediction_port, app).await;

    // one draw: the sampled dataset country (index 2 -> France)
    let random = SharedRandom::new(SequenceRandom::new(vec![2]));
    let mut context = test_context(random, prediction_port, site_port);
    let part = PredictionApiPart.grade(&mut context).await.unwrap();

    assert_eq!(part.grade, 1.0);
    assert_eq!(
        part.explanations,
        vec![
            "GET `/api/temperature?country=France` should respond with a message containing the same country that was passed in the query, expected `France` but get `WrongCountry`"
        ]
    );

    stub.stop();
}

#[tokio::test]
async fn coherence_stage_diffs_the_returned_country_set() {
    let prediction_port = free_port().await;
    let site_port = free_port().await;

    // the stub site answers the inscription, then calls the mock prediction
    // backend once before returning a single travel destination
    let app = Router::new()
        .route("/api/inscription", post(|| async { StatusCode::OK }))
        .route(
            "/api/travels",
            get(move || async move {
                let _ = reqwest::get(format!(
                    "http://localhost:{prediction_port}/api/temperature?country=Belgium"
                ))
                .await;
                Json(serde_json::json!([
                    {"country": "Belgium", "temperature": 20.0}
                ]))
            }),
        );
    let stub = StubServer::serve(site_port, app).await;

    // 16 uuid bytes, user country (bahrain), distance, home temperature,
    // matching-set size (2), then belgium and brazil
    let script: Vec<u32> = std::iter::repeat_n(0, 16)
        .chain([0, 0, 0, 0, 4, 11])
        .collect();
    let random = SharedRandom::new(SequenceRandom::new(script));
    let mut context = test_context(random, prediction_port, site_port);

    let part = CoherencePart::new(WeatherExpectation::Colder)
        .grade(&mut context)
        .await
        .unwrap();

    assert_eq!(part.grade, 0.0);
    assert_eq!(
        part.explanations,
        vec![
            "Expected the following countries to be returned:\n\t* belgium\n\t* brazil\nBut found :\n\t* belgium"
        ]
    );

    stub.stop();
}

#[tokio::test]
async fn coherence_stage_passes_when_the_sets_match() {
    let prediction_port = free_port().await;
    let site_port = free_port().await;

    let app = Router::new()
        .route("/api/inscription", post(|| async { StatusCode::OK }))
        .route(
            "/api/travels",
            get(move || async move {
                let _ = reqwest::get(format!(
                    "http://localhost:{prediction_port}/api/temperature?country=Belgium"
                ))
                .await;
                Json(serde_json::json!([
                    {"country": "Belgium", "temperature": 7.0},
                    {"country": "Brazil", "temperature": 7.0}
                ]))
            }),
        );
    let stub = StubServer::serve(site_port, app).await;

    let script: Vec<u32> = std::iter::repeat_n(0, 16)
        .chain([0, 0, 0, 0, 4, 11])
        .collect();
    let random = SharedRandom::new(SequenceRandom::new(script));
    let mut context = test_context(random, prediction_port, site_port);

    let part = CoherencePart::new(WeatherExpectation::Colder)
        .grade(&mut context)
        .await
        .unwrap();

    assert!(part.explanations.is_empty(), "{:?}", part.explanations);
    assert_eq!(part.grade, 2.0);

    stub.stop();
}

#[tokio::test]
async fn coherence_stage_skips_after_a_dependent_server_failure() {
    let mut context = test_context(SharedRandom::entropy(), free_port().await, free_port().await);
    context.mark_dependent_server_failed();

    let part = CoherencePart::new(WeatherExpectation::Warmer)
        .grade(&mut context)
        .await
        .unwrap();

    assert_eq!(part.grade, 0.0);
    assert_eq!(part.explanations, vec!["Skipping due to previous errors"]);
}

#[tokio::test]
async fn site_stage_times_out_when_the_server_never_starts() {
    let prediction_port = free_port().await;
    let site_port = free_port().await;

    let mut context = test_context(SharedRandom::entropy(), prediction_port, site_port);
    context.server_start_timeout = Duration::from_millis(400);

    let part = SiteApiPart.grade(&mut context).await.unwrap();

    assert_eq!(part.grade, 0.0);
    assert_eq!(
        part.explanations,
        vec!["Server failed to start within 0 sec."]
    );
    assert!(context.dependent_server_failed());
}
