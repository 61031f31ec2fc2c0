//! HTTP clients for the two student services.
//!
//! Thin `reqwest` wrappers over the endpoints the exercise mandates. Both
//! clients decode response bodies leniently: a malformed payload comes back
//! as a [`Decoded::Fault`] so the stage can grade it instead of crashing.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::json::{self, Decoded, EncodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherExpectation {
    Warmer,
    Colder,
}

impl std::fmt::Display for WeatherExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeatherExpectation::Warmer => f.write_str("warmer"),
            WeatherExpectation::Colder => f.write_str("colder"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inscription {
    pub user_email: String,
    pub user_name: String,
    pub user_country: String,
    pub weather_expectation: WeatherExpectation,
    pub minimum_temperature_distance: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Travel {
    pub country: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub country: String,
    pub temperatures: Vec<TempPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempPoint {
    pub date: String,
    pub temperature: f64,
}

/// Shape shown to the student when their travels payload cannot be decoded.
pub const SAMPLE_TRAVELS_PAYLOAD: &str = r#"[
    {
        "country": "a country",
        "temperature": 3.25
    }, {
        "country": "another country",
        "temperature": 7.52
    }
]"#;

/// Shape shown to the student when their prediction payload cannot be decoded.
pub const SAMPLE_PREDICTION_PAYLOAD: &str = r#"{
    "country": "a country",
    "temperatures": [
        {
            "date": "2021-12-16",
            "temperature": 3.25
        }, {
            "date": "2021-12-15",
            "temperature": 7.52
        }
    ]
}"#;

/// Expected failures while calling a student service; graded, never thrown
/// past the stage.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// A student-service response: either a plain error status, or a success
/// whose body went through the lenient decoder.
#[derive(Debug)]
pub enum ApiResponse<T> {
    Error { status: StatusCode },
    Success { status: StatusCode, body: Decoded<T> },
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("default reqwest client")
}

/// Client for the student's `site` service.
pub struct SiteApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl SiteApiClient {
    pub fn new(port: u16) -> Self {
        Self {
            base_url: format!("http://localhost:{port}"),
            http: http_client(),
        }
    }

    pub async fn post_inscription(
        &self,
        inscription: &Inscription,
    ) -> Result<StatusCode, ClientError> {
        let body = json::encode(inscription)?;
        let response = self
            .http
            .post(format!("{}/api/inscription", self.base_url))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Ok(response.status())
    }

    pub async fn get_travels(
        &self,
        user_name: &str,
    ) -> Result<ApiResponse<Vec<Travel>>, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/travels", self.base_url))
            .query(&[("userName", user_name)])
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        into_api_response(response).await
    }
}

/// Client for the student's `prediction-engine` service.
pub struct PredictionApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl PredictionApiClient {
    pub fn new(port: u16) -> Self {
        Self {
            base_url: format!("http://localhost:{port}"),
            http: http_client(),
        }
    }

    pub async fn get_temperature(
        &self,
        country: &str,
    ) -> Result<ApiResponse<Prediction>, ClientError> {
        let response = self
            .http
            .get(format!("{}/api/temperature", self.base_url))
            .query(&[("country", country)])
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        into_api_response(response).await
    }
}

async fn into_api_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Ok(ApiResponse::Error { status });
    }
    let raw_body = response.text().await?;
    Ok(ApiResponse::Success {
        status,
        body: json::decode_lenient(&raw_body),
    })
}
