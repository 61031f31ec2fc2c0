//! Embedded mock of the prediction backend.
//!
//! Stands in for the real `prediction-engine` while the student's `site` is
//! probed, and doubles as a spy: every exchange is recorded in arrival
//! order so stages can assert that (and how) the student service called it.
//!
//! The server answers one route, `/api/temperature`. Responses come from an
//! injected `country -> Option<Prediction>` function; the default one
//! synthesizes two temperature points (today and yesterday) inside the
//! country's reference boundaries. Request handling is serialized through
//! one lock, matching the single-worker behavior stages rely on.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use chrono::{Days, Utc};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::clients::{Prediction, TempPoint};
use crate::dataset::{self, TempBoundary};
use crate::json;
use crate::random::SharedRandom;

const TEARDOWN_PORT_WAIT: Duration = Duration::from_secs(5);

/// One recorded request/response pair; the response is absent for requests
/// the server rejected (400/404).
#[derive(Debug, Clone, PartialEq)]
pub struct HttpExchange {
    pub request: RecordedRequest,
    pub response: Option<RecordedResponse>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub verb: String,
    /// Full origin-form URL, query included.
    pub url: String,
    /// Header names lower-cased, multi-values joined with commas.
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedResponse {
    pub code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

pub type PredictionFn = dyn Fn(&str) -> Option<Prediction> + Send + Sync;

#[derive(Debug, thiserror::Error)]
#[error("failed to bind mock prediction server on port {port}: {source}")]
pub struct ServerBindError {
    pub port: u16,
    #[source]
    pub source: std::io::Error,
}

struct ServerState {
    prediction: Box<PredictionFn>,
    // one handler at a time; also the exchange log
    exchanges: Mutex<Vec<HttpExchange>>,
}

pub struct MockPredictionServer {
    port: u16,
    state: Arc<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    serve_task: JoinHandle<()>,
}

impl MockPredictionServer {
    /// Starts the server with the default dataset-driven prediction function.
    pub async fn start(port: u16, random: SharedRandom) -> Result<Self, ServerBindError> {
        Self::with_prediction_fn(port, move |country| {
            let boundary = dataset::get_by_country(country)?;
            Some(Prediction {
                country: country.to_string(),
                temperatures: last_two_days(|| draw_temperature(&random, &boundary)),
            })
        })
        .await
    }

    /// Starts the server with an injected prediction function.
    pub async fn with_prediction_fn(
        port: u16,
        prediction: impl Fn(&str) -> Option<Prediction> + Send + Sync + 'static,
    ) -> Result<Self, ServerBindError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerBindError { port, source })?;

        let state = Arc::new(ServerState {
            prediction: Box::new(prediction),
            exchanges: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/api/temperature", any(handle))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serve_task = tokio::spawn(async move {
            let serving = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serving.await {
                warn!("mock prediction server stopped with error: {e}");
            }
        });
        debug!(port, "mock prediction server started");

        Ok(Self {
            port,
            state,
            shutdown: Some(shutdown_tx),
            serve_task,
        })
    }

    pub async fn exchanges(&self) -> Vec<HttpExchange> {
        self.state.exchanges.lock().await.clone()
    }

    /// Stops accepting connections, terminates the serve task and blocks
    /// until the port is observably free, so the next stage can bind it.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if tokio::time::timeout(Duration::from_secs(1), &mut self.serve_task)
            .await
            .is_err()
        {
            self.serve_task.abort();
        }
        if let Err(e) = util::ports::wait_for_port_free(self.port, TEARDOWN_PORT_WAIT).await {
            warn!("mock prediction server teardown: {e}");
        }
        debug!(port = self.port, "mock prediction server closed");
    }
}

async fn handle(
    State(state): State<Arc<ServerState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // taking the log lock for the whole exchange serializes request handling
    let mut exchanges = state.exchanges.lock().await;

    let request = RecordedRequest {
        verb: method.as_str().to_uppercase(),
        url: uri.to_string(),
        headers: lower_cased(&headers),
        body: Some(String::from_utf8_lossy(&body).to_string()),
    };

    if method != Method::GET {
        exchanges.push(HttpExchange {
            request,
            response: None,
        });
        return StatusCode::NOT_FOUND.into_response();
    }

    let query = parse_query(uri.query());
    let Some(country) = query.get("country") else {
        exchanges.push(HttpExchange {
            request,
            response: None,
        });
        return StatusCode::BAD_REQUEST.into_response();
    };

    let prediction = (state.prediction)(country);
    let Some(prediction) = prediction else {
        exchanges.push(HttpExchange {
            request,
            response: None,
        });
        return StatusCode::NOT_FOUND.into_response();
    };

    let raw_body = match json::encode(&prediction) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("mock prediction response could not be encoded: {e}");
            exchanges.push(HttpExchange {
                request,
                response: None,
            });
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    exchanges.push(HttpExchange {
        request: RecordedRequest {
            body: None,
            ..request
        },
        response: Some(RecordedResponse {
            code: 200,
            headers: HashMap::from([(
                "content-type".to_string(),
                "application/json".to_string(),
            )]),
            body: raw_body.clone(),
        }),
    });
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        raw_body,
    )
        .into_response()
}

/// Two points for "today" and "yesterday", drawn through `temp`.
fn last_two_days(mut temp: impl FnMut() -> f64) -> Vec<TempPoint> {
    let today = Utc::now().date_naive();
    let yesterday = today - Days::new(1);
    vec![
        TempPoint {
            date: today.to_string(),
            temperature: temp(),
        },
        TempPoint {
            date: yesterday.to_string(),
            temperature: temp(),
        },
    ]
}

/// Uniform draw in `[min, max]` at 2-decimal resolution.
fn draw_temperature(random: &SharedRandom, boundary: &TempBoundary) -> f64 {
    let span = ((boundary.max.round() - boundary.min.round()) * 100.0) as u32;
    if span == 0 {
        return boundary.min;
    }
    boundary.min + random.next_int(span) as f64 / 100.0
}

fn lower_cased(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let entry = map.entry(name.as_str().to_lowercase()).or_default();
        let value = String::from_utf8_lossy(value.as_bytes()).to_string();
        if entry.is_empty() {
            *entry = value;
        } else {
            entry.push(',');
            entry.push_str(&value);
        }
    }
    map
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    let Some(query) = query else {
        return HashMap::new();
    };
    query
        .split('&')
        .filter_map(|entry| {
            let (key, value) = entry.split_once('=')?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
