//! JSON endpoints: `POST /api/plan` and `GET /health`

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::intent::{Intent, detect_intents, effective_intents, extract_place};
use crate::orchestrator::{OrchestrationResult, Orchestrator};

pub mod rate_limit;

pub const MIN_MESSAGE_CHARS: usize = 2;
pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    /// Natural-language message, e.g. "Weather and places in Paris"
    pub message: String,
    /// Explicit blocks to fetch; unknown names are ignored
    #[serde(default)]
    pub intents: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub result: OrchestrationResult,
    pub intents: Vec<Intent>,
}

/// Client error with a `{"detail": ..}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/plan", post(plan))
        .with_state(orchestrator)
}

fn requested_intents(request: &PlanRequest, message: &str) -> BTreeSet<Intent> {
    let wanted = match request.intents.as_deref() {
        Some(names) if !names.is_empty() => names
            .iter()
            .filter_map(|name| name.parse::<Intent>().ok())
            .collect(),
        _ => detect_intents(message),
    };
    effective_intents(&wanted)
}

async fn plan(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Please enter a destination to plan your trip"));
    }
    let length = message.chars().count();
    if !(MIN_MESSAGE_CHARS..=MAX_MESSAGE_CHARS).contains(&length) {
        warn!(length, "Rejected plan message length");
        return Err(ApiError::bad_request(format!(
            "Message must be between {MIN_MESSAGE_CHARS} and {MAX_MESSAGE_CHARS} characters"
        )));
    }

    info!(request = message, "Received planning request");

    let candidate = extract_place(message).unwrap_or_else(|| {
        debug!("Using entire message as place candidate");
        message.to_string()
    });
    let intents = requested_intents(&request, message);

    let result = orchestrator.orchestrate(Some(&candidate), &intents).await;

    info!(
        place = ?result.place,
        have_weather = result.weather.is_some(),
        places_count = result.places.as_ref().map_or(0, Vec::len),
        errors = ?result.errors,
        "Responding planning result"
    );

    Ok(Json(PlanResponse {
        result,
        intents: intents.into_iter().collect(),
    }))
}

pub async fn health() -> Json<Value> {
    let now = chrono::Utc::now().to_rfc3339();
    debug!(time = %now, "Health check ping");
    Json(json!({ "status": "ok", "time": now }))
}
