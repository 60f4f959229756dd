use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pipeline::{ClassList, Classifier, InferenceResult, SeverityTier};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tower_http::cors::CorsLayer;

pub fn router<C: Classifier + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/predict", post(predict::<C>))
        .route("/health", get(health::<C>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    /// Per-class confidence percentages keyed by snake_cased class name,
    /// e.g. "no_finding_confidence".
    pub predictions: BTreeMap<String, f32>,
    pub primary_diagnosis: String,
    pub primary_confidence: f32,
    pub severity: SeverityTier,
    pub heatmap_base64: String,
    pub processing_time_ms: u64,
}

impl PredictResponse {
    fn from_result(result: InferenceResult, classes: &ClassList, processing_time_ms: u64) -> Self {
        let predictions = classes
            .names()
            .iter()
            .enumerate()
            .map(|(i, name)| (confidence_key(name), result.confidences[i]))
            .collect();

        Self {
            success: true,
            predictions,
            primary_diagnosis: result.primary_diagnosis,
            primary_confidence: result.primary_confidence,
            severity: result.severity,
            heatmap_base64: result.heatmap_base64,
            processing_time_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
}

async fn predict<C: Classifier + 'static>(
    State(state): State<AppState<C>>,
    multipart: Multipart,
) -> Response {
    let started = Instant::now();
    state.metrics.requests.add(1, &[]);

    let image_bytes = match read_image_field(multipart).await {
        Ok(bytes) => bytes,
        Err(message) => {
            tracing::warn!(error = %message, "Rejecting malformed upload");
            return failure(&state, message);
        }
    };

    // The pipeline is synchronous and CPU-bound; keep it off the async
    // workers.
    let service = state.service.clone();
    let outcome = tokio::task::spawn_blocking(move || service.analyze(&image_bytes)).await;

    let elapsed = started.elapsed();
    state.metrics.duration.record(elapsed.as_secs_f64(), &[]);

    match outcome {
        Ok(Ok(result)) => {
            let body = PredictResponse::from_result(
                result,
                state.service.classes(),
                elapsed.as_millis() as u64,
            );
            tracing::info!(
                primary = %body.primary_diagnosis,
                confidence = body.primary_confidence,
                severity = body.severity.as_str(),
                elapsed_ms = body.processing_time_ms,
                "Prediction served"
            );
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Prediction failed");
            failure(&state, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Prediction task panicked or was cancelled");
            failure(&state, "internal processing failure".to_string())
        }
    }
}

async fn health<C: Classifier + 'static>(State(state): State<AppState<C>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        model_loaded: state.model_loaded,
    })
}

/// Every stage failure is converted uniformly into the error response shape
/// and a server-error status; nothing is fatal to the process.
fn failure<C: Classifier>(state: &AppState<C>, error: String) -> Response {
    state.metrics.failures.add(1, &[]);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            success: false,
            error,
        }),
    )
        .into_response()
}

async fn read_image_field(mut multipart: Multipart) -> Result<Vec<u8>, String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err("multipart field `image` missing".to_string()),
            Err(e) => return Err(format!("invalid multipart payload: {e}")),
        };

        if field.name() == Some("image") {
            return field
                .bytes()
                .await
                .map(|bytes| bytes.to_vec())
                .map_err(|e| format!("failed to read image field: {e}"));
        }
    }
}

fn confidence_key(class_name: &str) -> String {
    let mut key: String = class_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    key.push_str("_confidence");
    key
}
