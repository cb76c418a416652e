//! HTTP handlers: thin plumbing over the image service.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use imagen_gateway::types::models::RawOptions;
use imagen_gateway::{Error, ImageService};

pub fn router(service: Arc<ImageService>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/generate", post(generate))
        .with_state(service)
}

async fn healthz() -> Json<Value> {
    Json(json!({"ok": true}))
}

async fn generate(State(service): State<Arc<ImageService>>, Json(body): Json<Value>) -> Response {
    let Some(object) = body.as_object() else {
        return error_response(StatusCode::BAD_REQUEST, "Invalid JSON payload");
    };
    let prompt = object
        .get("prompt")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let options = request_options(object);

    match service.generate(prompt, &options).await {
        Ok(image) => {
            info!(bytes = image.bytes.len(), "request served");
            let mime = image.mime_type.unwrap_or_else(|| "image/jpeg".to_string());
            ([(header::CONTENT_TYPE, mime)], image.bytes).into_response()
        }
        Err(err) => {
            warn!(error = %err, "generation failed");
            error_response(status_for(&err), &err.to_string())
        }
    }
}

/// Everything except `prompt` is handed to normalization untouched.
fn request_options(body: &Map<String, Value>) -> RawOptions {
    body.iter()
        .filter(|(key, _)| key.as_str() != "prompt")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        Error::Configuration { .. } | Error::InvalidConfig { .. } | Error::Auth { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Error::Upstream { .. }
        | Error::EmptyResponse
        | Error::MissingImageData
        | Error::HttpClient { .. }
        | Error::Serialization { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}
