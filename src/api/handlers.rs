// ============================================================
// API Layer - Handlers
// ============================================================

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::Multipart;
use serde::Serialize;
use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use super::errors::ApiError;
use crate::data::image::ImageLoadError;
use crate::domain::traits::{Recognition, TextRecognizer};

/// Largest accepted upload, 16 MiB
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// The loaded model. Inference needs `&self` only, the mutex
/// serialises requests onto one set of weights.
pub type SharedRecognizer = Arc<Mutex<Box<dyn TextRecognizer + Send>>>;

#[derive(Clone, Default)]
pub struct AppState {
    pub recognizer: Option<SharedRecognizer>,
}

impl AppState {
    pub fn with_recognizer(recognizer: Box<dyn TextRecognizer + Send>) -> Self {
        Self { recognizer: Some(Arc::new(Mutex::new(recognizer))) }
    }

    pub fn without_model() -> Self {
        Self::default()
    }

    pub fn model_loaded(&self) -> bool {
        self.recognizer.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success:    bool,
    pub text:       String,
    pub confidence: f32,
}

impl From<Recognition> for PredictResponse {
    fn from(r: Recognition) -> Self {
        Self { success: true, text: r.text, confidence: r.confidence }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status:       &'static str,
    pub model_loaded: bool,
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse { status: "ok", model_loaded: state.model_loaded() }),
    )
}

/// POST /predict
///
/// # Errors
/// - 400: no `image` field, empty file name, extension not allowed,
///   bytes that do not decode as an image
/// - 413: upload larger than MAX_UPLOAD_BYTES
/// - 503: server started without a model
/// - 500: inference failed
pub async fn predict_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let upload = read_image_field(&mut multipart).await?;

    let recognizer = state.recognizer.clone().ok_or(ApiError::ModelNotLoaded)?;

    // Forward pass is CPU/GPU bound; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || {
        let guard = recognizer
            .lock()
            .map_err(|_| anyhow::anyhow!("recognizer lock poisoned"))?;
        guard.recognize_bytes(&upload)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))?;

    match result {
        Ok(recognition) => {
            tracing::info!("Predicted '{}'", recognition.text);
            Ok(Json(recognition.into()))
        }
        Err(e) => match e.downcast_ref::<ImageLoadError>() {
            Some(load_error) => Err(ApiError::InvalidImage(load_error.to_string())),
            None => Err(ApiError::Internal(format!("{e:#}"))),
        },
    }
}

async fn read_image_field(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Err(ApiError::EmptyFileName);
        }
        if !allowed_file(&file_name) {
            return Err(ApiError::UnsupportedType { allowed: ALLOWED_EXTENSIONS.join(", ") });
        }

        let bytes = field.bytes().await.map_err(upload_error)?;
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ApiError::TooLarge { limit: MAX_UPLOAD_BYTES });
        }
        return Ok(bytes.to_vec());
    }

    Err(ApiError::NoFile)
}

fn upload_error(e: axum_extra::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::TooLarge { limit: MAX_UPLOAD_BYTES }
    } else {
        ApiError::BadUpload(e.body_text())
    }
}

/// Case-insensitive extension check
pub fn allowed_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
