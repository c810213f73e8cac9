//! REST API routes for the web server
//!
//! Provides the image processing endpoint and health checks.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::border::{BorderError, BorderProcessor, BorderSpec};
use crate::config::Config;
use crate::convert::{convert_to_png, ConversionError};
use crate::metadata::{ImageMetadata, MetadataStore};

/// Header carrying the serialized sidecar of the returned image
pub const METADATA_HEADER: &str = "x-image-metadata";

/// File name the upload is stored under inside the request workspace
const INPUT_FILE_NAME: &str = "input_image";

/// File name of the processed image inside the request workspace
const OUTPUT_FILE_NAME: &str = "output_image.png";

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub version: String,
    /// Thickness used when the request gives none
    pub default_thickness: i64,
    /// Color used when the request gives none
    pub default_color: String,
    /// Margin = thickness + this, when the request gives no margin
    pub margin_offset: i64,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_thickness: config.border.border_thickness,
            default_color: config.border.border_color.clone(),
            margin_offset: config.server.margin_offset,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Build the API router
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(read_root))
        .route("/health", get(health_check))
        .route("/process-image", post(process_image))
        .route("/process-image/", post(process_image))
}

/// Welcome message
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
}

async fn read_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to the Image Border Processor API".to_string(),
    })
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
    })
}

/// Border parameters, from the query string or multipart text fields
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProcessParams {
    pub margin_size: Option<i64>,
    pub border_thickness: Option<i64>,
    pub border_color: Option<String>,
}

impl ProcessParams {
    /// Apply defaults and validate.
    ///
    /// Without an explicit margin the margin is the thickness plus the
    /// configured offset.
    pub fn resolve(self, state: &AppState) -> Result<BorderSpec, BorderError> {
        let thickness = self.border_thickness.unwrap_or(state.default_thickness);
        let margin = self
            .margin_size
            .unwrap_or_else(|| thickness.saturating_add(state.margin_offset));
        let color = self
            .border_color
            .unwrap_or_else(|| state.default_color.clone());

        BorderSpec::with_color_str(margin, thickness, &color)
    }
}

/// Processed PNG with its metadata
#[derive(Debug)]
pub struct ImageResponse {
    data: Vec<u8>,
    metadata: ImageMetadata,
}

impl IntoResponse for ImageResponse {
    fn into_response(self) -> Response {
        let metadata = match serde_json::to_value(&self.metadata) {
            Ok(value) => ascii_json(&value),
            Err(e) => {
                return AppError::Internal(format!("Error preparing response: {}", e))
                    .into_response()
            }
        };
        let metadata = match HeaderValue::from_str(&metadata) {
            Ok(value) => value,
            Err(e) => {
                return AppError::Internal(format!("Error preparing response: {}", e))
                    .into_response()
            }
        };

        let mut response = (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
                (
                    header::CONTENT_DISPOSITION,
                    HeaderValue::from_static("inline; filename=\"output_image.png\""),
                ),
            ],
            self.data,
        )
            .into_response();
        response.headers_mut().insert(METADATA_HEADER, metadata);
        response
    }
}

/// Upload an image and get it back with a margin and border
async fn process_image(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProcessParams>,
    multipart: Multipart,
) -> Result<ImageResponse, AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("process_image", %request_id);

    async move {
        let (data, params) = read_upload(multipart, params).await?;
        let spec = params.resolve(&state)?;

        tracing::info!(
            bytes = data.len(),
            margin = spec.margin_size(),
            thickness = spec.border_thickness(),
            "processing upload"
        );

        let response = tokio::task::spawn_blocking(move || {
            let workspace = tempfile::tempdir()
                .map_err(|e| AppError::Internal(format!("Failed to create workspace: {}", e)))?;
            process_in_workspace(workspace.path(), &data, &spec)
        })
        .await
        .map_err(|e| AppError::from(BorderError::UnexpectedFailure(e.to_string())))??;

        tracing::info!(
            width = response.metadata.width,
            height = response.metadata.height,
            "upload processed"
        );
        Ok(response)
    }
    .instrument(span)
    .await
}

/// Collect the file and any parameter fields from the multipart body
async fn read_upload(
    mut multipart: Multipart,
    mut params: ProcessParams,
) -> Result<(Vec<u8>, ProcessParams), AppError> {
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
                data = Some(bytes.to_vec());
            }
            "margin_size" => params.margin_size = Some(parse_int_field(&name, field).await?),
            "border_thickness" => {
                params.border_thickness = Some(parse_int_field(&name, field).await?)
            }
            "border_color" => {
                params.border_color = Some(field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read border_color: {}", e))
                })?)
            }
            _ => {}
        }
    }

    match data {
        Some(data) if !data.is_empty() => Ok((data, params)),
        _ => Err(AppError::BadRequest("No file uploaded".to_string())),
    }
}

async fn parse_int_field(
    name: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<i64, AppError> {
    let text = field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
    text.trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("{} must be an integer, got '{}'", name, text)))
}

/// Store, convert and process one upload inside `workspace`
fn process_in_workspace(
    workspace: &Path,
    data: &[u8],
    spec: &BorderSpec,
) -> Result<ImageResponse, AppError> {
    let input = workspace.join(INPUT_FILE_NAME);
    std::fs::write(&input, data)
        .map_err(|e| AppError::Internal(format!("Failed to store upload: {}", e)))?;

    let input = convert_to_png(&input).map_err(|e| match e {
        ConversionError::NotAnImage(_) => AppError::BadRequest(e.to_string()),
        other => AppError::Internal(other.to_string()),
    })?;

    let output = workspace.join(OUTPUT_FILE_NAME);
    BorderProcessor::process(&input, &output, spec)?;

    let metadata = MetadataStore::load(&output)
        .map_err(|e| AppError::Internal(format!("Error preparing response: {}", e)))?;
    let data = std::fs::read(&output)
        .map_err(|e| AppError::Internal(format!("Error preparing response: {}", e)))?;

    Ok(ImageResponse { data, metadata })
}

/// Compact JSON with every non-ASCII character escaped, safe for a header
fn ascii_json(value: &serde_json::Value) -> String {
    let mut out = String::new();
    for c in value.to_string().chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}

/// API error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
}

impl From<BorderError> for AppError {
    fn from(err: BorderError) -> Self {
        match err {
            BorderError::InvalidParameter(_) => AppError::BadRequest(err.to_string()),
            other => {
                tracing::error!(error = %other, "image processing failed");
                AppError::Internal(format!("Error processing image: {}", other))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
