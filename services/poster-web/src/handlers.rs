//! HTTP handlers.
//!
//! JSON bodies follow the browser client: every response carries a
//! `success` flag, failures add `error`.

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use poster_common::request::clamp_dimension;
use poster_common::{
    LatLon, OutputFormat, PaperFormat, PaperOrientation, PosterError, PosterRequest, PosterResult,
    ThemeCatalog,
};
use renderer::{BatchJob, BatchRunner, JobOutcome};

use crate::state::AppState;

/// Language of reverse-geocoded place names.
const GEOCODE_LANGUAGE: &str = "fr";

// ============================================================================
// Errors
// ============================================================================

/// Error body `{success: false, error, trace}`.
pub struct ApiError {
    status: StatusCode,
    error: PosterError,
}

impl ApiError {
    pub fn new(status: StatusCode, error: PosterError) -> Self {
        Self { status, error }
    }

    fn internal(error: PosterError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": self.error.to_string(),
            "trace": format!("{:?}", self.error),
        });
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// Catalog endpoints
// ============================================================================

/// GET /api/themes
pub async fn themes_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match state.themes.summaries() {
        Ok(themes) => Json(json!({ "success": true, "themes": themes })).into_response(),
        Err(e) => ApiError::internal(e).into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct FormatInfo {
    pub id: PaperFormat,
    pub name: &'static str,
    pub width: f64,
    pub height: f64,
}

/// GET /api/formats
pub async fn formats_handler() -> Json<serde_json::Value> {
    let formats: Vec<FormatInfo> = PaperFormat::all()
        .iter()
        .map(|f| {
            let (width, height) = f.inches();
            FormatInfo {
                id: *f,
                name: f.label(),
                width,
                height,
            }
        })
        .collect();
    Json(json!({ "success": true, "formats": formats }))
}

// ============================================================================
// Geocoding
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GeocodeBody {
    pub lat: f64,
    pub lng: f64,
}

/// POST /api/geocode
#[instrument(skip(state))]
pub async fn geocode_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<GeocodeBody>,
) -> Response {
    let center = match LatLon::validated(body.lat, body.lng) {
        Ok(point) => point,
        Err(e) => return ApiError::new(StatusCode::BAD_REQUEST, e).into_response(),
    };

    match state.compositor.geocoder().reverse(center, GEOCODE_LANGUAGE).await {
        Ok(place) => Json(json!({
            "success": true,
            "city": place.city,
            "country": place.country,
            "full_address": place.full_address,
        }))
        .into_response(),
        Err(PosterError::LocationNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Location not found" })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Reverse geocoding failed");
            ApiError::new(StatusCode::BAD_REQUEST, e).into_response()
        }
    }
}

// ============================================================================
// Generation
// ============================================================================

fn default_themes() -> Vec<String> {
    vec!["terracotta".to_string()]
}

fn default_distance() -> f64 {
    12_000.0
}

fn default_preset() -> String {
    "A3".to_string()
}

fn default_orientation() -> String {
    "portrait".to_string()
}

fn default_output_format() -> String {
    "pdf".to_string()
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub city: String,
    pub country: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[serde(default = "default_themes")]
    pub themes: Vec<String>,
    #[serde(default = "default_distance")]
    pub distance: f64,
    #[serde(default = "default_preset")]
    pub format_preset: String,
    #[serde(default = "default_orientation")]
    pub orientation: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    pub custom_width: Option<f64>,
    pub custom_height: Option<f64>,
    pub country_label: Option<String>,
    pub display_city: Option<String>,
    pub display_country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GeneratedFile {
    pub theme: String,
    pub filename: String,
}

impl GenerateBody {
    /// Request without a center or output path; the runner names the file.
    fn to_request(&self, center: LatLon) -> PosterResult<PosterRequest> {
        let preset: PaperFormat = self.format_preset.parse()?;
        let orientation: PaperOrientation = self.orientation.parse()?;
        let (mut width, mut height) = preset.dimensions(orientation);
        if let Some(w) = self.custom_width {
            width = clamp_dimension(w).0;
        }
        if let Some(h) = self.custom_height {
            height = clamp_dimension(h).0;
        }

        let mut request = PosterRequest::new(&self.city, &self.country, center);
        request.distance_m = self.distance;
        request.width_in = width;
        request.height_in = height;
        request.format = self.output_format.parse::<OutputFormat>()?;
        request.country_label = self.country_label.clone();
        request.display_city = self.display_city.clone();
        request.display_country = self.display_country.clone();
        request.validate()?;
        Ok(request)
    }

    fn coordinates(&self) -> PosterResult<Option<LatLon>> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => LatLon::validated(lat, lng).map(Some),
            _ => Ok(None),
        }
    }
}

/// POST /api/generate
///
/// Renders each requested theme in order. A cancel request stops the themes
/// not yet started; the files already written are still reported.
#[instrument(skip(state, body), fields(city = %body.city))]
pub async fn generate_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.cancel.reset();

    if let Some(bad) = body.themes.iter().find(|id| !ThemeCatalog::is_valid_id(id)) {
        warn!(theme = %bad, "Rejected theme identifier");
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            PosterError::invalid("themes", format!("'{}' is not a theme name", bad)),
        ));
    }

    let coordinates = body.coordinates().map_err(ApiError::internal)?;
    let center = state
        .compositor
        .resolve_center(&body.city, &body.country, coordinates)
        .await
        .map_err(ApiError::internal)?;
    let request = body.to_request(center).map_err(ApiError::internal)?;

    let mut jobs = Vec::with_capacity(body.themes.len());
    for id in &body.themes {
        let theme = state.themes.load_or_default(id).map_err(ApiError::internal)?;
        jobs.push(BatchJob::new(request.clone(), id.clone(), theme));
    }

    info!(themes = jobs.len(), format = %request.format, "Generating posters");
    let runner = BatchRunner::new(Arc::clone(&state.compositor), &state.settings.posters_dir, 1)
        .with_cancel(state.cancel.clone());
    let outcomes = runner.run(jobs).await;

    let mut files = Vec::new();
    let mut cancelled = false;
    for outcome in outcomes {
        match outcome {
            JobOutcome::Completed { theme, path, .. } => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                files.push(GeneratedFile { theme, filename });
            }
            JobOutcome::Failed { theme, error } => {
                error!(theme = %theme, error = %error, "Generation failed");
                return Err(ApiError::internal(error));
            }
            JobOutcome::Skipped { .. } => cancelled = true,
        }
    }

    Ok(Json(json!({
        "success": true,
        "files": files,
        "cancelled": cancelled,
        "message": format!("{} poster(s) generated", files.len()),
    })))
}

/// POST /api/cancel
pub async fn cancel_handler(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    state.cancel.cancel();
    info!("Cancellation requested");
    Json(json!({ "success": true }))
}

// ============================================================================
// Downloads
// ============================================================================

/// A bare file name: no separators, no parent references.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
}

/// GET /api/download/:filename
pub async fn download_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Response {
    if !is_safe_filename(&filename) {
        warn!(filename = %filename, "Rejected download path");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Invalid file name" })),
        )
            .into_response();
    }

    let path = state.settings.posters_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "success": false, "error": "File not found" })),
            )
                .into_response()
        }
    };

    let content_type = OutputFormat::from_path(&path)
        .map(|f| f.mime_type())
        .unwrap_or("application/octet-stream");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

// ============================================================================
// Health and metrics
// ============================================================================

/// GET /health
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}
