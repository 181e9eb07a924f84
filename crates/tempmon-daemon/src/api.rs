//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tempmon_auth::ExchangeError;
use tempmon_core::{ColorRamps, DeviceSource, SensorType, StyleMap};
use tracing::{debug, warn};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            code: None,
            status: None,
        }
    }

    fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }
}

/// Issue a viewer access token
pub async fn view_token(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(exchange) = &state.exchange else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new("Application credentials are not configured").with_code("CREDENTIALS_MISSING")),
        )
            .into_response();
    };

    match exchange.exchange().await {
        Ok(token) => {
            debug!(expires_in = token.expires_in, "Issued view token");
            Json(token.for_viewer()).into_response()
        }
        Err(ExchangeError::Rejected { status, .. }) => {
            let mut error = ApiError::new("Identity service rejected the credentials")
                .with_code("UPSTREAM_REJECTED");
            error.status = Some(status);
            (StatusCode::BAD_GATEWAY, Json(error)).into_response()
        }
        Err(e) => {
            warn!(error = %e, "View token exchange failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiError::new(e.to_string()).with_code("UPSTREAM_UNAVAILABLE")),
            )
                .into_response()
        }
    }
}

/// Settings the browser client needs to start the viewer
#[derive(Serialize)]
pub struct ViewerConfig {
    urn: Option<String>,
    document_id: Option<String>,
    level: Option<String>,
    selected_level: Option<String>,
    sprite_size: u32,
    refresh_interval_ms: u64,
    active_sensor_type: SensorType,
    extensions: Vec<&'static str>,
    started_at: DateTime<Utc>,
}

pub async fn viewer_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = &state.config;
    let level = match &config.devices {
        DeviceSource::Rooms { level, .. } => Some(level.clone()),
        DeviceSource::Search { .. } => config.heatmap.select_level.clone(),
    };
    let extensions = state.viewer.lock().await.loaded_extensions();

    Json(ViewerConfig {
        urn: config.model.urn.clone(),
        document_id: config.model.document_id(),
        level,
        selected_level: state.model.selected_level(),
        sprite_size: config.viewables.sprite_size,
        refresh_interval_ms: config.heatmap.refresh_interval_ms,
        active_sensor_type: config.heatmap.active_sensor_type.clone(),
        extensions,
        started_at: state.started_at,
    })
}

/// List placed devices
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.devices())
}

/// Get a specific device by ID
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.get_device(&id) {
        Some(device) => Json(device).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Device not found")),
        )
            .into_response(),
    }
}

#[derive(Serialize)]
struct Styles {
    styles: StyleMap,
    color_ramps: ColorRamps,
}

/// Sprite styles and heatmap color ramps
pub async fn list_styles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let settings = state.config.tempmon_settings();
    Json(Styles {
        styles: settings.styles,
        color_ramps: state.scene.color_ramps(),
    })
}

/// Current shading surface and last samples
pub async fn get_shading(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scene.snapshot())
}

/// Pipeline outcome and heatmap phase
pub async fn get_pipeline(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.report())
}
