//! Application state management

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tempmon_auth::CredentialExchange;
use tempmon_core::{
    Device, FitToViewExtension, HostEvent, HostHandle, PipelineReport, RandomTelemetry,
    SceneLayer, SceneUpdate, SnapshotModel, TelemetrySource, TempMonExtension, Viewer,
};
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{info, warn};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Configuration
    pub config: Config,
    /// Loaded model snapshot
    pub model: Arc<SnapshotModel>,
    /// Sprites and shading, mirrored to WebSocket clients
    pub scene: Arc<SceneLayer>,
    /// Extension host
    pub viewer: Mutex<Viewer>,
    /// Latest pipeline state
    pub pipeline: watch::Receiver<PipelineReport>,
    /// Upstream token exchange; `None` without credentials
    pub exchange: Option<CredentialExchange>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let model = SnapshotModel::from_file(&config.model.snapshot)
            .with_context(|| format!("Failed to load model snapshot {}", config.model.snapshot))?;
        Self::with_model(config, model)
    }

    /// Create state around an already loaded model
    pub fn with_model(config: Config, model: SnapshotModel) -> Result<Arc<Self>> {
        let model = Arc::new(model);
        let scene = Arc::new(SceneLayer::new());
        let host = HostHandle::from_model(model.clone())
            .with_visualization(scene.clone())
            .with_level_selector(model.clone())
            .with_viewport(scene.clone());

        let telemetry: Arc<dyn TelemetrySource> = match config.telemetry.seed {
            Some(seed) => Arc::new(RandomTelemetry::seeded(seed)),
            None => Arc::new(RandomTelemetry::new()),
        };
        let tempmon = TempMonExtension::new(host.clone(), config.tempmon_settings(), telemetry);
        let pipeline = tempmon.report();

        let mut viewer = Viewer::new(host.clone());
        viewer.register(Box::new(FitToViewExtension::new(&host)));
        viewer.register(Box::new(tempmon));
        let loaded = viewer.load_extensions();
        info!(extensions = loaded, "Extensions loaded");

        let exchange = match config.auth.credentials() {
            Some(credentials) => Some(
                CredentialExchange::new(credentials)
                    .context("Failed to create token client")?
                    .with_token_url(config.auth.token_url.clone())
                    .with_scope(config.auth.scope.clone()),
            ),
            None => {
                warn!("FORGE_CLIENT_ID / FORGE_CLIENT_SECRET not set, view tokens unavailable");
                None
            }
        };

        Ok(Arc::new(Self {
            config,
            model,
            scene,
            viewer: Mutex::new(viewer),
            pipeline,
            exchange,
            started_at: Utc::now(),
        }))
    }

    /// Deliver the geometry-loaded event; the snapshot is fully loaded at startup
    pub async fn start(&self) {
        let failures = self.viewer.lock().await.dispatch(&HostEvent::GeometryLoaded).await;
        if failures > 0 {
            warn!(failures, "Some extensions failed on geometry load");
        }
    }

    /// Unload all extensions
    pub async fn shutdown(&self) {
        self.viewer.lock().await.shutdown();
    }

    /// Subscribe to scene updates
    pub fn subscribe(&self) -> broadcast::Receiver<SceneUpdate> {
        self.scene.subscribe()
    }

    /// Devices of the last pipeline run
    pub fn devices(&self) -> Vec<Device> {
        self.pipeline.borrow().devices.clone()
    }

    /// Get a specific device
    pub fn get_device(&self, id: &str) -> Option<Device> {
        self.pipeline
            .borrow()
            .devices
            .iter()
            .find(|d| d.id.as_str() == id)
            .cloned()
    }

    pub fn report(&self) -> PipelineReport {
        self.pipeline.borrow().clone()
    }
}
