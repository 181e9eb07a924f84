//! Viewer extensions
//!
//! An [`Extension`] is loaded once, receives host events while loaded, and
//! releases everything it created when unloaded. [`TempMonExtension`] runs
//! the temperature monitor pipeline on the first `GeometryLoaded` event:
//!
//! 1. build the device list from the configured source
//! 2. commit one sprite per styled, placed device
//! 3. isolate the configured level
//! 4. set up surface shading and start the periodic refresh
//!
//! Each stage only starts after the previous one has completed. A missing
//! visualization capability or an empty device list ends the run early
//! without touching the host further.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::heatmap::{HeatmapController, HeatmapError, HeatmapPhase, HeatmapSettings};
use crate::host::{HostError, HostHandle, Viewport};
use crate::registry::{DeviceRegistry, DeviceSource};
use crate::shading::ShadingSurface;
use crate::style::{default_color_ramps, default_styles, ColorRamps, StyleMap};
use crate::telemetry::TelemetrySource;
use crate::viewable::{RenderedViewables, ViewableRenderer, ViewableSettings};

/// Events the host viewer delivers to loaded extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Model geometry finished loading
    GeometryLoaded,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Extension is not loaded")]
    NotLoaded,
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Heatmap(#[from] HeatmapError),
}

#[async_trait]
pub trait Extension: Send {
    fn name(&self) -> &'static str;

    /// Returns false if the extension could not be loaded
    fn load(&mut self) -> bool;

    /// Returns false if the extension was not loaded
    fn unload(&mut self) -> bool;

    async fn on_host_event(&mut self, event: &HostEvent) -> Result<(), PipelineError>;
}

/// How far a pipeline run got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// No visualization layer; nothing was rendered
    CapabilityUnavailable,
    /// The device source produced no devices
    NoDevices,
    /// Sprites committed, but no device has a position to shade
    SpritesOnly { devices: usize, sprites: usize },
    /// Heatmap refresh running
    Running {
        devices: usize,
        sprites: usize,
        shaded: usize,
    },
}

/// Published state of the pipeline
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub outcome: Option<PipelineOutcome>,
    pub devices: Vec<Device>,
    pub viewables: RenderedViewables,
    pub heatmap: Option<HeatmapPhase>,
}

/// Settings for the temperature monitor
#[derive(Debug, Clone)]
pub struct TempMonSettings {
    pub devices: DeviceSource,
    pub styles: StyleMap,
    pub color_ramps: ColorRamps,
    pub viewables: ViewableSettings,
    pub heatmap: HeatmapSettings,
}

impl Default for TempMonSettings {
    fn default() -> Self {
        Self {
            devices: DeviceSource::default(),
            styles: StyleMap::from_entries(&default_styles()),
            color_ramps: ColorRamps::from_entries(&default_color_ramps()),
            viewables: ViewableSettings::default(),
            heatmap: HeatmapSettings::default(),
        }
    }
}

impl TempMonSettings {
    fn surface_name(&self) -> String {
        match &self.devices {
            DeviceSource::Rooms { level, .. } => level.clone(),
            DeviceSource::Search { property, .. } => property.clone(),
        }
    }
}

/// Device sprites and heatmap overlay
pub struct TempMonExtension {
    host: HostHandle,
    settings: TempMonSettings,
    telemetry: Arc<dyn TelemetrySource>,
    loaded: bool,
    pipeline_started: bool,
    heatmap: Option<HeatmapController>,
    report: watch::Sender<PipelineReport>,
}

impl TempMonExtension {
    pub fn new(
        host: HostHandle,
        settings: TempMonSettings,
        telemetry: Arc<dyn TelemetrySource>,
    ) -> Self {
        let (report, _) = watch::channel(PipelineReport::default());
        Self {
            host,
            settings,
            telemetry,
            loaded: false,
            pipeline_started: false,
            heatmap: None,
            report,
        }
    }

    /// Follow the pipeline state
    pub fn report(&self) -> watch::Receiver<PipelineReport> {
        self.report.subscribe()
    }

    pub fn heatmap_phase(&self) -> Option<HeatmapPhase> {
        self.heatmap.as_ref().map(|h| h.phase())
    }

    fn publish(&self, f: impl FnOnce(&mut PipelineReport)) {
        self.report.send_modify(f);
    }

    /// Run every stage in order
    pub async fn run_pipeline(&mut self) -> Result<PipelineOutcome, PipelineError> {
        let outcome = self.run_stages().await?;
        let heatmap = self.heatmap_phase();
        self.publish(|r| {
            r.outcome = Some(outcome);
            r.heatmap = heatmap;
        });
        Ok(outcome)
    }

    async fn run_stages(&mut self) -> Result<PipelineOutcome, PipelineError> {
        let visualization = match self.host.visualization() {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Data visualization not available, skipping overlay");
                return Ok(PipelineOutcome::CapabilityUnavailable);
            }
        };

        let devices = DeviceRegistry::new(&self.host)
            .build(&self.settings.devices)
            .await?;
        self.publish(|r| r.devices = devices.clone());
        if devices.is_empty() {
            info!("No devices found, skipping sprites and shading");
            return Ok(PipelineOutcome::NoDevices);
        }

        let rendered = ViewableRenderer::new(visualization.clone())
            .with_start_id(self.settings.viewables.start_id)
            .render(&devices, &self.settings.styles, self.settings.viewables.sprite_size)
            .await?;
        let sprites = rendered.len();
        self.publish(|r| r.viewables = rendered);

        if let Some(level) = &self.settings.heatmap.select_level {
            match &self.host.level_selector {
                Some(selector) => {
                    if !selector.select_level(level).await? {
                        warn!(level = %level, "Level not found in model");
                    }
                }
                None => debug!(level = %level, "No level selector loaded"),
            }
        }

        let surface = ShadingSurface::from_devices(self.settings.surface_name(), &devices);
        if surface.is_empty() {
            info!(devices = devices.len(), "No device has a position, skipping shading");
            return Ok(PipelineOutcome::SpritesOnly {
                devices: devices.len(),
                sprites,
            });
        }
        let shaded = surface.nodes.len();

        let mut heatmap = HeatmapController::new(visualization, self.telemetry.clone());
        heatmap
            .configure(surface, &self.settings.color_ramps, &self.settings.heatmap.shading)
            .await?;
        // Owned from here on so unload can tear down a half-started heatmap
        let heatmap = self.heatmap.insert(heatmap);
        heatmap
            .start(
                &self.settings.heatmap.active_sensor_type,
                self.settings.heatmap.refresh_interval(),
            )
            .await?;

        Ok(PipelineOutcome::Running {
            devices: devices.len(),
            sprites,
            shaded,
        })
    }
}

#[async_trait]
impl Extension for TempMonExtension {
    fn name(&self) -> &'static str {
        "TempMonExtension"
    }

    fn load(&mut self) -> bool {
        self.loaded = true;
        info!(extension = self.name(), "Extension loaded");
        true
    }

    fn unload(&mut self) -> bool {
        if !self.loaded {
            return false;
        }
        if let Some(mut heatmap) = self.heatmap.take() {
            heatmap.unload();
        }
        let had_sprites = !self.report.borrow().viewables.is_empty();
        if had_sprites {
            if let Some(visualization) = &self.host.visualization {
                visualization.remove_all_viewables();
            }
        }
        self.publish(|r| *r = PipelineReport::default());
        // A reload runs the pipeline again on the next geometry load
        self.pipeline_started = false;
        self.loaded = false;
        info!(extension = self.name(), "Extension unloaded");
        true
    }

    async fn on_host_event(&mut self, event: &HostEvent) -> Result<(), PipelineError> {
        if !self.loaded {
            return Err(PipelineError::NotLoaded);
        }
        match event {
            HostEvent::GeometryLoaded => {
                if self.pipeline_started {
                    debug!("Pipeline already ran for this load");
                    return Ok(());
                }
                self.pipeline_started = true;
                let outcome = self.run_pipeline().await?;
                info!(outcome = ?outcome, "Temperature monitor pipeline finished");
                Ok(())
            }
        }
    }
}

/// Frames the model once its geometry has loaded
pub struct FitToViewExtension {
    viewport: Option<Arc<dyn Viewport>>,
    loaded: bool,
}

impl FitToViewExtension {
    pub fn new(host: &HostHandle) -> Self {
        Self {
            viewport: host.viewport.clone(),
            loaded: false,
        }
    }
}

#[async_trait]
impl Extension for FitToViewExtension {
    fn name(&self) -> &'static str {
        "FitToViewExtension"
    }

    fn load(&mut self) -> bool {
        self.loaded = true;
        true
    }

    fn unload(&mut self) -> bool {
        std::mem::replace(&mut self.loaded, false)
    }

    async fn on_host_event(&mut self, event: &HostEvent) -> Result<(), PipelineError> {
        if !self.loaded {
            return Err(PipelineError::NotLoaded);
        }
        match (event, &self.viewport) {
            (HostEvent::GeometryLoaded, Some(viewport)) => viewport.fit_to_view(),
            (HostEvent::GeometryLoaded, None) => debug!("No viewport, not fitting to view"),
        }
        Ok(())
    }
}
