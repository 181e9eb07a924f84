//! Capabilities the pipeline consumes from the host viewer
//!
//! Each component receives the capabilities it needs through a
//! [`HostHandle`] at construction. The model capabilities (property database,
//! spatial index, level metadata) are always present once a model is loaded;
//! the visualization layer, level selector and viewport are optional and the
//! pipeline stages that depend on them short-circuit when they are missing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::device::{DbId, SensorType};
use crate::geometry::BoundingBox;
use crate::locator::{PropertyQuery, QueryOutcome};
use crate::shading::{ShadingOptions, ShadingSample, ShadingSurface};
use crate::style::ColorRamp;
use crate::viewable::ViewableData;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("{capability} rejected the request: {reason}")]
    Rejected {
        capability: &'static str,
        reason: String,
    },
    #[error("Capability not loaded: {0}")]
    Unavailable(&'static str),
    #[error("Shading surface has not been set up")]
    ShadingNotReady,
}

impl HostError {
    pub fn rejected(capability: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            capability,
            reason: reason.into(),
        }
    }
}

/// Property database of the loaded model
#[async_trait]
pub trait PropertyDatabase: Send + Sync {
    /// Evaluate a structured query inside the database
    async fn execute(&self, query: &PropertyQuery) -> Result<QueryOutcome, HostError>;
}

/// Bounding-box lookup by object id
#[async_trait]
pub trait SpatialIndex: Send + Sync {
    /// Unknown ids and objects without geometry report [`BoundingBox::EMPTY`]
    async fn node_box(&self, db_id: DbId) -> Result<BoundingBox, HostError>;
}

/// A room on a building level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub name: String,
    pub bounds: BoundingBox,
}

/// Level and room structure of the model
#[async_trait]
pub trait LevelStructure: Send + Sync {
    /// Rooms on the named level; empty when the level does not exist
    async fn rooms_on_level(&self, level: &str) -> Result<Vec<Room>, HostError>;
}

/// Isolates one building level in the view
#[async_trait]
pub trait LevelSelector: Send + Sync {
    /// Returns false when the level is unknown
    async fn select_level(&self, level: &str) -> Result<bool, HostError>;
}

/// Camera control of the host viewer
pub trait Viewport: Send + Sync {
    fn fit_to_view(&self);
}

/// Sprite and heatmap layer of the host viewer
#[async_trait]
pub trait DataVisualization: Send + Sync {
    /// Commit a finished batch of viewables
    async fn add_viewables(&self, data: ViewableData) -> Result<(), HostError>;

    fn remove_all_viewables(&self);

    async fn setup_surface_shading(
        &self,
        surface: &ShadingSurface,
        options: &ShadingOptions,
    ) -> Result<(), HostError>;

    /// Registering a sensor type again replaces its ramp
    fn register_surface_shading_colors(&self, sensor_type: &SensorType, ramp: ColorRamp);

    /// Show the given nodes shaded by one sensor type
    async fn render_surface_shading(
        &self,
        node_ids: &[String],
        sensor_type: &SensorType,
        samples: &[ShadingSample],
    ) -> Result<(), HostError>;

    /// Push fresh values; recoloring is the layer's job
    async fn update_surface_shading(&self, samples: &[ShadingSample]) -> Result<(), HostError>;

    fn remove_surface_shading(&self);
}

/// Explicit handle to the host capabilities
#[derive(Clone)]
pub struct HostHandle {
    pub properties: Arc<dyn PropertyDatabase>,
    pub spatial: Arc<dyn SpatialIndex>,
    pub levels: Arc<dyn LevelStructure>,
    pub visualization: Option<Arc<dyn DataVisualization>>,
    pub level_selector: Option<Arc<dyn LevelSelector>>,
    pub viewport: Option<Arc<dyn Viewport>>,
}

impl HostHandle {
    pub fn new(
        properties: Arc<dyn PropertyDatabase>,
        spatial: Arc<dyn SpatialIndex>,
        levels: Arc<dyn LevelStructure>,
    ) -> Self {
        Self {
            properties,
            spatial,
            levels,
            visualization: None,
            level_selector: None,
            viewport: None,
        }
    }

    /// Use one object for all model capabilities
    pub fn from_model<M>(model: Arc<M>) -> Self
    where
        M: PropertyDatabase + SpatialIndex + LevelStructure + 'static,
    {
        Self::new(model.clone(), model.clone(), model)
    }

    pub fn with_visualization(mut self, visualization: Arc<dyn DataVisualization>) -> Self {
        self.visualization = Some(visualization);
        self
    }

    pub fn with_level_selector(mut self, selector: Arc<dyn LevelSelector>) -> Self {
        self.level_selector = Some(selector);
        self
    }

    pub fn with_viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// The visualization layer, or `Unavailable`
    pub fn visualization(&self) -> Result<Arc<dyn DataVisualization>, HostError> {
        self.visualization
            .clone()
            .ok_or(HostError::Unavailable("data visualization"))
    }
}

impl std::fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandle")
            .field("visualization", &self.visualization.is_some())
            .field("level_selector", &self.level_selector.is_some())
            .field("viewport", &self.viewport.is_some())
            .finish_non_exhaustive()
    }
}
