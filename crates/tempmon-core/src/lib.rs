//! Tempmon Core - Device placement, sprites and heatmap refresh
//!
//! This crate provides the pipeline that overlays temperature sensors on a
//! building model:
//! - Property search and object positioning through host capability traits
//! - Device registry built from rooms or property search results
//! - Sprite rendering and the periodic heatmap controller
//! - Extension interface and the in-process model and scene host

pub mod coords;
pub mod device;
pub mod extension;
pub mod geometry;
pub mod heatmap;
pub mod host;
pub mod locator;
pub mod model;
pub mod registry;
pub mod scene;
pub mod shading;
pub mod style;
pub mod telemetry;
pub mod viewable;
pub mod viewer;

pub use coords::CoordinateResolver;
pub use device::{DbId, Device, DeviceError, DeviceId, SensorType};
pub use extension::{
    Extension, FitToViewExtension, HostEvent, PipelineError, PipelineOutcome, PipelineReport,
    TempMonExtension, TempMonSettings,
};
pub use geometry::{BoundingBox, Point3};
pub use heatmap::{HeatmapController, HeatmapError, HeatmapPhase, HeatmapSettings, TickOutcome, TickStats};
pub use host::{
    DataVisualization, HostError, HostHandle, LevelSelector, LevelStructure, PropertyDatabase,
    Room, SpatialIndex, Viewport,
};
pub use locator::{PropertyLocator, PropertyQuery, QueryOutcome};
pub use model::{ModelError, ModelSnapshot, SnapshotModel};
pub use registry::{DeviceRegistry, DeviceSource};
pub use scene::{SceneEvent, SceneLayer, SceneSnapshot, SceneUpdate, ShadedSample};
pub use shading::{ShadingKind, ShadingOptions, ShadingSample, ShadingSurface};
pub use style::{ColorRamp, ColorRampEntry, ColorRamps, StyleDefinition, StyleEntry, StyleMap};
pub use telemetry::{ConstantTelemetry, RandomTelemetry, TelemetrySource};
pub use viewable::{RenderedViewables, ViewableData, ViewableRenderer, ViewableSettings};
pub use viewer::Viewer;
