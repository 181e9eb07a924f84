//! Shading surface: the device-keyed structure behind the heatmap overlay

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::{DbId, Device, SensorType};
use crate::geometry::Point3;

/// A location that receives sensor values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingPoint {
    pub id: String,
    pub position: Point3,
    pub sensor_types: Vec<SensorType>,
}

/// A shaded object, keyed by the id of the device that drives it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub points: Vec<ShadingPoint>,
}

/// Named collection of shading nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingSurface {
    pub name: String,
    pub nodes: Vec<ShadingNode>,
}

impl ShadingSurface {
    /// One node per device, one point per node
    ///
    /// Devices without a finite position are left out.
    pub fn from_devices(name: impl Into<String>, devices: &[Device]) -> Self {
        let name = name.into();
        let nodes: Vec<ShadingNode> = devices
            .iter()
            .filter_map(|device| {
                let Some(position) = device.finite_position() else {
                    debug!(device = %device.id, surface = %name, "Excluding device without position from shading");
                    return None;
                };
                Some(ShadingNode {
                    id: device.id.0.clone(),
                    db_id: device.db_id,
                    room: device.room.clone(),
                    points: vec![ShadingPoint {
                        id: device.id.0.clone(),
                        position,
                        sensor_types: device.sensor_types.clone(),
                    }],
                })
            })
            .collect();

        Self { name, nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    pub fn points(&self) -> impl Iterator<Item = &ShadingPoint> {
        self.nodes.iter().flat_map(|n| n.points.iter())
    }

    pub fn point_count(&self) -> usize {
        self.nodes.iter().map(|n| n.points.len()).sum()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Every sensor type that appears on at least one point
    pub fn sensor_types(&self) -> Vec<SensorType> {
        let mut types: Vec<SensorType> = self
            .points()
            .flat_map(|p| p.sensor_types.iter().cloned())
            .collect();
        types.sort();
        types.dedup();
        types
    }
}

/// Heatmap rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShadingKind {
    /// Horizontal slice through the shaded object
    #[default]
    PlanarHeatmap,
    /// Shading applied to the object's own geometry
    GeometryHeatmap,
}

/// Options passed to the visualization layer at shading setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingOptions {
    #[serde(default)]
    pub kind: ShadingKind,
    /// Height of the heatmap plane, relative to the object (0 = bottom, 1 = top)
    #[serde(default)]
    pub placement_position: f64,
    #[serde(default = "default_true")]
    pub slicing_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ShadingOptions {
    fn default() -> Self {
        Self {
            kind: ShadingKind::PlanarHeatmap,
            placement_position: 0.0,
            slicing_enabled: true,
        }
    }
}

/// One sensor value pushed to the visualization layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadingSample {
    pub point_id: String,
    pub sensor_type: SensorType,
    pub value: f64,
}
