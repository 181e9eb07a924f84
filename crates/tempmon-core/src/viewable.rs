//! Sprite markers for devices

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::device::{Device, DeviceId};
use crate::geometry::Point3;
use crate::host::{DataVisualization, HostError};
use crate::style::{StyleDefinition, StyleMap};

/// Small integer correlating a sprite with later updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewableId(pub u32);

/// A sprite placed at a device position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteViewable {
    pub id: ViewableId,
    pub device_id: DeviceId,
    pub position: Point3,
    pub style: StyleDefinition,
}

/// Batch of sprites handed to the visualization layer in one commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewableData {
    pub sprite_size: u32,
    viewables: Vec<SpriteViewable>,
    #[serde(skip)]
    finished: bool,
}

impl ViewableData {
    pub fn new(sprite_size: u32) -> Self {
        Self {
            sprite_size,
            viewables: Vec::new(),
            finished: false,
        }
    }

    /// Returns false once the batch has been finished
    pub fn add_viewable(&mut self, viewable: SpriteViewable) -> bool {
        if self.finished {
            return false;
        }
        self.viewables.push(viewable);
        true
    }

    /// Freeze the batch, ordered by viewable id
    pub fn finish(&mut self) {
        self.viewables.sort_by_key(|v| v.id);
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn viewables(&self) -> &[SpriteViewable] {
        &self.viewables
    }

    pub fn len(&self) -> usize {
        self.viewables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.viewables.is_empty()
    }
}

/// Sprite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewableSettings {
    /// Sprite size in pixels
    #[serde(default = "default_sprite_size")]
    pub sprite_size: u32,
    /// First viewable id handed out
    #[serde(default = "default_start_id")]
    pub start_id: u32,
}

fn default_sprite_size() -> u32 {
    16
}

fn default_start_id() -> u32 {
    1
}

impl Default for ViewableSettings {
    fn default() -> Self {
        Self {
            sprite_size: default_sprite_size(),
            start_id: default_start_id(),
        }
    }
}

/// What a render pass committed and what it left out
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedViewables {
    pub placed: BTreeMap<ViewableId, DeviceId>,
    /// Devices whose primary sensor type has no style
    pub unstyled: Vec<DeviceId>,
    /// Devices without a usable position
    pub unplaced: Vec<DeviceId>,
}

impl RenderedViewables {
    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn viewable_for(&self, device: &DeviceId) -> Option<ViewableId> {
        self.placed
            .iter()
            .find_map(|(id, d)| (d == device).then_some(*id))
    }
}

/// Turns a device snapshot into sprites on the visualization layer
#[derive(Clone)]
pub struct ViewableRenderer {
    visualization: Arc<dyn DataVisualization>,
    start_id: u32,
}

impl ViewableRenderer {
    pub fn new(visualization: Arc<dyn DataVisualization>) -> Self {
        Self {
            visualization,
            start_id: default_start_id(),
        }
    }

    pub fn with_start_id(mut self, start_id: u32) -> Self {
        self.start_id = start_id;
        self
    }

    /// Build, finish and commit one sprite per styled, placed device
    pub async fn render(
        &self,
        devices: &[Device],
        styles: &StyleMap,
        sprite_size: u32,
    ) -> Result<RenderedViewables, HostError> {
        let mut data = ViewableData::new(sprite_size);
        let mut rendered = RenderedViewables::default();
        let mut next_id = Some(self.start_id);

        for device in devices {
            let Some(style) = styles.get(device.primary_sensor_type()) else {
                debug!(
                    device = %device.id,
                    sensor_type = %device.primary_sensor_type(),
                    "No style for sensor type, skipping device"
                );
                rendered.unstyled.push(device.id.clone());
                continue;
            };
            let Some(position) = device.finite_position() else {
                debug!(device = %device.id, "Device has no position, skipping sprite");
                rendered.unplaced.push(device.id.clone());
                continue;
            };

            let Some(raw_id) = next_id else {
                return Err(HostError::rejected(
                    "viewable renderer",
                    format!("viewable ids exhausted after {}", u32::MAX),
                ));
            };
            next_id = raw_id.checked_add(1);
            let id = ViewableId(raw_id);
            data.add_viewable(SpriteViewable {
                id,
                device_id: device.id.clone(),
                position,
                style: style.clone(),
            });
            rendered.placed.insert(id, device.id.clone());
        }

        data.finish();
        if data.is_empty() {
            info!("No sprites to commit");
            return Ok(rendered);
        }

        let count = data.len();
        self.visualization.add_viewables(data).await?;
        info!(
            sprites = count,
            unstyled = rendered.unstyled.len(),
            unplaced = rendered.unplaced.len(),
            "Committed device sprites"
        );
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneLayer;
    use crate::style::default_styles;

    fn device(id: &str, position: Option<Point3>, sensor_type: &str) -> Device {
        Device::new(DeviceId::new(id), position, vec![sensor_type.into()]).unwrap()
    }

    #[test]
    fn test_viewable_data_finish() {
        let style = StyleDefinition {
            icon_url: "images/temp.svg".into(),
            color: 0xffffff,
        };
        let mut data = ViewableData::new(16);
        for id in [3, 1, 2] {
            assert!(data.add_viewable(SpriteViewable {
                id: ViewableId(id),
                device_id: DeviceId::new(id.to_string()),
                position: Point3::default(),
                style: style.clone(),
            }));
        }
        data.finish();
        let ids: Vec<u32> = data.viewables().iter().map(|v| v.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(!data.add_viewable(data.viewables()[0].clone()));
    }

    #[tokio::test]
    async fn test_render_includes_placed_excludes_unplaced() {
        let layer = Arc::new(SceneLayer::new());
        let renderer = ViewableRenderer::new(layer.clone());
        let devices = vec![
            device("A", Some(Point3::new(0.0, 0.0, 0.0)), "temperature"),
            device("B", None, "temperature"),
        ];

        let rendered = renderer
            .render(&devices, &StyleMap::from_entries(&default_styles()), 16)
            .await
            .unwrap();

        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered.viewable_for(&DeviceId::new("A")), Some(ViewableId(1)));
        assert_eq!(rendered.unplaced, vec![DeviceId::new("B")]);

        let committed = layer.viewables();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].device_id, DeviceId::new("A"));
    }

    #[tokio::test]
    async fn test_render_fails_when_ids_run_out() {
        let styles = StyleMap::from_entries(&default_styles());
        let placed = |id| device(id, Some(Point3::new(0.0, 0.0, 0.0)), "temperature");

        let layer = Arc::new(SceneLayer::new());
        let rendered = ViewableRenderer::new(layer.clone())
            .with_start_id(u32::MAX)
            .render(&[placed("A")], &styles, 16)
            .await
            .unwrap();
        assert_eq!(rendered.viewable_for(&DeviceId::new("A")), Some(ViewableId(u32::MAX)));

        let layer = Arc::new(SceneLayer::new());
        let err = ViewableRenderer::new(layer.clone())
            .with_start_id(u32::MAX)
            .render(&[placed("A"), placed("B")], &styles, 16)
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Rejected { capability: "viewable renderer", .. }));
        assert!(layer.viewables().is_empty());
    }

    #[tokio::test]
    async fn test_render_skips_unstyled_devices() {
        let layer = Arc::new(SceneLayer::new());
        let renderer = ViewableRenderer::new(layer.clone()).with_start_id(10);
        let devices = vec![
            device("A", Some(Point3::new(1.0, 0.0, 0.0)), "humidity"),
            device("B", Some(Point3::new(2.0, 0.0, 0.0)), "temperature"),
            device("C", Some(Point3::new(3.0, 0.0, 0.0)), "temperature"),
        ];

        let rendered = renderer
            .render(&devices, &StyleMap::from_entries(&default_styles()), 24)
            .await
            .unwrap();

        assert_eq!(rendered.unstyled, vec![DeviceId::new("A")]);
        let ids: Vec<ViewableId> = rendered.placed.keys().copied().collect();
        assert_eq!(ids, vec![ViewableId(10), ViewableId(11)]);
        assert_eq!(layer.viewables().len(), 2);
        assert_eq!(layer.sprite_size(), Some(24));
    }

    #[tokio::test]
    async fn test_render_nothing_commits_nothing() {
        let layer = Arc::new(SceneLayer::new());
        let renderer = ViewableRenderer::new(layer.clone());
        let rendered = renderer
            .render(
                &[device("A", Some(Point3::default()), "co2")],
                &StyleMap::from_entries(&default_styles()),
                16,
            )
            .await
            .unwrap();
        assert!(rendered.is_empty());
        assert!(layer.viewables().is_empty());
        assert_eq!(layer.sprite_size(), None);
    }
}
