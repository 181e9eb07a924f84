//! In-process visualization layer
//!
//! [`SceneLayer`] keeps the sprites and shading state the pipeline commits
//! and broadcasts every change as a [`SceneEvent`], so a browser client can
//! mirror the scene over a WebSocket.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, trace};

use async_trait::async_trait;

use crate::device::SensorType;
use crate::host::{DataVisualization, HostError, Viewport};
use crate::shading::{ShadingOptions, ShadingSample, ShadingSurface};
use crate::style::{ColorRamp, ColorRamps};
use crate::viewable::{SpriteViewable, ViewableData};

/// A sample with the color its ramp assigns to it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShadedSample {
    pub point_id: String,
    pub sensor_type: SensorType,
    pub value: f64,
    pub color: u32,
}

/// Scene change notification
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneEvent {
    ViewablesAdded {
        sprite_size: u32,
        viewables: Vec<SpriteViewable>,
    },
    ViewablesRemoved,
    ShadingReady {
        surface: ShadingSurface,
        options: ShadingOptions,
    },
    ColorsRegistered {
        sensor_type: SensorType,
        ramp: ColorRamp,
    },
    ShadingRendered {
        sensor_type: SensorType,
        node_ids: Vec<String>,
        samples: Vec<ShadedSample>,
    },
    ShadingUpdated {
        samples: Vec<ShadedSample>,
    },
    ShadingRemoved,
    FitToView,
}

/// Timestamped scene event as broadcast to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct SceneUpdate {
    pub at: DateTime<Utc>,
    pub event: SceneEvent,
}

/// Current scene contents
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneSnapshot {
    pub sprite_size: Option<u32>,
    pub viewables: Vec<SpriteViewable>,
    pub surface: Option<ShadingSurface>,
    pub options: Option<ShadingOptions>,
    pub ramps: ColorRamps,
    pub active_sensor_type: Option<SensorType>,
    pub visible_nodes: Vec<String>,
    pub samples: Vec<ShadedSample>,
    pub last_update: Option<DateTime<Utc>>,
}

pub struct SceneLayer {
    state: RwLock<SceneSnapshot>,
    events: broadcast::Sender<SceneUpdate>,
}

impl SceneLayer {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(100);
        Self {
            state: RwLock::new(SceneSnapshot::default()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SceneUpdate> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        self.read().clone()
    }

    pub fn viewables(&self) -> Vec<SpriteViewable> {
        self.read().viewables.clone()
    }

    pub fn sprite_size(&self) -> Option<u32> {
        self.read().sprite_size
    }

    pub fn surface(&self) -> Option<ShadingSurface> {
        self.read().surface.clone()
    }

    pub fn color_ramps(&self) -> ColorRamps {
        self.read().ramps.clone()
    }

    /// Samples from the most recent render or update
    pub fn shaded_samples(&self) -> Vec<ShadedSample> {
        self.read().samples.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, SceneSnapshot> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SceneSnapshot> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SceneEvent) {
        let update = SceneUpdate {
            at: Utc::now(),
            event,
        };
        // No subscribers is fine
        let _ = self.events.send(update);
    }
}

impl Default for SceneLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Color the samples that belong to a point of `surface` and have a ramp
fn shade(surface: &ShadingSurface, ramps: &ColorRamps, samples: &[ShadingSample]) -> Vec<ShadedSample> {
    samples
        .iter()
        .filter(|s| surface.points().any(|p| p.id == s.point_id))
        .filter_map(|s| {
            let Some(ramp) = ramps.get(&s.sensor_type) else {
                trace!(sensor_type = %s.sensor_type, "No color ramp registered");
                return None;
            };
            Some(ShadedSample {
                point_id: s.point_id.clone(),
                sensor_type: s.sensor_type.clone(),
                value: s.value,
                color: ramp.sample(s.value),
            })
        })
        .collect()
}

#[async_trait]
impl DataVisualization for SceneLayer {
    async fn add_viewables(&self, data: ViewableData) -> Result<(), HostError> {
        if !data.is_finished() {
            return Err(HostError::rejected(
                "data visualization",
                "viewable batch was not finished",
            ));
        }
        let viewables = data.viewables().to_vec();
        {
            let mut state = self.write();
            state.sprite_size = Some(data.sprite_size);
            state.viewables.extend(viewables.iter().cloned());
        }
        debug!(sprites = viewables.len(), "Viewables added to scene");
        self.emit(SceneEvent::ViewablesAdded {
            sprite_size: data.sprite_size,
            viewables,
        });
        Ok(())
    }

    fn remove_all_viewables(&self) {
        {
            let mut state = self.write();
            state.viewables.clear();
            state.sprite_size = None;
        }
        self.emit(SceneEvent::ViewablesRemoved);
    }

    async fn setup_surface_shading(
        &self,
        surface: &ShadingSurface,
        options: &ShadingOptions,
    ) -> Result<(), HostError> {
        {
            let mut state = self.write();
            state.surface = Some(surface.clone());
            state.options = Some(options.clone());
            state.active_sensor_type = None;
            state.visible_nodes.clear();
            state.samples.clear();
        }
        self.emit(SceneEvent::ShadingReady {
            surface: surface.clone(),
            options: options.clone(),
        });
        Ok(())
    }

    fn register_surface_shading_colors(&self, sensor_type: &SensorType, ramp: ColorRamp) {
        self.write().ramps.register(sensor_type.clone(), ramp);
        self.emit(SceneEvent::ColorsRegistered {
            sensor_type: sensor_type.clone(),
            ramp,
        });
    }

    async fn render_surface_shading(
        &self,
        node_ids: &[String],
        sensor_type: &SensorType,
        samples: &[ShadingSample],
    ) -> Result<(), HostError> {
        let (visible, shaded) = {
            let mut state = self.write();
            let Some(surface) = &state.surface else {
                return Err(HostError::ShadingNotReady);
            };
            let visible: Vec<String> = node_ids
                .iter()
                .filter(|id| surface.contains_node(id))
                .cloned()
                .collect();
            let shaded = shade(surface, &state.ramps, samples);
            state.active_sensor_type = Some(sensor_type.clone());
            state.visible_nodes = visible.clone();
            state.samples = shaded.clone();
            state.last_update = Some(Utc::now());
            (visible, shaded)
        };
        self.emit(SceneEvent::ShadingRendered {
            sensor_type: sensor_type.clone(),
            node_ids: visible,
            samples: shaded,
        });
        Ok(())
    }

    async fn update_surface_shading(&self, samples: &[ShadingSample]) -> Result<(), HostError> {
        let shaded = {
            let mut state = self.write();
            let Some(surface) = &state.surface else {
                return Err(HostError::ShadingNotReady);
            };
            let shaded = shade(surface, &state.ramps, samples);
            state.samples = shaded.clone();
            state.last_update = Some(Utc::now());
            shaded
        };
        self.emit(SceneEvent::ShadingUpdated { samples: shaded });
        Ok(())
    }

    fn remove_surface_shading(&self) {
        {
            let mut state = self.write();
            state.surface = None;
            state.options = None;
            state.active_sensor_type = None;
            state.visible_nodes.clear();
            state.samples.clear();
        }
        self.emit(SceneEvent::ShadingRemoved);
    }
}

impl Viewport for SceneLayer {
    fn fit_to_view(&self) {
        self.emit(SceneEvent::FitToView);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Device, DeviceId};
    use crate::geometry::Point3;
    use crate::viewable::ViewableId;
    use crate::style::StyleDefinition;

    fn surface() -> ShadingSurface {
        let devices = vec![
            Device::new(
                DeviceId::new("A"),
                Some(Point3::new(0.0, 0.0, 0.0)),
                vec!["temperature".into()],
            )
            .unwrap(),
        ];
        ShadingSurface::from_devices("Level 1", &devices)
    }

    fn sample(point_id: &str, sensor_type: &str, value: f64) -> ShadingSample {
        ShadingSample {
            point_id: point_id.into(),
            sensor_type: sensor_type.into(),
            value,
        }
    }

    #[tokio::test]
    async fn test_unfinished_batch_rejected() {
        let layer = SceneLayer::new();
        let mut data = ViewableData::new(16);
        data.add_viewable(SpriteViewable {
            id: ViewableId(1),
            device_id: DeviceId::new("A"),
            position: Point3::default(),
            style: StyleDefinition {
                icon_url: "images/temp.svg".into(),
                color: 0xffffff,
            },
        });
        assert!(layer.add_viewables(data.clone()).await.is_err());

        data.finish();
        let mut rx = layer.subscribe();
        layer.add_viewables(data).await.unwrap();
        assert_eq!(layer.viewables().len(), 1);
        assert!(matches!(
            rx.recv().await.unwrap().event,
            SceneEvent::ViewablesAdded { sprite_size: 16, .. }
        ));

        layer.remove_all_viewables();
        assert!(layer.viewables().is_empty());
    }

    #[tokio::test]
    async fn test_update_before_setup_fails() {
        let layer = SceneLayer::new();
        let err = layer
            .update_surface_shading(&[sample("A", "temperature", 0.5)])
            .await
            .unwrap_err();
        assert_eq!(err, HostError::ShadingNotReady);
    }

    #[tokio::test]
    async fn test_update_colors_known_points() {
        let layer = SceneLayer::new();
        layer
            .setup_surface_shading(&surface(), &ShadingOptions::default())
            .await
            .unwrap();
        layer.register_surface_shading_colors(
            &"temperature".into(),
            ColorRamp::new(0x000000, 0xffffff),
        );

        layer
            .update_surface_shading(&[
                sample("A", "temperature", 0.0),
                sample("A", "humidity", 0.5),
                sample("Z", "temperature", 0.5),
            ])
            .await
            .unwrap();

        let samples = layer.shaded_samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].color, 0x000000);
    }

    #[tokio::test]
    async fn test_render_filters_unknown_nodes() {
        let layer = SceneLayer::new();
        layer
            .setup_surface_shading(&surface(), &ShadingOptions::default())
            .await
            .unwrap();
        layer
            .render_surface_shading(
                &["A".to_string(), "B".to_string()],
                &"temperature".into(),
                &[],
            )
            .await
            .unwrap();
        let snapshot = layer.snapshot();
        assert_eq!(snapshot.visible_nodes, vec!["A".to_string()]);
        assert_eq!(snapshot.active_sensor_type, Some("temperature".into()));
    }

    #[tokio::test]
    async fn test_remove_shading_clears_state() {
        let layer = SceneLayer::new();
        layer
            .setup_surface_shading(&surface(), &ShadingOptions::default())
            .await
            .unwrap();
        let mut rx = layer.subscribe();
        layer.remove_surface_shading();

        assert!(layer.surface().is_none());
        assert!(matches!(rx.recv().await.unwrap().event, SceneEvent::ShadingRemoved));
        assert_eq!(
            layer.update_surface_shading(&[]).await.unwrap_err(),
            HostError::ShadingNotReady
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(SceneEvent::FitToView).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "fit_to_view" }));
    }
}
