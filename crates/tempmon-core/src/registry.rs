//! Device registry: builds the device snapshot the overlay is drawn from

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::coords::CoordinateResolver;
use crate::device::{DbId, Device, DeviceId, SensorType};
use crate::host::{HostError, HostHandle, LevelStructure};
use crate::locator::PropertyLocator;

/// Where devices come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DeviceSource {
    /// One device per room on a level
    Rooms {
        #[serde(default = "default_level")]
        level: String,
        #[serde(default = "default_room_sensor_type")]
        sensor_type: SensorType,
    },
    /// One device per object whose property matches one of the values
    Search {
        property: String,
        values: Vec<String>,
        #[serde(default = "default_search_sensor_types")]
        sensor_types: Vec<SensorType>,
    },
}

pub fn default_level() -> String {
    "Level 1".to_string()
}

fn default_room_sensor_type() -> SensorType {
    SensorType::new("temperature")
}

fn default_search_sensor_types() -> Vec<SensorType> {
    vec![SensorType::new("temperature"), SensorType::new("humidity")]
}

impl Default for DeviceSource {
    fn default() -> Self {
        Self::Rooms {
            level: default_level(),
            sensor_type: default_room_sensor_type(),
        }
    }
}

/// Assembles devices from level metadata or property search results
#[derive(Clone)]
pub struct DeviceRegistry {
    locator: PropertyLocator,
    resolver: CoordinateResolver,
    levels: Arc<dyn LevelStructure>,
}

impl DeviceRegistry {
    pub fn new(host: &HostHandle) -> Self {
        Self {
            locator: PropertyLocator::new(host.properties.clone()),
            resolver: CoordinateResolver::new(host.spatial.clone()),
            levels: host.levels.clone(),
        }
    }

    /// Build a fresh snapshot from the given source
    pub async fn build(&self, source: &DeviceSource) -> Result<Vec<Device>, HostError> {
        match source {
            DeviceSource::Rooms { level, sensor_type } => {
                self.from_rooms(level, sensor_type).await
            }
            DeviceSource::Search {
                property,
                values,
                sensor_types,
            } => self.from_search(property, values, sensor_types).await,
        }
    }

    /// One device at the center of each room on `level`
    pub async fn from_rooms(
        &self,
        level: &str,
        sensor_type: &SensorType,
    ) -> Result<Vec<Device>, HostError> {
        let rooms = self.levels.rooms_on_level(level).await?;

        let devices: Vec<Device> = rooms
            .into_iter()
            .map(|room| {
                let center = room.bounds.center();
                let position = if center.is_finite() {
                    Some(center)
                } else {
                    warn!(room = %room.name, level = %level, "Room has no usable bounds");
                    None
                };
                Device {
                    id: DeviceId::for_room(&room.name),
                    position,
                    sensor_types: vec![sensor_type.clone()],
                    db_id: None,
                    room: Some(room.name),
                }
            })
            .collect();

        info!(level = %level, devices = devices.len(), "Placed devices in rooms");
        Ok(devices)
    }

    /// One device per matching object that has geometry
    pub async fn from_search(
        &self,
        property: &str,
        values: &[String],
        sensor_types: &[SensorType],
    ) -> Result<Vec<Device>, HostError> {
        if sensor_types.is_empty() {
            warn!(property = %property, "Property search configured without sensor types");
            return Ok(Vec::new());
        }

        let mut candidates: Vec<DbId> = Vec::new();
        let mut seen = HashSet::new();
        for value in values {
            for db_id in self.locator.find(property, value).await? {
                if seen.insert(db_id) {
                    candidates.push(db_id);
                }
            }
        }

        if candidates.is_empty() {
            info!(property = %property, "Property search found no objects");
            return Ok(Vec::new());
        }

        let mut devices = Vec::with_capacity(candidates.len());
        for (index, db_id) in candidates.iter().enumerate() {
            match self.resolver.resolve(*db_id).await? {
                Some(position) => devices.push(Device {
                    id: DeviceId::for_sensor(index),
                    position: Some(position),
                    sensor_types: sensor_types.to_vec(),
                    db_id: Some(*db_id),
                    room: None,
                }),
                None => debug!(db_id = %db_id, "Skipping object without geometry"),
            }
        }

        info!(
            property = %property,
            candidates = candidates.len(),
            devices = devices.len(),
            "Placed devices from property search"
        );
        Ok(devices)
    }
}
