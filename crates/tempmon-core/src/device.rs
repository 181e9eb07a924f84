//! Device types for simulated sensor placements

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point3;

#[derive(Error, Debug, PartialEq)]
pub enum DeviceError {
    #[error("Device {0} has no sensor types")]
    NoSensorTypes(String),
}

/// Unique identifier for a device within one registry snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id given to the device placed in a room
    pub fn for_room(room_name: &str) -> Self {
        Self(format!("{} device", room_name))
    }

    /// Id given to the n-th device found by property search
    pub fn for_sensor(index: usize) -> Self {
        Self(format!("Sensor {}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque object identifier in the loaded model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DbId(pub u32);

impl std::fmt::Display for DbId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sensor-type tag such as "temperature" or "humidity"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorType(pub String);

impl SensorType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SensorType {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A simulated sensor placed in the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DeviceRecord")]
pub struct Device {
    /// Unique id within the snapshot
    pub id: DeviceId,
    /// World position; `None` when the geometry could not be resolved
    pub position: Option<Point3>,
    /// Sensor types exposed by this device, never empty
    pub sensor_types: Vec<SensorType>,
    /// Model object the device was derived from (property search)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_id: Option<DbId>,
    /// Room the device was placed in (room grouping)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// Device as read from JSON, before validation
#[derive(Deserialize)]
struct DeviceRecord {
    id: DeviceId,
    position: Option<Point3>,
    sensor_types: Vec<SensorType>,
    #[serde(default)]
    db_id: Option<DbId>,
    #[serde(default)]
    room: Option<String>,
}

impl TryFrom<DeviceRecord> for Device {
    type Error = DeviceError;

    fn try_from(record: DeviceRecord) -> Result<Self, Self::Error> {
        let mut device = Device::new(record.id, record.position, record.sensor_types)?;
        device.db_id = record.db_id;
        device.room = record.room;
        Ok(device)
    }
}

impl Device {
    /// Create a device, rejecting an empty sensor type list
    pub fn new(
        id: DeviceId,
        position: Option<Point3>,
        sensor_types: Vec<SensorType>,
    ) -> Result<Self, DeviceError> {
        if sensor_types.is_empty() {
            return Err(DeviceError::NoSensorTypes(id.0));
        }
        Ok(Self {
            id,
            position,
            sensor_types,
            db_id: None,
            room: None,
        })
    }

    pub fn with_db_id(mut self, db_id: DbId) -> Self {
        self.db_id = Some(db_id);
        self
    }

    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// The sensor type used to pick the sprite style
    pub fn primary_sensor_type(&self) -> &SensorType {
        // Non-empty by construction
        &self.sensor_types[0]
    }

    /// Position, if it is usable for rendering and shading
    pub fn finite_position(&self) -> Option<Point3> {
        self.position.filter(Point3::is_finite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_ids() {
        assert_eq!(DeviceId::for_room("Office 101").as_str(), "Office 101 device");
        assert_eq!(DeviceId::for_sensor(3).as_str(), "Sensor 3");
    }

    #[test]
    fn test_device_requires_sensor_types() {
        let err = Device::new(DeviceId::new("A"), None, Vec::new()).unwrap_err();
        assert_eq!(err, DeviceError::NoSensorTypes("A".to_string()));
    }

    #[test]
    fn test_deserialize_validates_sensor_types() {
        let device: Device = serde_json::from_str(
            r#"{ "id": "A", "position": null, "sensor_types": ["temperature"], "room": "Office" }"#,
        )
        .unwrap();
        assert_eq!(device.primary_sensor_type().as_str(), "temperature");
        assert_eq!(device.room.as_deref(), Some("Office"));

        let err = serde_json::from_str::<Device>(
            r#"{ "id": "B", "position": null, "sensor_types": [] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Device B has no sensor types"));
    }

    #[test]
    fn test_primary_sensor_type() {
        let device = Device::new(
            DeviceId::new("A"),
            Some(Point3::new(0.0, 0.0, 0.0)),
            vec!["temperature".into(), "humidity".into()],
        )
        .unwrap();
        assert_eq!(device.primary_sensor_type().as_str(), "temperature");
    }

    #[test]
    fn test_finite_position() {
        let mut device = Device::new(
            DeviceId::new("A"),
            Some(Point3::new(f64::INFINITY, 0.0, 0.0)),
            vec!["temperature".into()],
        )
        .unwrap();
        assert!(device.finite_position().is_none());

        device.position = Some(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(device.finite_position(), Some(Point3::new(1.0, 2.0, 3.0)));
    }
}
