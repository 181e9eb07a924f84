//! Sensor value sources for the heatmap

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::device::SensorType;

/// Supplies the current value of one sensor type at one shading point
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// `None` when no reading is available right now
    async fn read(&self, point_id: &str, sensor_type: &SensorType) -> Option<f64>;
}

/// Uniform random values in [0, 1)
pub struct RandomTelemetry {
    rng: Mutex<StdRng>,
}

impl RandomTelemetry {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic sequence for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TelemetrySource for RandomTelemetry {
    async fn read(&self, _point_id: &str, _sensor_type: &SensorType) -> Option<f64> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(rng.random::<f64>())
    }
}

/// Same value for every point
#[derive(Debug, Clone, Copy)]
pub struct ConstantTelemetry(pub f64);

#[async_trait]
impl TelemetrySource for ConstantTelemetry {
    async fn read(&self, _point_id: &str, _sensor_type: &SensorType) -> Option<f64> {
        Some(self.0)
    }
}
