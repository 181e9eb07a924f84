//! Sprite styles and heatmap color ramps keyed by sensor type

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::device::SensorType;

/// How sprites for one sensor type are drawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDefinition {
    /// Icon URL, relative to the client bundle
    pub icon_url: String,
    /// Tint color as 0xRRGGBB
    pub color: u32,
}

/// Style table entry as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleEntry {
    pub sensor_type: SensorType,
    pub icon_url: String,
    #[serde(default = "default_sprite_color")]
    pub color: u32,
}

fn default_sprite_color() -> u32 {
    0xffffff
}

/// Read-only sensor type to style lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleMap {
    styles: BTreeMap<SensorType, StyleDefinition>,
}

impl StyleMap {
    pub fn from_entries(entries: &[StyleEntry]) -> Self {
        let styles = entries
            .iter()
            .map(|e| {
                (
                    e.sensor_type.clone(),
                    StyleDefinition {
                        icon_url: e.icon_url.clone(),
                        color: e.color,
                    },
                )
            })
            .collect();
        Self { styles }
    }

    pub fn get(&self, sensor_type: &SensorType) -> Option<&StyleDefinition> {
        self.styles.get(sensor_type)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SensorType, &StyleDefinition)> {
        self.styles.iter()
    }
}

/// The built-in style table: a temperature icon in white
pub fn default_styles() -> Vec<StyleEntry> {
    vec![StyleEntry {
        sensor_type: SensorType::new("temperature"),
        icon_url: "images/temp.svg".to_string(),
        color: 0xffffff,
    }]
}

/// Two-stop color gradient used to shade sensor values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRamp {
    /// Color for the lowest value
    pub low: u32,
    /// Color for the highest value
    pub high: u32,
}

impl ColorRamp {
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Color for a value, clamped into [0, 1]
    pub fn sample(&self, value: f64) -> u32 {
        let t = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let channel = |shift: u32| {
            let lo = ((self.low >> shift) & 0xff) as f64;
            let hi = ((self.high >> shift) & 0xff) as f64;
            ((lo + (hi - lo) * t).round() as u32) << shift
        };
        channel(16) | channel(8) | channel(0)
    }
}

/// Color ramp table entry as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorRampEntry {
    pub sensor_type: SensorType,
    /// `[low, high]` as 0xRRGGBB
    pub colors: [u32; 2],
}

/// One ramp per sensor type; registering a type again replaces its ramp
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorRamps {
    ramps: BTreeMap<SensorType, ColorRamp>,
}

impl ColorRamps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[ColorRampEntry]) -> Self {
        let mut ramps = Self::new();
        for entry in entries {
            ramps.register(
                entry.sensor_type.clone(),
                ColorRamp::new(entry.colors[0], entry.colors[1]),
            );
        }
        ramps
    }

    /// Returns the ramp that was replaced, if any
    pub fn register(&mut self, sensor_type: SensorType, ramp: ColorRamp) -> Option<ColorRamp> {
        self.ramps.insert(sensor_type, ramp)
    }

    pub fn get(&self, sensor_type: &SensorType) -> Option<ColorRamp> {
        self.ramps.get(sensor_type).copied()
    }

    pub fn len(&self) -> usize {
        self.ramps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ramps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SensorType, &ColorRamp)> {
        self.ramps.iter()
    }
}

/// Built-in ramps: CO2 green to red, temperature red to blue
pub fn default_color_ramps() -> Vec<ColorRampEntry> {
    vec![
        ColorRampEntry {
            sensor_type: SensorType::new("co2"),
            colors: [0x00ff00, 0xff0000],
        },
        ColorRampEntry {
            sensor_type: SensorType::new("temperature"),
            colors: [0xff0000, 0x0000ff],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_lookup() {
        let styles = StyleMap::from_entries(&default_styles());
        let style = styles.get(&SensorType::new("temperature")).unwrap();
        assert_eq!(style.icon_url, "images/temp.svg");
        assert_eq!(style.color, 0xffffff);
        assert!(styles.get(&SensorType::new("humidity")).is_none());
    }

    #[test]
    fn test_ramp_sample() {
        let ramp = ColorRamp::new(0x0000ff, 0xff0000);
        assert_eq!(ramp.sample(0.0), 0x0000ff);
        assert_eq!(ramp.sample(1.0), 0xff0000);
        assert_eq!(ramp.sample(0.5), 0x800080);
        assert_eq!(ramp.sample(7.0), 0xff0000);
        assert_eq!(ramp.sample(-3.0), 0x0000ff);
        assert_eq!(ramp.sample(f64::NAN), 0x0000ff);
    }

    #[test]
    fn test_register_replaces() {
        let mut ramps = ColorRamps::new();
        let temperature = SensorType::new("temperature");
        assert!(ramps
            .register(temperature.clone(), ColorRamp::new(0xff0000, 0x0000ff))
            .is_none());
        let previous = ramps.register(temperature.clone(), ColorRamp::new(0x000000, 0xffffff));
        assert_eq!(previous, Some(ColorRamp::new(0xff0000, 0x0000ff)));
        assert_eq!(ramps.len(), 1);
        assert_eq!(ramps.get(&temperature), Some(ColorRamp::new(0x000000, 0xffffff)));
    }

    #[test]
    fn test_ramps_from_config_entries() {
        let ramps = ColorRamps::from_entries(&default_color_ramps());
        assert_eq!(ramps.len(), 2);
        assert_eq!(
            ramps.get(&SensorType::new("co2")),
            Some(ColorRamp::new(0x00ff00, 0xff0000))
        );
    }
}
