//! World-space points and axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

/// A point in model world coordinates (Z up)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when no component is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f64; 3]> for Point3 {
    fn from(arr: [f64; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

/// Axis-aligned bounding box as reported by the spatial index
///
/// An object without geometry reports [`BoundingBox::EMPTY`], whose minimum
/// is `+inf` on every axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3,
    pub max: Point3,
}

impl BoundingBox {
    /// The "unbounded" sentinel
    pub const EMPTY: BoundingBox = BoundingBox {
        min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
        max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
    };

    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Build from the flat `[min_x, min_y, min_z, max_x, max_y, max_z]` layout
    pub fn from_flat(values: [f64; 6]) -> Self {
        Self {
            min: Point3::new(values[0], values[1], values[2]),
            max: Point3::new(values[3], values[4], values[5]),
        }
    }

    /// Whether the box carries the sentinel in its first coordinate
    pub fn is_unbounded(&self) -> bool {
        self.min.x == f64::INFINITY
    }

    pub fn center(&self) -> Point3 {
        Point3::new(
            self.min.x + (self.max.x - self.min.x) / 2.0,
            self.min.y + (self.max.y - self.min.y) / 2.0,
            self.min.z + (self.max.z - self.min.z) / 2.0,
        )
    }

    /// Horizontal center of the footprint, standing on the bottom face
    pub fn base_center(&self) -> Point3 {
        let center = self.center();
        Point3::new(center.x, center.y, self.min.z)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}
