use serde::{Deserialize, Serialize};

/// World-space position. `y` is elevation; `x`/`z` span the map plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Full 3D Euclidean distance.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Horizontal bounding box of a map in world units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub x1: f64,
    pub z1: f64,
    pub x2: f64,
    pub z2: f64,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            x1: -1000.0,
            z1: -1000.0,
            x2: 1000.0,
            z2: 1000.0,
        }
    }
}

impl MapBounds {
    /// Distance between the two corners on the x/z plane.
    pub fn diagonal(&self) -> f64 {
        let dx = self.x2 - self.x1;
        let dz = self.z2 - self.z1;
        (dx * dx + dz * dz).sqrt()
    }
}
