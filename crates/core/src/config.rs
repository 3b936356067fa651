//! Dispatch tuning shared by the recommendation engine and its callers.

use serde::{Deserialize, Serialize};

/// A point in the plane used for straight-line distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Coordinates { lat, lon }
    }

    /// Pair two optional coordinates; `None` unless both are present.
    pub fn from_parts(lat: Option<f64>, lon: Option<f64>) -> Option<Self> {
        match (lat, lon) {
            (Some(lat), Some(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        }
    }

    /// Planar Euclidean distance in coordinate units.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        ((other.lat - self.lat).powi(2) + (other.lon - self.lon).powi(2)).sqrt()
    }
}

/// Location used when a report arrives without coordinates.
pub const DEFAULT_LOCATION: Coordinates = Coordinates::new(23.25, 77.42);

/// Placeholder travel time until a routing model exists.
pub const DEFAULT_ETA_MINUTES: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub default_location: Coordinates,
    pub eta_minutes: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            default_location: DEFAULT_LOCATION,
            eta_minutes: DEFAULT_ETA_MINUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_requires_both() {
        assert!(Coordinates::from_parts(Some(1.0), None).is_none());
        assert!(Coordinates::from_parts(None, Some(1.0)).is_none());
        assert_eq!(
            Coordinates::from_parts(Some(1.0), Some(2.0)),
            Some(Coordinates::new(1.0, 2.0))
        );
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
    }
}
