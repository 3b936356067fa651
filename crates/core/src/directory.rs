//! Registry of dispatchable facilities.
//!
//! The directory is built once and read-only afterwards, so it is shared
//! through an `Arc` without any locking.

use serde::{Deserialize, Serialize};

use crate::config::Coordinates;
use crate::error::DirectoryError;

/// A dispatchable facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub beds: u32,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl Resource {
    pub fn location(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Non-empty, ordered set of resources. Registration order is the
/// tie-break order for nearest-resource lookup.
#[derive(Debug, Clone)]
pub struct ResourceDirectory {
    resources: Vec<Resource>,
}

impl ResourceDirectory {
    pub fn new(resources: Vec<Resource>) -> Result<Self, DirectoryError> {
        if resources.is_empty() {
            return Err(DirectoryError::Empty);
        }
        for (i, r) in resources.iter().enumerate() {
            if resources[..i].iter().any(|earlier| earlier.id == r.id) {
                return Err(DirectoryError::DuplicateId(r.id.clone()));
            }
        }
        Ok(ResourceDirectory { resources })
    }

    /// The three-hospital registry the service ships with.
    pub fn builtin() -> Self {
        let hospital = |id: &str, name: &str, lat: f64, lon: f64, beds: u32, caps: &[&str]| Resource {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lon,
            beds,
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
        };
        ResourceDirectory {
            resources: vec![
                hospital(
                    "H1",
                    "City Trauma Center",
                    23.23,
                    77.40,
                    4,
                    &["trauma", "cardiac", "icu"],
                ),
                hospital(
                    "H2",
                    "Metro Cardiac Institute",
                    23.26,
                    77.43,
                    2,
                    &["cardiac", "icu"],
                ),
                hospital("H3", "Green Valley Clinic", 23.28, 77.45, 12, &["general"]),
            ],
        }
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// First-registered resource; used when no location is known.
    pub fn default_resource(&self) -> &Resource {
        // Non-empty by construction.
        &self.resources[0]
    }

    pub fn lookup_by_id(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// Resource closest to `(lat, lon)` by straight-line distance.
    ///
    /// Either coordinate missing returns the first-registered resource.
    /// Equal distances keep the earlier-registered resource, and so do
    /// distances that cannot be compared (NaN input).
    pub fn nearest_to(&self, lat: Option<f64>, lon: Option<f64>) -> &Resource {
        let Some(query) = Coordinates::from_parts(lat, lon) else {
            return self.default_resource();
        };

        let mut best = self.default_resource();
        let mut best_dist = query.distance_to(&best.location());
        for candidate in &self.resources[1..] {
            let dist = query.distance_to(&candidate.location());
            if dist < best_dist || (best_dist.is_nan() && !dist.is_nan()) {
                best = candidate;
                best_dist = dist;
            }
        }
        best
    }
}
