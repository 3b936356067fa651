//! Dispatch recommendation: which facility, which unit, how soon.

use std::sync::Arc;

use talon_storage::{Incident, Recommendation, UnitType, Urgency};

use crate::config::{Coordinates, DispatchConfig};
use crate::directory::ResourceDirectory;

/// Unit class for an urgency tier. Only CRITICAL warrants advanced life support.
pub fn unit_for(urgency: Urgency) -> UnitType {
    match urgency {
        Urgency::Critical => UnitType::AlsAmbulance,
        Urgency::Urgent | Urgency::Routine => UnitType::BlsAmbulance,
    }
}

/// Produces recommendations from an incident's urgency and location.
#[derive(Debug, Clone)]
pub struct DispatchEngine {
    directory: Arc<ResourceDirectory>,
    config: DispatchConfig,
}

impl DispatchEngine {
    pub fn new(directory: Arc<ResourceDirectory>, config: DispatchConfig) -> Self {
        DispatchEngine { directory, config }
    }

    pub fn directory(&self) -> &Arc<ResourceDirectory> {
        &self.directory
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Recommend a dispatch, or `None` when the incident needs none.
    ///
    /// Incidents without a full coordinate pair are routed from the
    /// configured default location.
    pub fn recommend(&self, incident: &Incident) -> Option<Recommendation> {
        if !incident.dispatch_required {
            return None;
        }

        let origin = Coordinates::from_parts(incident.lat, incident.lon)
            .unwrap_or(self.config.default_location);
        let resource = self.directory.nearest_to(Some(origin.lat), Some(origin.lon));

        Some(Recommendation {
            unit_type: unit_for(incident.urgency),
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            eta_minutes: self.config.eta_minutes,
        })
    }
}
