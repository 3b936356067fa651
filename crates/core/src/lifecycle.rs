//! Incident lifecycle service.
//!
//! Owns every mutation of an incident. Each operation either commits the
//! new state together with its audit entry, or changes nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use talon_storage::{
    AuditEvent, AuditLog, DispatchDecision, Incident, IncidentRepository, IncidentStatus,
    Recommendation, Urgency,
};

use crate::dispatch::DispatchEngine;
use crate::error::LifecycleError;
use crate::transition::{apply_event, Transition};

/// Verdict of the urgency classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub urgency: Urgency,
    pub dispatch_required: bool,
    pub reasoning: Vec<String>,
}

/// Everything needed to open an incident.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub input_text: String,
    pub symptoms: Vec<String>,
    pub classification: Classification,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Most recent system recommendation recorded for an incident.
pub fn latest_recommendation(incident: &Incident) -> Option<&Recommendation> {
    incident
        .audit_log
        .iter()
        .rev()
        .find_map(|entry| match &entry.event {
            AuditEvent::DispatchRecommended(rec) => Some(rec),
            _ => None,
        })
}

pub struct IncidentService<S: IncidentRepository> {
    repository: Arc<S>,
    dispatch: DispatchEngine,
}

impl<S: IncidentRepository> IncidentService<S> {
    pub fn new(repository: Arc<S>, dispatch: DispatchEngine) -> Self {
        IncidentService {
            repository,
            dispatch,
        }
    }

    pub fn repository(&self) -> &Arc<S> {
        &self.repository
    }

    pub fn dispatch(&self) -> &DispatchEngine {
        &self.dispatch
    }

    /// Open a new incident and attach its dispatch recommendation.
    ///
    /// The recommendation is computed before the single save, so no reader
    /// ever sees the incident without it.
    pub async fn create(&self, new: NewIncident) -> Result<Incident, LifecycleError> {
        let now = OffsetDateTime::now_utc();
        let mut incident = Incident {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            input_text: new.input_text,
            symptoms: new.symptoms,
            urgency: new.classification.urgency,
            dispatch_required: new.classification.dispatch_required,
            dispatch_confirmed: false,
            dispatch_decision: None,
            status: IncidentStatus::Created,
            lat: new.lat,
            lon: new.lon,
            reasoning: new.classification.reasoning,
            audit_log: AuditLog::new(),
            override_reason: None,
        };

        if let Some(rec) = self.dispatch.recommend(&incident) {
            debug!(
                incident_id = %incident.id,
                unit_type = %rec.unit_type,
                resource_id = %rec.resource_id,
                "dispatch recommended"
            );
            apply_event(&mut incident, AuditEvent::DispatchRecommended(rec), now);
        }

        self.repository.save(incident.clone()).await?;
        info!(
            incident_id = %incident.id,
            urgency = %incident.urgency,
            dispatch_required = incident.dispatch_required,
            "incident created"
        );
        Ok(incident)
    }

    pub async fn confirm_dispatch(
        &self,
        incident_id: &str,
        decision: DispatchDecision,
    ) -> Result<Incident, LifecycleError> {
        self.transition(incident_id, Transition::Confirm { decision })
            .await
    }

    pub async fn override_dispatch(
        &self,
        incident_id: &str,
        reason: impl Into<String>,
    ) -> Result<Incident, LifecycleError> {
        self.transition(
            incident_id,
            Transition::Override {
                reason: reason.into(),
            },
        )
        .await
    }

    /// Flag for human review. `None` records the default reason.
    pub async fn request_manual_review(
        &self,
        incident_id: &str,
        reason: Option<String>,
    ) -> Result<Incident, LifecycleError> {
        self.transition(incident_id, Transition::manual_review(reason))
            .await
    }

    /// Deny dispatch. `None` records the default reason.
    pub async fn deny_dispatch(
        &self,
        incident_id: &str,
        reason: Option<String>,
    ) -> Result<Incident, LifecycleError> {
        self.transition(incident_id, Transition::deny(reason)).await
    }

    /// Read-modify-append under the incident's update lock.
    async fn transition(
        &self,
        incident_id: &str,
        transition: Transition,
    ) -> Result<Incident, LifecycleError> {
        let (snapshot, mut incident) = self.repository.begin_update(incident_id).await?;

        let event = transition.into_event();
        let event_type = event.event_type();
        apply_event(&mut incident, event, OffsetDateTime::now_utc());

        self.repository
            .commit_update(snapshot, incident.clone())
            .await?;
        info!(
            incident_id = %incident.id,
            event_type,
            status = %incident.status,
            "incident transitioned"
        );
        Ok(incident)
    }
}
