//! Dispatch state machine.
//!
//! A transition is turned into exactly one audit event, and the event is
//! what changes state. Live updates and audit-log replay share
//! [`DispatchState::apply`], so replaying an incident's log always lands on
//! its current state.
//!
//! No transition is refused because of the current status: operators may
//! re-decide an incident any number of times.

use time::OffsetDateTime;

use talon_storage::{AuditEntry, AuditEvent, DispatchDecision, Incident, IncidentStatus};

pub const DEFAULT_REVIEW_REASON: &str = "User requested review";
pub const DEFAULT_DENY_REASON: &str = "User denied dispatch";

/// An operator action on an existing incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Confirm { decision: DispatchDecision },
    Override { reason: String },
    ManualReview { reason: String },
    Deny { reason: String },
}

impl Transition {
    pub fn manual_review(reason: Option<String>) -> Self {
        Transition::ManualReview {
            reason: reason.unwrap_or_else(|| DEFAULT_REVIEW_REASON.to_string()),
        }
    }

    pub fn deny(reason: Option<String>) -> Self {
        Transition::Deny {
            reason: reason.unwrap_or_else(|| DEFAULT_DENY_REASON.to_string()),
        }
    }

    pub fn into_event(self) -> AuditEvent {
        match self {
            Transition::Confirm { decision } => AuditEvent::DispatchConfirmed { decision },
            Transition::Override { reason } => AuditEvent::DispatchOverridden { reason },
            Transition::ManualReview { reason } => AuditEvent::ManualReviewRequested { reason },
            Transition::Deny { reason } => AuditEvent::DispatchDenied { reason },
        }
    }
}

/// The mutable, event-driven part of an incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchState {
    pub status: IncidentStatus,
    pub dispatch_confirmed: bool,
    pub dispatch_decision: Option<DispatchDecision>,
    pub override_reason: Option<String>,
}

impl Default for DispatchState {
    fn default() -> Self {
        DispatchState {
            status: IncidentStatus::Created,
            dispatch_confirmed: false,
            dispatch_decision: None,
            override_reason: None,
        }
    }
}

impl DispatchState {
    pub fn of(incident: &Incident) -> Self {
        DispatchState {
            status: incident.status,
            dispatch_confirmed: incident.dispatch_confirmed,
            dispatch_decision: incident.dispatch_decision.clone(),
            override_reason: incident.override_reason.clone(),
        }
    }

    pub fn apply(&mut self, event: &AuditEvent) {
        match event {
            AuditEvent::DispatchRecommended(_) => {}
            AuditEvent::DispatchConfirmed { decision } => {
                self.dispatch_decision = Some(decision.clone());
                self.dispatch_confirmed = true;
                self.status = IncidentStatus::DispatchConfirmed;
            }
            AuditEvent::DispatchOverridden { reason } => {
                self.dispatch_confirmed = false;
                self.status = IncidentStatus::DispatchOverridden;
                self.override_reason = Some(reason.clone());
            }
            AuditEvent::ManualReviewRequested { .. } => {
                self.status = IncidentStatus::ManualReviewRequested;
            }
            AuditEvent::DispatchDenied { .. } => {
                self.status = IncidentStatus::DispatchDenied;
                self.dispatch_confirmed = false;
            }
        }
    }

    fn write_to(self, incident: &mut Incident) {
        incident.status = self.status;
        incident.dispatch_confirmed = self.dispatch_confirmed;
        incident.dispatch_decision = self.dispatch_decision;
        incident.override_reason = self.override_reason;
    }
}

/// Apply `event` to `incident` and append it to the audit log.
pub fn apply_event(incident: &mut Incident, event: AuditEvent, at: OffsetDateTime) {
    let mut state = DispatchState::of(incident);
    state.apply(&event);
    state.write_to(incident);
    incident.audit_log.append(AuditEntry {
        event,
        timestamp: at,
    });
    incident.updated_at = at;
}

/// Rebuild dispatch state from an audit log, starting at creation.
pub fn replay<'a, I>(entries: I) -> DispatchState
where
    I: IntoIterator<Item = &'a AuditEntry>,
{
    let mut state = DispatchState::default();
    for entry in entries {
        state.apply(&entry.event);
    }
    state
}
