use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Clinical urgency assigned by classification. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Critical,
    Urgent,
    /// Older clients label this tier `NON-URGENT` or `ADVICE`.
    #[serde(alias = "NON-URGENT", alias = "ADVICE")]
    Routine,
}

impl Urgency {
    pub const ALL: [Urgency; 3] = [Urgency::Critical, Urgency::Urgent, Urgency::Routine];

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "CRITICAL",
            Urgency::Urgent => "URGENT",
            Urgency::Routine => "ROUTINE",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current position of an incident in the dispatch state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Created,
    DispatchConfirmed,
    DispatchDenied,
    ManualReviewRequested,
    DispatchOverridden,
}

impl IncidentStatus {
    pub const ALL: [IncidentStatus; 5] = [
        IncidentStatus::Created,
        IncidentStatus::DispatchConfirmed,
        IncidentStatus::DispatchDenied,
        IncidentStatus::ManualReviewRequested,
        IncidentStatus::DispatchOverridden,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Created => "CREATED",
            IncidentStatus::DispatchConfirmed => "DISPATCH_CONFIRMED",
            IncidentStatus::DispatchDenied => "DISPATCH_DENIED",
            IncidentStatus::ManualReviewRequested => "MANUAL_REVIEW_REQUESTED",
            IncidentStatus::DispatchOverridden => "DISPATCH_OVERRIDDEN",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ambulance class sent to an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// Advanced life support.
    #[serde(rename = "ALS Ambulance")]
    AlsAmbulance,
    /// Basic life support.
    #[serde(rename = "BLS Ambulance")]
    BlsAmbulance,
}

impl UnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitType::AlsAmbulance => "ALS Ambulance",
            UnitType::BlsAmbulance => "BLS Ambulance",
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System-proposed dispatch, computed once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub unit_type: UnitType,
    pub resource_id: String,
    pub resource_name: String,
    pub eta_minutes: u32,
}

/// Dispatch details confirmed by an operator.
///
/// Every field is optional: operators may confirm without a recommendation
/// on file, in which case only `notes` is usually set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchDecision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<UnitType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&Recommendation> for DispatchDecision {
    fn from(rec: &Recommendation) -> Self {
        DispatchDecision {
            unit_type: Some(rec.unit_type),
            resource_id: Some(rec.resource_id.clone()),
            resource_name: Some(rec.resource_name.clone()),
            eta_minutes: Some(rec.eta_minutes),
            notes: None,
        }
    }
}

/// A state-changing event in an incident's history.
///
/// Serialized as `{"event_type": "...", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    DispatchRecommended(Recommendation),
    DispatchConfirmed { decision: DispatchDecision },
    DispatchOverridden { reason: String },
    ManualReviewRequested { reason: String },
    DispatchDenied { reason: String },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::DispatchRecommended(_) => "DISPATCH_RECOMMENDED",
            AuditEvent::DispatchConfirmed { .. } => "DISPATCH_CONFIRMED",
            AuditEvent::DispatchOverridden { .. } => "DISPATCH_OVERRIDDEN",
            AuditEvent::ManualReviewRequested { .. } => "MANUAL_REVIEW_REQUESTED",
            AuditEvent::DispatchDenied { .. } => "DISPATCH_DENIED",
        }
    }
}

/// One audit log line: the event plus when it was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub event: AuditEvent,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Append-only history of an incident. There is no API to remove or
/// reorder entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog(Vec<AuditEntry>);

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: AuditEntry) {
        self.0.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuditEntry> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a AuditLog {
    type Item = &'a AuditEntry;
    type IntoIter = std::slice::Iter<'a, AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A tracked emergency report and its processing history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub input_text: String,
    pub symptoms: Vec<String>,
    pub urgency: Urgency,
    pub dispatch_required: bool,
    pub dispatch_confirmed: bool,
    pub dispatch_decision: Option<DispatchDecision>,
    pub status: IncidentStatus,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub reasoning: Vec<String>,
    pub audit_log: AuditLog,
    pub override_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn audit_entry_serializes_with_event_type_and_payload() {
        let entry = AuditEntry {
            event: AuditEvent::DispatchDenied {
                reason: "caller cancelled".to_string(),
            },
            timestamp: datetime!(2026-01-01 00:00 UTC),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event_type"], "DISPATCH_DENIED");
        assert_eq!(json["payload"]["reason"], "caller cancelled");
        assert_eq!(json["timestamp"], "2026-01-01T00:00:00Z");

        let back: AuditEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn recommendation_payload_is_flat() {
        let entry = AuditEntry {
            event: AuditEvent::DispatchRecommended(Recommendation {
                unit_type: UnitType::AlsAmbulance,
                resource_id: "H2".to_string(),
                resource_name: "Metro Cardiac Institute".to_string(),
                eta_minutes: 12,
            }),
            timestamp: datetime!(2026-01-01 00:00 UTC),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event_type"], "DISPATCH_RECOMMENDED");
        assert_eq!(json["payload"]["unit_type"], "ALS Ambulance");
        assert_eq!(json["payload"]["resource_id"], "H2");
    }

    #[test]
    fn legacy_urgency_labels_map_to_routine() {
        let u: Urgency = serde_json::from_str("\"NON-URGENT\"").unwrap();
        assert_eq!(u, Urgency::Routine);
        let u: Urgency = serde_json::from_str("\"ADVICE\"").unwrap();
        assert_eq!(u, Urgency::Routine);
        assert_eq!(serde_json::to_string(&Urgency::Routine).unwrap(), "\"ROUTINE\"");
    }

    #[test]
    fn status_display_matches_wire_name() {
        for status in IncidentStatus::ALL {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, status.to_string());
        }
    }

    #[test]
    fn decision_from_recommendation_copies_every_field() {
        let rec = Recommendation {
            unit_type: UnitType::BlsAmbulance,
            resource_id: "H3".to_string(),
            resource_name: "Green Valley Clinic".to_string(),
            eta_minutes: 9,
        };
        let decision = DispatchDecision::from(&rec);
        assert_eq!(decision.unit_type, Some(UnitType::BlsAmbulance));
        assert_eq!(decision.resource_id.as_deref(), Some("H3"));
        assert_eq!(decision.eta_minutes, Some(9));
        assert!(decision.notes.is_none());
    }
}
