pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::{InMemoryRepository, InMemorySnapshot};
pub use record::{
    AuditEntry, AuditEvent, AuditLog, DispatchDecision, Incident, IncidentStatus, Recommendation,
    UnitType, Urgency,
};
pub use traits::IncidentRepository;
