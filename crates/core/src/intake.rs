//! Intake pipeline shared by every ingestion channel.
//!
//! Two levels of abstraction:
//! - [`SymptomExtractor`] / [`UrgencyClassifier`] — external collaborators
//!   that turn raw text into symptoms and symptoms into a verdict
//! - [`IntakePipeline`] — validates the report, awaits both collaborators
//!   (bounded by a timeout, holding no incident lock), then hands the result
//!   to the lifecycle service
//!
//! API calls, SMS, voice transcriptions, and the load simulator all create
//! incidents through [`IntakePipeline::ingest`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use talon_storage::{Incident, IncidentRepository};

use crate::error::{CollaboratorError, IntakeError};
use crate::lifecycle::{Classification, IncidentService, NewIncident};

/// Default bound on each collaborator call.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

/// Turns raw report text into canonical symptom tokens.
#[async_trait]
pub trait SymptomExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Vec<String>, CollaboratorError>;
}

/// Maps a symptom list to urgency, dispatch need, and reasoning.
#[async_trait]
pub trait UrgencyClassifier: Send + Sync {
    async fn classify(&self, symptoms: &[String]) -> Result<Classification, CollaboratorError>;
}

/// Path a report arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Api,
    Sms,
    Voice,
    Simulation,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Api => "api",
            Channel::Sms => "sms",
            Channel::Voice => "voice",
            Channel::Simulation => "simulation",
        };
        f.write_str(name)
    }
}

/// A raw report as received from a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeReport {
    pub channel: Channel,
    pub text: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl IntakeReport {
    pub fn new(channel: Channel, text: impl Into<String>) -> Self {
        IntakeReport {
            channel,
            text: text.into(),
            lat: None,
            lon: None,
        }
    }

    pub fn with_location(mut self, lat: Option<f64>, lon: Option<f64>) -> Self {
        self.lat = lat;
        self.lon = lon;
        self
    }
}

pub struct IntakePipeline<S: IncidentRepository> {
    service: Arc<IncidentService<S>>,
    extractor: Arc<dyn SymptomExtractor>,
    classifier: Arc<dyn UrgencyClassifier>,
    timeout: Duration,
}

impl<S: IncidentRepository> IntakePipeline<S> {
    pub fn new(
        service: Arc<IncidentService<S>>,
        extractor: Arc<dyn SymptomExtractor>,
        classifier: Arc<dyn UrgencyClassifier>,
    ) -> Self {
        IntakePipeline {
            service,
            extractor,
            classifier,
            timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn service(&self) -> &Arc<IncidentService<S>> {
        &self.service
    }

    /// Validate, extract, classify, and create an incident.
    ///
    /// The stored `input_text` is the trimmed report.
    pub async fn ingest(&self, report: IntakeReport) -> Result<Incident, IntakeError> {
        let text = report.text.trim();
        if text.is_empty() {
            return Err(IntakeError::Validation("Text cannot be empty".to_string()));
        }

        let symptoms = self
            .bounded("extractor", self.extractor.extract(text))
            .await
            .inspect_err(|e| warn!(channel = %report.channel, error = %e, "extraction failed"))?;
        let classification = self
            .bounded("classifier", self.classifier.classify(&symptoms))
            .await
            .inspect_err(|e| warn!(channel = %report.channel, error = %e, "classification failed"))?;

        let incident = self
            .service
            .create(NewIncident {
                input_text: text.to_string(),
                symptoms,
                classification,
                lat: report.lat,
                lon: report.lon,
            })
            .await?;

        info!(
            channel = %report.channel,
            incident_id = %incident.id,
            urgency = %incident.urgency,
            "report ingested"
        );
        Ok(incident)
    }

    async fn bounded<T>(
        &self,
        collaborator: &'static str,
        call: impl Future<Output = Result<T, CollaboratorError>>,
    ) -> Result<T, CollaboratorError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::TimedOut {
                collaborator,
                after_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}
