//! Service settings: TOML file plus `TALON_*` environment overrides.
//!
//! Every field has a default, so `talon` runs with no config file at all.
//!
//! ```toml
//! port = 8080
//! log_filter = "info"
//! collaborator_timeout_ms = 5000
//!
//! [dispatch]
//! default_lat = 23.25
//! default_lon = 77.42
//! eta_minutes = 12
//!
//! [[resources]]
//! id = "H1"
//! name = "City Trauma Center"
//! lat = 23.23
//! lon = 77.40
//! beds = 4
//! capabilities = ["trauma"]
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use talon_core::{
    Coordinates, DirectoryError, DispatchConfig, DispatchEngine, IncidentService,
    IntakePipeline, KeywordExtractor, Resource, ResourceDirectory, RuleClassifier,
    DEFAULT_COLLABORATOR_TIMEOUT, DEFAULT_ETA_MINUTES, DEFAULT_LOCATION,
};
use talon_storage::InMemoryRepository;

pub(crate) const DEFAULT_PORT: u16 = 8080;
pub(crate) const DEFAULT_LOG_FILTER: &str = "info";

/// Pipeline type every `talon` command runs against.
pub(crate) type Pipeline = IntakePipeline<InMemoryRepository>;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SettingsError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("invalid resource registry: {0}")]
    Directory(#[from] DirectoryError),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DispatchSettings {
    pub(crate) default_lat: f64,
    pub(crate) default_lon: f64,
    pub(crate) eta_minutes: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        DispatchSettings {
            default_lat: DEFAULT_LOCATION.lat,
            default_lon: DEFAULT_LOCATION.lon,
            eta_minutes: DEFAULT_ETA_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) port: u16,
    pub(crate) log_filter: String,
    pub(crate) collaborator_timeout_ms: u64,
    pub(crate) dispatch: DispatchSettings,
    /// Replaces the built-in registry when present.
    pub(crate) resources: Option<Vec<Resource>>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            port: DEFAULT_PORT,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            collaborator_timeout_ms: DEFAULT_COLLABORATOR_TIMEOUT.as_millis() as u64,
            dispatch: DispatchSettings::default(),
            resources: None,
        }
    }
}

impl Settings {
    /// Read `path` (if any), then apply process environment overrides.
    pub(crate) fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
        let mut settings = match path {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        settings.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Settings, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `TALON_*` overrides from `lookup`.
    pub(crate) fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_var(&lookup, "TALON_PORT")? {
            self.port = port;
        }
        if let Some(lat) = parse_var(&lookup, "TALON_DEFAULT_LAT")? {
            self.dispatch.default_lat = lat;
        }
        if let Some(lon) = parse_var(&lookup, "TALON_DEFAULT_LON")? {
            self.dispatch.default_lon = lon;
        }
        if let Some(eta) = parse_var(&lookup, "TALON_ETA_MINUTES")? {
            self.dispatch.eta_minutes = eta;
        }
        Ok(())
    }

    pub(crate) fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            default_location: Coordinates::new(self.dispatch.default_lat, self.dispatch.default_lon),
            eta_minutes: self.dispatch.eta_minutes,
        }
    }

    pub(crate) fn directory(&self) -> Result<ResourceDirectory, SettingsError> {
        match &self.resources {
            Some(resources) => Ok(ResourceDirectory::new(resources.clone())?),
            None => Ok(ResourceDirectory::builtin()),
        }
    }

    pub(crate) fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    /// Wire the repository, lifecycle service, and default collaborators.
    pub(crate) fn build_pipeline(&self) -> Result<Arc<Pipeline>, SettingsError> {
        let engine = DispatchEngine::new(Arc::new(self.directory()?), self.dispatch_config());
        let service = Arc::new(IncidentService::new(
            Arc::new(InMemoryRepository::new()),
            engine,
        ));
        let pipeline = IntakePipeline::new(
            service,
            Arc::new(KeywordExtractor::new()),
            Arc::new(RuleClassifier::new()),
        )
        .with_timeout(self.collaborator_timeout());
        Ok(Arc::new(pipeline))
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, SettingsError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SettingsError::InvalidEnv { var, value }),
    }
}
