//! Synthetic load: many reports ingested concurrently through the same
//! pipeline the live channels use.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use talon_core::{Channel, IntakePipeline, IntakeReport};
use talon_storage::{IncidentRepository, Urgency};

/// Upper bound on cases per simulation run.
pub(crate) const MAX_SIMULATION_CASES: usize = 500;

/// Cases per run when the caller does not say.
pub(crate) const DEFAULT_SIMULATION_CASES: usize = 10;

/// Coordinate spread around the default location.
const JITTER: f64 = 0.05;

const SAMPLE_REPORTS: &[&str] = &[
    "Chest pain, can't breathe",
    "My father collapsed and is unresponsive",
    "Severe bleeding from a deep cut on the leg",
    "She is having a seizure",
    "Child is choking on food",
    "Slurred speech and face drooping",
    "I think he broke his arm, it might be a fracture",
    "Burned my hand on the stove, it looks bad",
    "Hit my head on the door and feel dizzy",
    "High fever since last night",
    "Allergic reaction, hives all over",
    "Mild headache since this morning",
    "Bit of a cough and a sore throat",
    "Sprained my ankle playing football",
    "Stomach pain after dinner",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SimulationSummary {
    pub(crate) requested: usize,
    pub(crate) created: usize,
    pub(crate) failed: usize,
    pub(crate) by_urgency: BTreeMap<&'static str, usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cases must be at most {max}, got {0}", max = MAX_SIMULATION_CASES)]
pub(crate) struct TooManyCases(pub(crate) usize);

pub(crate) fn check_cases(cases: usize) -> Result<usize, TooManyCases> {
    if cases > MAX_SIMULATION_CASES {
        Err(TooManyCases(cases))
    } else {
        Ok(cases)
    }
}

/// Draw `cases` reports with coordinates jittered around the dispatch
/// default location.
fn sample_reports(cases: usize, center_lat: f64, center_lon: f64) -> Vec<IntakeReport> {
    let mut rng = rand::thread_rng();
    (0..cases)
        .map(|_| {
            let text = SAMPLE_REPORTS.choose(&mut rng).copied().unwrap_or_default();
            let lat = center_lat + rng.gen_range(-JITTER..=JITTER);
            let lon = center_lon + rng.gen_range(-JITTER..=JITTER);
            IntakeReport::new(Channel::Simulation, text).with_location(Some(lat), Some(lon))
        })
        .collect()
}

/// Ingest `cases` synthetic reports concurrently and tally the outcome.
pub(crate) async fn run_simulation<S: IncidentRepository>(
    pipeline: Arc<IntakePipeline<S>>,
    cases: usize,
) -> SimulationSummary {
    let center = pipeline.service().dispatch().config().default_location;
    let reports = sample_reports(cases, center.lat, center.lon);

    let mut tasks = JoinSet::new();
    for report in reports {
        let pipeline = pipeline.clone();
        tasks.spawn(async move { pipeline.ingest(report).await });
    }

    let mut summary = SimulationSummary {
        requested: cases,
        created: 0,
        failed: 0,
        by_urgency: Urgency::ALL.iter().map(|u| (u.as_str(), 0)).collect(),
    };
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(incident)) => {
                summary.created += 1;
                *summary.by_urgency.entry(incident.urgency.as_str()).or_default() += 1;
            }
            Ok(Err(e)) => {
                warn!(error = %e, "simulated report rejected");
                summary.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "simulation task aborted");
                summary.failed += 1;
            }
        }
    }

    info!(
        requested = summary.requested,
        created = summary.created,
        failed = summary.failed,
        "simulation finished"
    );
    summary
}
