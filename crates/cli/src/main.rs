mod serve;
mod settings;
mod simulate;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use talon_core::{latest_recommendation, Channel, IntakeReport};
use talon_storage::Incident;

use crate::settings::Settings;
use crate::simulate::{check_cases, run_simulation, SimulationSummary, DEFAULT_SIMULATION_CASES};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// T.A.L.O.N. emergency incident triage and dispatch service.
#[derive(Parser)]
#[command(
    name = "talon",
    version,
    about = "T.A.L.O.N. emergency incident triage and dispatch service"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Path to a TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API and carrier webhooks
    Serve {
        /// Port to listen on (overrides settings and TALON_PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one report through the intake pipeline and print the incident
    Analyze {
        /// Free-text emergency report
        text: String,
        /// Caller latitude
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        /// Caller longitude
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Ingest synthetic reports concurrently and print a summary
    Simulate {
        /// Number of reports to generate
        #[arg(long, default_value_t = DEFAULT_SIMULATION_CASES)]
        cases: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            report_error(&e.to_string(), cli.output);
            process::exit(1);
        }
    };
    init_tracing(&settings.log_filter);

    let pipeline = match settings.build_pipeline() {
        Ok(p) => p,
        Err(e) => {
            report_error(&e.to_string(), cli.output);
            process::exit(1);
        }
    };

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(settings.port);
            if let Err(e) = rt.block_on(serve::start_server(port, pipeline)) {
                report_error(&format!("Server error: {}", e), cli.output);
                process::exit(1);
            }
        }
        Commands::Analyze { text, lat, lon } => {
            let report = IntakeReport::new(Channel::Api, text).with_location(lat, lon);
            match rt.block_on(pipeline.ingest(report)) {
                Ok(incident) => print_incident(&incident, cli.output),
                Err(e) => {
                    report_error(&e.to_string(), cli.output);
                    process::exit(1);
                }
            }
        }
        Commands::Simulate { cases } => {
            let cases = match check_cases(cases) {
                Ok(cases) => cases,
                Err(e) => {
                    report_error(&e.to_string(), cli.output);
                    process::exit(1);
                }
            };
            let summary = rt.block_on(run_simulation(pipeline, cases));
            print_summary(&summary, cli.output);
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over settings.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_filter))
                .unwrap_or_else(|_| EnvFilter::new(settings::DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_incident(incident: &Incident, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(incident)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("incident {}", incident.id);
            println!("  urgency: {}", incident.urgency);
            println!("  status: {}", incident.status);
            println!("  dispatch required: {}", incident.dispatch_required);
            if incident.symptoms.is_empty() {
                println!("  symptoms: (none)");
            } else {
                println!("  symptoms: {}", incident.symptoms.join(", "));
            }
            for line in &incident.reasoning {
                println!("  - {}", line);
            }
            if let Some(rec) = latest_recommendation(incident) {
                println!(
                    "  recommendation: {} from {} ({}), ETA {} min",
                    rec.unit_type, rec.resource_name, rec.resource_id, rec.eta_minutes
                );
            }
        }
    }
}

fn print_summary(summary: &SimulationSummary, output: OutputFormat) {
    match output {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(summary)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!(
                "simulated {} reports: {} created, {} failed",
                summary.requested, summary.created, summary.failed
            );
            for (urgency, count) in &summary.by_urgency {
                println!("  {}: {}", urgency, count);
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat) {
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
