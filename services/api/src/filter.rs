use chrono::{Local, NaiveDate};
use clap::Args;
use fleet_compliance::compliance::{summarize_payload, write_register_csv};
use fleet_compliance::config::TelemetryConfig;
use fleet_compliance::error::AppError;
use fleet_compliance::ingest::{FleetSnapshot, RawFleetPayload};
use fleet_compliance::telemetry;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Args, Debug, Default)]
pub(crate) struct SummarizeArgs {
    /// Backend payload as JSON; reads stdin when omitted
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pub(crate) pretty: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    /// Backend payload as JSON; reads stdin when omitted
    #[arg(long)]
    pub(crate) input: Option<PathBuf>,
    /// Destination CSV file; writes stdout when omitted
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Evaluation date (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn run_summarize(args: SummarizeArgs) -> Result<(), AppError> {
    init_quiet_telemetry();

    let payload = read_payload(args.input.as_deref())?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let report = summarize_payload(&payload, today);

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    init_quiet_telemetry();

    let payload = read_payload(args.input.as_deref())?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let snapshot = FleetSnapshot::from_raw(&payload);
    if !snapshot.rejects.is_empty() {
        warn!(
            rejected = snapshot.rejects.len(),
            "rows left out of the register"
        );
    }

    let rows = match args.output.as_deref() {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            let rows = write_register_csv(writer, &snapshot.vehicles, &snapshot.records, today)?;
            info!(rows, path = %path.display(), "register written");
            rows
        }
        None => write_register_csv(
            io::stdout().lock(),
            &snapshot.vehicles,
            &snapshot.records,
            today,
        )?,
    };

    if rows == 0 {
        warn!("register is empty");
    }
    Ok(())
}

fn read_payload(input: Option<&Path>) -> Result<RawFleetPayload, AppError> {
    let raw = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    parse_payload(&raw)
}

pub(crate) fn parse_payload(raw: &str) -> Result<RawFleetPayload, AppError> {
    Ok(serde_json::from_str(raw)?)
}

/// Filters keep stdout clean; only warnings reach stderr unless `RUST_LOG` says otherwise.
fn init_quiet_telemetry() {
    let config = TelemetryConfig {
        log_level: "warn".to_string(),
    };
    if let Err(err) = telemetry::init(&config) {
        eprintln!("logging disabled: {err}");
    }
}
