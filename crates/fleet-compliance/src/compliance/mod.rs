//! Document compliance tracking for fleet vehicles.
//!
//! Classification, aggregation, audits and reminder planning are pure functions of
//! the vehicles, records and a `today` date. The service and router layer them over
//! a tenant-scoped repository.

pub mod classifier;
pub mod domain;
pub mod export;
pub mod reminders;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

use chrono::NaiveDate;
use serde::Serialize;

use crate::ingest::{FleetSnapshot, IngestReject, RawFleetPayload};

pub use classifier::{classify_expiry, classify_record, days_until_expiry};
pub use domain::{
    ComplianceRecord, ComplianceStatus, DocumentType, RecordId, TenantId, Vehicle,
    VehicleCategory, VehicleId,
};
pub use export::{write_register_csv, ExportError};
pub use reminders::{plan_reminders, AutomationConfig, ReminderNotice, ReminderTemplate};
pub use report::views::{ComplianceAudit, FleetSummary, RecordStatusView, VehicleHealthEntry};
pub use report::{aggregate, fleet_health_pct, monitored_vehicle_count, vehicle_audit};
pub use repository::{FleetRepository, RepositoryError};
pub use router::{fleet_router, FleetApiState};
pub use service::{AutomationUpdate, FleetService, FleetServiceError};

/// Summary of a raw backend payload, as produced by the CLI filter and the
/// stateless summary endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub today: NaiveDate,
    pub summary: FleetSummary,
    pub monitored_vehicle_count: usize,
    pub rejects: Vec<IngestReject>,
    pub flagged: Vec<IngestReject>,
}

/// Normalize a raw payload and summarize it. Rows without usable identifiers
/// are reported in `rejects` and left out of every count; rows kept with a
/// fallback value are counted and listed in `flagged`.
pub fn summarize_payload(payload: &RawFleetPayload, today: NaiveDate) -> SummaryReport {
    let snapshot = FleetSnapshot::from_raw(payload);

    SummaryReport {
        today,
        summary: aggregate(&snapshot.vehicles, &snapshot.records, today),
        monitored_vehicle_count: monitored_vehicle_count(&snapshot.vehicles, &snapshot.records),
        rejects: snapshot.rejects,
        flagged: snapshot.flagged,
    }
}
