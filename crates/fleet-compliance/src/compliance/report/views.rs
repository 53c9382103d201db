use super::super::domain::{ComplianceStatus, DocumentType, RecordId, VehicleId};
use chrono::NaiveDate;
use serde::Serialize;

/// Tenant-wide compliance counts. Always recomputed from the inputs it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub expired_count: usize,
    pub missing_count: usize,
    pub expiring_soon_count: usize,
    pub healthy_count: usize,
    pub draft_count: usize,
    pub orphaned_count: usize,
    pub published_vehicle_count: usize,
    pub draft_vehicle_count: usize,
    pub healthy_vehicle_count: usize,
    pub fleet_health_pct: u8,
    pub vehicle_health: Vec<VehicleHealthEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VehicleHealthEntry {
    pub vehicle_id: VehicleId,
    pub registration_number: String,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_status: Option<ComplianceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_status_label: Option<&'static str>,
    pub healthy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordStatusView {
    pub record_id: RecordId,
    pub vehicle_id: VehicleId,
    pub registration_number: String,
    pub document_type: DocumentType,
    pub document_label: &'static str,
    pub expiry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    pub status: ComplianceStatus,
    pub status_label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    Healthy,
    Warning,
    Critical,
}

impl AuditLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Healthy => "Healthy",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

/// Per-vehicle audit narrative derived from classified records.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceAudit {
    pub vehicle_id: VehicleId,
    pub registration_number: String,
    pub level: AuditLevel,
    pub level_label: &'static str,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}
