use super::super::domain::{ComplianceRecord, ComplianceStatus, Vehicle};
use super::summary::status_view;
use super::views::{AuditLevel, ComplianceAudit, RecordStatusView};
use chrono::NaiveDate;

/// Build the audit narrative for one vehicle from its records.
///
/// Records belonging to other vehicles are ignored. A published vehicle without
/// any record is audited as critical, as is one holding an expired or missing
/// document. Draft vehicles are always a warning.
pub fn vehicle_audit(
    vehicle: &Vehicle,
    records: &[ComplianceRecord],
    today: NaiveDate,
) -> ComplianceAudit {
    let statuses: Vec<RecordStatusView> = records
        .iter()
        .filter(|record| record.vehicle_id == vehicle.id)
        .map(|record| status_view(record, vehicle, today))
        .collect();

    let count = |status: ComplianceStatus| statuses.iter().filter(|view| view.status == status).count();
    let expired = count(ComplianceStatus::Critical);
    let missing = count(ComplianceStatus::Missing);
    let expiring = count(ComplianceStatus::Warning);
    let drafts = count(ComplianceStatus::Draft);
    let healthy = count(ComplianceStatus::Healthy);

    let level = if vehicle.is_draft {
        AuditLevel::Warning
    } else if statuses.is_empty() || expired > 0 || missing > 0 {
        AuditLevel::Critical
    } else if expiring > 0 || drafts > 0 {
        AuditLevel::Warning
    } else {
        AuditLevel::Healthy
    };

    let summary = if vehicle.is_draft {
        format!(
            "{} is still a draft; compliance tracking starts once it is published",
            vehicle.registration_number
        )
    } else if statuses.is_empty() {
        format!(
            "{} has no compliance documents on file",
            vehicle.registration_number
        )
    } else {
        format!(
            "{} of {} document(s) valid for {} ({})",
            healthy,
            statuses.len(),
            vehicle.registration_number,
            level.label()
        )
    };

    let mut findings = Vec::new();
    let mut recommendations = Vec::new();

    for view in &statuses {
        match view.status {
            ComplianceStatus::Critical => {
                let overdue = view.days_remaining.map(|days| -days).unwrap_or(0);
                findings.push(format!(
                    "{} expired {} day(s) ago",
                    view.document_label, overdue
                ));
                recommendations.push(format!(
                    "Renew {} immediately; the vehicle is not legally operable without it",
                    view.document_label
                ));
            }
            ComplianceStatus::Missing => {
                findings.push(format!("{} has no expiry date recorded", view.document_label));
                recommendations.push(format!(
                    "Upload the current {} and record its expiry date",
                    view.document_label
                ));
            }
            ComplianceStatus::Warning => {
                let remaining = view.days_remaining.unwrap_or(0);
                findings.push(format!(
                    "{} expires in {} day(s)",
                    view.document_label, remaining
                ));
                recommendations.push(format!(
                    "Schedule renewal of {} before {}",
                    view.document_label,
                    view.expiry_date
                        .map(|date| date.to_string())
                        .unwrap_or_else(|| "its expiry".to_string())
                ));
            }
            ComplianceStatus::Draft if !vehicle.is_draft => {
                findings.push(format!("{} is pending publication", view.document_label));
            }
            ComplianceStatus::Draft | ComplianceStatus::Healthy => {}
        }
    }

    if statuses.is_empty() && !vehicle.is_draft {
        recommendations
            .push("Add registration, insurance, and permit records for this vehicle".to_string());
    }

    if drafts > 0 && !vehicle.is_draft {
        recommendations.push("Publish pending draft documents so they are tracked".to_string());
    }

    ComplianceAudit {
        vehicle_id: vehicle.id.clone(),
        registration_number: vehicle.registration_number.clone(),
        level,
        level_label: level.label(),
        summary,
        findings,
        recommendations,
    }
}
