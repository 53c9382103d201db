//! Single normalization step between backend rows and the compliance domain.

mod mapping;
mod normalizer;
mod rows;

use crate::compliance::domain::{
    normalize_registration, AttachedDocument, ComplianceRecord, DocumentType, RecordId, TenantId,
    Vehicle, VehicleCategory, VehicleId, DEFAULT_ALERT_DAYS_BEFORE, MAX_ALERT_DAYS_BEFORE,
};
use normalizer::{loose_u32, non_blank, parse_date_field, DateField};
use serde::Serialize;
use tracing::warn;

pub use rows::{RawComplianceRow, RawFleetPayload, RawVehicleRow};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("{entity} row is missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    #[error("unknown vehicle category '{0}'")]
    UnknownCategory(String),
    #[error("unknown document type '{0}'")]
    UnknownDocumentType(String),
}

/// Convert a backend vehicle row into a typed vehicle.
///
/// Only the identifiers are required. A blank registration or an unknown
/// category keeps the vehicle in the fleet so its records are still counted;
/// [`vehicle_issues`] reports what had to fall back.
pub fn normalize_vehicle(row: &RawVehicleRow) -> Result<Vehicle, IngestError> {
    let id = required("vehicle", "id", row.id.as_deref())?;
    let tenant_id = required("vehicle", "tenant_id", row.tenant_id.as_deref())?;
    let registration = non_blank(row.registration_number.as_deref()).unwrap_or_default();
    let category = resolve_category(row).unwrap_or(VehicleCategory::Unspecified);

    let year = loose_u32(row.year.as_ref())
        .and_then(|year| u16::try_from(year).ok())
        .unwrap_or(0);

    Ok(Vehicle {
        id: VehicleId(id),
        tenant_id: TenantId(tenant_id),
        registration_number: normalize_registration(&registration),
        make: non_blank(row.make.as_deref()).unwrap_or_default(),
        model: non_blank(row.model.as_deref()).unwrap_or_default(),
        year,
        category,
        added_on: parse_date_field(row.added_date.as_deref()).value(),
        is_draft: row.is_draft.unwrap_or(false),
    })
}

/// Fields of a vehicle row that normalization had to fill with a fallback.
pub fn vehicle_issues(row: &RawVehicleRow) -> Vec<IngestError> {
    let mut issues = Vec::new();
    if non_blank(row.registration_number.as_deref()).is_none() {
        issues.push(IngestError::MissingField {
            entity: "vehicle",
            field: "registration_number",
        });
    }
    if let Err(err) = resolve_category(row) {
        issues.push(err);
    }
    issues
}

fn resolve_category(row: &RawVehicleRow) -> Result<VehicleCategory, IngestError> {
    match non_blank(row.category.as_deref()) {
        Some(raw) => mapping::category_for(&raw).ok_or(IngestError::UnknownCategory(raw)),
        None => Err(IngestError::MissingField {
            entity: "vehicle",
            field: "type",
        }),
    }
}

/// Convert a backend compliance row into a typed record.
///
/// A malformed expiry date is kept as "not recorded", so the record classifies
/// as missing instead of passing silently. A missing or unknown document type
/// becomes [`DocumentType::Unrecognized`] with no expiry, which also classifies
/// as missing.
pub fn normalize_record(row: &RawComplianceRow) -> Result<ComplianceRecord, IngestError> {
    let id = required("record", "id", row.id.as_deref())?;
    let tenant_id = required("record", "tenant_id", row.tenant_id.as_deref())?;
    let vehicle_id = required("record", "vehicle_id", row.vehicle_id.as_deref())?;
    let document_type = resolve_document_type(row).unwrap_or(DocumentType::Unrecognized);

    let expiry_date = match parse_date_field(row.expiry_date.as_deref()) {
        _ if document_type == DocumentType::Unrecognized => None,
        DateField::Malformed => {
            warn!(
                record_id = %id,
                value = row.expiry_date.as_deref().unwrap_or_default(),
                "unparsable expiry date treated as not recorded"
            );
            None
        }
        field => field.value(),
    };

    let document = match (
        non_blank(row.document_name.as_deref()),
        non_blank(row.document_url.as_deref()),
    ) {
        (Some(name), Some(url)) => Some(AttachedDocument { name, url }),
        (None, Some(url)) => Some(AttachedDocument {
            name: "document".to_string(),
            url,
        }),
        _ => None,
    };

    let alert_days_before = loose_u32(row.alert_days_before.as_ref())
        .filter(|days| *days > 0)
        .map_or(DEFAULT_ALERT_DAYS_BEFORE, |days| days.min(MAX_ALERT_DAYS_BEFORE));

    let mut sent_reminders: Vec<u32> = row
        .sent_reminders
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|value| loose_u32(Some(value)))
        .collect();
    sent_reminders.sort_unstable();
    sent_reminders.dedup();

    Ok(ComplianceRecord {
        id: RecordId(id),
        tenant_id: TenantId(tenant_id),
        vehicle_id: VehicleId(vehicle_id),
        document_type,
        expiry_date,
        last_renewed_on: parse_date_field(row.last_renewed_date.as_deref()).value(),
        alert_enabled: row.alert_enabled.unwrap_or(true),
        alert_days_before,
        is_draft: row.is_draft.unwrap_or(false),
        document,
        sent_reminders,
        last_alert_sent_on: parse_date_field(row.last_alert_sent_date.as_deref()).value(),
    })
}

/// Fields of a record row that normalization had to fill with a fallback.
pub fn record_issues(row: &RawComplianceRow) -> Vec<IngestError> {
    resolve_document_type(row).err().into_iter().collect()
}

fn resolve_document_type(row: &RawComplianceRow) -> Result<DocumentType, IngestError> {
    let raw_type = required("record", "type", row.document_type.as_deref())?;
    mapping::document_type_for(&raw_type).ok_or(IngestError::UnknownDocumentType(raw_type))
}

fn required(
    entity: &'static str,
    field: &'static str,
    value: Option<&str>,
) -> Result<String, IngestError> {
    non_blank(value).ok_or(IngestError::MissingField { entity, field })
}

/// A row that could not be fully normalized, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReject {
    pub entity: &'static str,
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
}

/// Typed vehicles and records for one payload.
///
/// `rejects` lists rows that were dropped (no usable identifiers). `flagged`
/// lists rows that were kept with a conservative fallback for a bad field.
#[derive(Debug, Clone, Default)]
pub struct FleetSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub records: Vec<ComplianceRecord>,
    pub rejects: Vec<IngestReject>,
    pub flagged: Vec<IngestReject>,
}

impl FleetSnapshot {
    pub fn from_raw(payload: &RawFleetPayload) -> Self {
        let mut snapshot = Self::default();

        for (index, row) in payload.vehicles.iter().enumerate() {
            match normalize_vehicle(row) {
                Ok(vehicle) => {
                    for issue in vehicle_issues(row) {
                        snapshot.flag("vehicle", index, row.id.clone(), issue);
                    }
                    snapshot.vehicles.push(vehicle);
                }
                Err(err) => snapshot.reject("vehicle", index, row.id.clone(), err),
            }
        }

        for (index, row) in payload.records.iter().enumerate() {
            match normalize_record(row) {
                Ok(record) => {
                    for issue in record_issues(row) {
                        snapshot.flag("record", index, row.id.clone(), issue);
                    }
                    snapshot.records.push(record);
                }
                Err(err) => snapshot.reject("record", index, row.id.clone(), err),
            }
        }

        snapshot
    }

    fn reject(&mut self, entity: &'static str, index: usize, id: Option<String>, err: IngestError) {
        warn!(entity, index, error = %err, "rejected backend row");
        self.rejects.push(IngestReject {
            entity,
            index,
            id,
            reason: err.to_string(),
        });
    }

    fn flag(&mut self, entity: &'static str, index: usize, id: Option<String>, err: IngestError) {
        warn!(entity, index, error = %err, "kept backend row with fallback value");
        self.flagged.push(IngestReject {
            entity,
            index,
            id,
            reason: err.to_string(),
        });
    }
}
