use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for tenants (customer organizations).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Identifier wrapper for registered vehicles.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub String);

/// Identifier wrapper for tracked compliance records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleCategory {
    Truck,
    Bus,
    Car,
    Lorry,
    /// Backend row carried no recognizable category.
    Unspecified,
}

impl VehicleCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Truck => "Truck",
            Self::Bus => "Bus",
            Self::Car => "Car",
            Self::Lorry => "Lorry",
            Self::Unspecified => "Unspecified",
        }
    }
}

/// Regulatory documents tracked per vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    RegistrationCertificate,
    Permit,
    Insurance,
    NationalPermitTax,
    MotorVehicleTax,
    FitnessCertificate,
    PollutionCertificate,
    /// Backend row named a document type outside the tracked set. Never
    /// carries an expiry, so it always classifies as missing.
    Unrecognized,
}

impl DocumentType {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::RegistrationCertificate,
            Self::Permit,
            Self::Insurance,
            Self::NationalPermitTax,
            Self::MotorVehicleTax,
            Self::FitnessCertificate,
            Self::PollutionCertificate,
        ]
    }

    /// Display label, identical to the value persisted by the hosted backend.
    pub const fn label(self) -> &'static str {
        match self {
            Self::RegistrationCertificate => "RC Validity",
            Self::Permit => "Permit Validity",
            Self::Insurance => "Insurance Validity",
            Self::NationalPermitTax => "NP Tax",
            Self::MotorVehicleTax => "MV Tax",
            Self::FitnessCertificate => "Fitness Certificate",
            Self::PollutionCertificate => "Pollution (PUC)",
            Self::Unrecognized => "Unrecognized Document",
        }
    }
}

/// Outcome of classifying a single compliance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Draft,
    Missing,
    Critical,
    Warning,
    Healthy,
}

impl ComplianceStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Missing => "Data Missing",
            Self::Critical => "Expired",
            Self::Warning => "Expiring Soon",
            Self::Healthy => "Healthy",
        }
    }

    /// Missing records are aggregated as expired: nothing on file is treated as the worst case.
    pub const fn counts_as_expired(self) -> bool {
        matches!(self, Self::Critical | Self::Missing)
    }

    /// Anything other than `Healthy` keeps a vehicle out of the healthy bucket.
    pub const fn is_compliant(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Rank used to pick the worst status for a vehicle; higher is worse.
    pub(crate) const fn severity_rank(self) -> u8 {
        match self {
            Self::Healthy => 0,
            Self::Draft => 1,
            Self::Warning => 2,
            Self::Missing => 3,
            Self::Critical => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub tenant_id: TenantId,
    pub registration_number: String,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub category: VehicleCategory,
    pub added_on: Option<NaiveDate>,
    pub is_draft: bool,
}

impl Vehicle {
    pub fn is_published(&self) -> bool {
        !self.is_draft
    }
}

/// Uploaded evidence for a record (file name plus storage pointer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedDocument {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRecord {
    pub id: RecordId,
    pub tenant_id: TenantId,
    pub vehicle_id: VehicleId,
    pub document_type: DocumentType,
    pub expiry_date: Option<NaiveDate>,
    pub last_renewed_on: Option<NaiveDate>,
    pub alert_enabled: bool,
    pub alert_days_before: u32,
    pub is_draft: bool,
    pub document: Option<AttachedDocument>,
    #[serde(default)]
    pub sent_reminders: Vec<u32>,
    #[serde(default)]
    pub last_alert_sent_on: Option<NaiveDate>,
}

/// Lead time applied when the backend row leaves `alert_days_before` unset.
pub const DEFAULT_ALERT_DAYS_BEFORE: u32 = 15;

/// Longest accepted reminder lead time; larger values are clamped.
pub const MAX_ALERT_DAYS_BEFORE: u32 = 365;

/// Normalizes a registration number the way it is stored and compared.
pub fn normalize_registration(value: &str) -> String {
    value.trim().to_uppercase()
}
