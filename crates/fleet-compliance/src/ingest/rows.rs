use serde::Deserialize;
use serde_json::Value;

/// Vehicle row as returned by the hosted backend. Every field is optional because
/// the backend does not enforce shapes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVehicleRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default, alias = "vehicle_number")]
    pub registration_number: Option<String>,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<Value>,
    #[serde(default, rename = "type", alias = "category")]
    pub category: Option<String>,
    #[serde(default)]
    pub added_date: Option<String>,
    #[serde(default)]
    pub is_draft: Option<bool>,
}

/// Compliance record row as returned by the hosted backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComplianceRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default, rename = "type", alias = "document_type")]
    pub document_type: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub last_renewed_date: Option<String>,
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub alert_enabled: Option<bool>,
    #[serde(default)]
    pub alert_days_before: Option<Value>,
    #[serde(default)]
    pub is_draft: Option<bool>,
    #[serde(default)]
    pub sent_reminders: Option<Vec<Value>>,
    #[serde(default)]
    pub last_alert_sent_date: Option<String>,
}

/// Payload accepted by the summary filter and endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFleetPayload {
    #[serde(default)]
    pub vehicles: Vec<RawVehicleRow>,
    #[serde(default)]
    pub records: Vec<RawComplianceRow>,
}
