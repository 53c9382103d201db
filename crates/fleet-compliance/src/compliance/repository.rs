use super::domain::{ComplianceRecord, TenantId, Vehicle, VehicleId};
use super::reminders::AutomationConfig;
use crate::platform::NotificationLog;
use crate::tenancy::{Tenant, TenantStatus};

/// Tenant-scoped persistence, implemented by the hosted backend adapter in
/// production and by in-memory stores in the service binary and tests.
pub trait FleetRepository: Send + Sync {
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;
    fn tenants(&self) -> Result<Vec<Tenant>, RepositoryError>;
    /// Returns the updated tenant, or `NotFound`.
    fn set_tenant_status(
        &self,
        id: &TenantId,
        status: TenantStatus,
    ) -> Result<Tenant, RepositoryError>;

    fn vehicles(&self, tenant_id: &TenantId) -> Result<Vec<Vehicle>, RepositoryError>;
    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError>;
    fn delete_vehicle(&self, tenant_id: &TenantId, id: &VehicleId) -> Result<(), RepositoryError>;

    fn records(&self, tenant_id: &TenantId) -> Result<Vec<ComplianceRecord>, RepositoryError>;
    /// Insert or replace by record id.
    fn upsert_record(&self, record: ComplianceRecord) -> Result<ComplianceRecord, RepositoryError>;
    /// Remove every record of a vehicle, returning how many were removed.
    fn delete_records_for_vehicle(
        &self,
        tenant_id: &TenantId,
        vehicle_id: &VehicleId,
    ) -> Result<usize, RepositoryError>;

    fn automation_config(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<AutomationConfig>, RepositoryError>;
    /// Insert or replace the settings of `config.tenant_id`.
    fn save_automation_config(
        &self,
        config: AutomationConfig,
    ) -> Result<AutomationConfig, RepositoryError>;

    /// Most recent logs first; `None` returns logs across all tenants.
    fn notification_logs(
        &self,
        tenant_id: Option<&TenantId>,
        limit: usize,
    ) -> Result<Vec<NotificationLog>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Only transport-level failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
