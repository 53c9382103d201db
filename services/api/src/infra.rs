use chrono::NaiveDate;
use fleet_compliance::compliance::reminders::AutomationConfig;
use fleet_compliance::compliance::{
    ComplianceRecord, FleetRepository, RepositoryError, TenantId, Vehicle, VehicleId,
};
use fleet_compliance::ingest::FleetSnapshot;
use fleet_compliance::platform::NotificationLog;
use fleet_compliance::tenancy::{SubscriptionPlan, Tenant, TenantStatus};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local store used when no hosted backend is configured.
#[derive(Default, Clone)]
pub(crate) struct InMemoryFleetRepository {
    tenants: Arc<Mutex<HashMap<TenantId, Tenant>>>,
    vehicles: Arc<Mutex<Vec<Vehicle>>>,
    records: Arc<Mutex<Vec<ComplianceRecord>>>,
    automation: Arc<Mutex<HashMap<TenantId, AutomationConfig>>>,
    logs: Arc<Mutex<Vec<NotificationLog>>>,
}

impl InMemoryFleetRepository {
    /// Load a normalized snapshot. Every tenant referenced by a vehicle gets an
    /// active Free-plan tenant entry.
    pub(crate) fn from_snapshot(snapshot: FleetSnapshot, today: NaiveDate) -> Self {
        let repository = Self::default();
        {
            let mut tenants = repository.tenants.lock().expect("tenant mutex poisoned");
            for vehicle in &snapshot.vehicles {
                tenants
                    .entry(vehicle.tenant_id.clone())
                    .or_insert_with(|| local_tenant(&vehicle.tenant_id, today));
            }
        }
        repository
            .vehicles
            .lock()
            .expect("vehicle mutex poisoned")
            .extend(snapshot.vehicles);
        repository
            .records
            .lock()
            .expect("record mutex poisoned")
            .extend(snapshot.records);
        repository
    }

    pub(crate) fn add_tenant(&self, tenant: Tenant) {
        self.tenants
            .lock()
            .expect("tenant mutex poisoned")
            .insert(tenant.id.clone(), tenant);
    }
}

pub(crate) fn local_tenant(id: &TenantId, today: NaiveDate) -> Tenant {
    Tenant {
        id: id.clone(),
        name: id.0.clone(),
        owner_email: String::new(),
        plan: SubscriptionPlan::Free,
        status: TenantStatus::Active,
        created_on: Some(today),
        subscription_expiry: None,
        payment_id: None,
    }
}

impl FleetRepository for InMemoryFleetRepository {
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn tenants(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        let mut tenants: Vec<Tenant> = guard.values().cloned().collect();
        tenants.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tenants)
    }

    fn set_tenant_status(
        &self,
        id: &TenantId,
        status: TenantStatus,
    ) -> Result<Tenant, RepositoryError> {
        let mut guard = self.tenants.lock().expect("tenant mutex poisoned");
        let tenant = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        tenant.status = status;
        Ok(tenant.clone())
    }

    fn vehicles(&self, tenant_id: &TenantId) -> Result<Vec<Vehicle>, RepositoryError> {
        let guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        Ok(guard
            .iter()
            .filter(|vehicle| &vehicle.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError> {
        let mut guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        if guard.iter().any(|existing| existing.id == vehicle.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(vehicle.clone());
        Ok(vehicle)
    }

    fn delete_vehicle(&self, tenant_id: &TenantId, id: &VehicleId) -> Result<(), RepositoryError> {
        let mut guard = self.vehicles.lock().expect("vehicle mutex poisoned");
        let before = guard.len();
        guard.retain(|vehicle| !(&vehicle.tenant_id == tenant_id && &vehicle.id == id));
        if guard.len() == before {
            Err(RepositoryError::NotFound)
        } else {
            Ok(())
        }
    }

    fn records(&self, tenant_id: &TenantId) -> Result<Vec<ComplianceRecord>, RepositoryError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| &record.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    fn upsert_record(&self, record: ComplianceRecord) -> Result<ComplianceRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("record mutex poisoned");
        match guard.iter_mut().find(|existing| existing.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => guard.push(record.clone()),
        }
        Ok(record)
    }

    fn delete_records_for_vehicle(
        &self,
        tenant_id: &TenantId,
        vehicle_id: &VehicleId,
    ) -> Result<usize, RepositoryError> {
        let mut guard = self.records.lock().expect("record mutex poisoned");
        let before = guard.len();
        guard.retain(|record| {
            !(&record.tenant_id == tenant_id && &record.vehicle_id == vehicle_id)
        });
        Ok(before - guard.len())
    }

    fn automation_config(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<AutomationConfig>, RepositoryError> {
        let guard = self.automation.lock().expect("automation mutex poisoned");
        Ok(guard.get(tenant_id).cloned())
    }

    fn save_automation_config(
        &self,
        config: AutomationConfig,
    ) -> Result<AutomationConfig, RepositoryError> {
        let mut guard = self.automation.lock().expect("automation mutex poisoned");
        guard.insert(config.tenant_id.clone(), config.clone());
        Ok(config)
    }

    fn notification_logs(
        &self,
        tenant_id: Option<&TenantId>,
        limit: usize,
    ) -> Result<Vec<NotificationLog>, RepositoryError> {
        let guard = self.logs.lock().expect("log mutex poisoned");
        let mut logs: Vec<NotificationLog> = guard
            .iter()
            .filter(|log| tenant_id.map_or(true, |id| &log.tenant_id == id))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs.truncate(limit);
        Ok(logs)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
