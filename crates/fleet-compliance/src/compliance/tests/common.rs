use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::compliance::domain::{
    ComplianceRecord, DocumentType, RecordId, TenantId, Vehicle, VehicleCategory, VehicleId,
};
use crate::compliance::reminders::AutomationConfig;
use crate::compliance::repository::{FleetRepository, RepositoryError};
use crate::compliance::router::{fleet_router, FleetApiState};
use crate::compliance::service::FleetService;
use crate::platform::NotificationLog;
use crate::retry::{Backoff, RetryPolicy};
use crate::tenancy::{Actor, SubscriptionPlan, Tenant, TenantStatus, UserRole};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).expect("valid date")
}

pub(super) fn days_from_today(days: i64) -> NaiveDate {
    today() + chrono::Duration::days(days)
}

pub(super) fn tenant_id() -> TenantId {
    TenantId("tenant-north".to_string())
}

pub(super) fn tenant(plan: SubscriptionPlan) -> Tenant {
    Tenant {
        id: tenant_id(),
        name: "North Haulage".to_string(),
        owner_email: "owner@northhaulage.test".to_string(),
        plan,
        status: TenantStatus::Active,
        created_on: NaiveDate::from_ymd_opt(2024, 6, 1),
        subscription_expiry: match plan {
            SubscriptionPlan::Pro => NaiveDate::from_ymd_opt(2026, 1, 1),
            SubscriptionPlan::Free => None,
        },
        payment_id: None,
    }
}

pub(super) fn admin() -> Actor {
    Actor::new(tenant_id(), UserRole::TenantAdmin)
}

pub(super) fn viewer() -> Actor {
    Actor::new(tenant_id(), UserRole::TenantViewer)
}

pub(super) fn vehicle(id: &str, registration: &str, is_draft: bool) -> Vehicle {
    Vehicle {
        id: VehicleId(id.to_string()),
        tenant_id: tenant_id(),
        registration_number: registration.to_string(),
        make: "Tata".to_string(),
        model: "Signa 4825".to_string(),
        year: 2021,
        category: VehicleCategory::Truck,
        added_on: NaiveDate::from_ymd_opt(2024, 7, 1),
        is_draft,
    }
}

pub(super) fn record(
    id: &str,
    vehicle_id: &str,
    document_type: DocumentType,
    expiry_date: Option<NaiveDate>,
) -> ComplianceRecord {
    ComplianceRecord {
        id: RecordId(id.to_string()),
        tenant_id: tenant_id(),
        vehicle_id: VehicleId(vehicle_id.to_string()),
        document_type,
        expiry_date,
        last_renewed_on: None,
        alert_enabled: true,
        alert_days_before: 15,
        is_draft: false,
        document: None,
        sent_reminders: Vec::new(),
        last_alert_sent_on: None,
    }
}

/// Fleet from the dashboard walkthrough: one expired insurance, one PUC
/// expiring in ten days, and a draft vehicle with a long-expired record.
pub(super) fn walkthrough_fleet() -> (Vec<Vehicle>, Vec<ComplianceRecord>) {
    let vehicles = vec![
        vehicle("v1", "MH12AB1234", false),
        vehicle("v2", "MH12CD5678", false),
        vehicle("v3", "MH14EF9012", true),
    ];
    let records = vec![
        record(
            "r1",
            "v1",
            DocumentType::Insurance,
            Some(days_from_today(-5)),
        ),
        record(
            "r2",
            "v2",
            DocumentType::PollutionCertificate,
            Some(days_from_today(10)),
        ),
        record(
            "r3",
            "v3",
            DocumentType::FitnessCertificate,
            Some(days_from_today(-100)),
        ),
    ];
    (vehicles, records)
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    tenants: Mutex<HashMap<TenantId, Tenant>>,
    vehicles: Mutex<Vec<Vehicle>>,
    records: Mutex<Vec<ComplianceRecord>>,
    automation: Mutex<HashMap<TenantId, AutomationConfig>>,
    logs: Mutex<Vec<NotificationLog>>,
}

impl MemoryRepository {
    pub(super) fn with_tenant(tenant: Tenant) -> Self {
        let repository = Self::default();
        repository
            .tenants
            .lock()
            .expect("tenant mutex poisoned")
            .insert(tenant.id.clone(), tenant);
        repository
    }

    pub(super) fn seed(&self, vehicles: Vec<Vehicle>, records: Vec<ComplianceRecord>) {
        self.vehicles
            .lock()
            .expect("vehicle mutex poisoned")
            .extend(vehicles);
        self.records
            .lock()
            .expect("record mutex poisoned")
            .extend(records);
    }

    pub(super) fn set_automation(&self, config: AutomationConfig) {
        self.automation
            .lock()
            .expect("automation mutex poisoned")
            .insert(config.tenant_id.clone(), config);
    }

    pub(super) fn push_log(&self, log: NotificationLog) {
        self.logs.lock().expect("log mutex poisoned").push(log);
    }

    pub(super) fn record_count(&self) -> usize {
        self.records.lock().expect("record mutex poisoned").len()
    }
}

impl FleetRepository for MemoryRepository {
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn tenants(&self) -> Result<Vec<Tenant>, RepositoryError> {
        let guard = self.tenants.lock().expect("tenant mutex poisoned");
        Ok(guard.values().cloned().collect())
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
            return Err(RepositoryError::NotFound);
        }
        Ok(())
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

/// Fails the first `failures` vehicle reads, then serves from the inner store.
pub(super) struct FlakyRepository {
    inner: MemoryRepository,
    failures: AtomicUsize,
    pub(super) vehicle_reads: AtomicUsize,
}

impl FlakyRepository {
    pub(super) fn new(inner: MemoryRepository, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
            vehicle_reads: AtomicUsize::new(0),
        }
    }
}

impl FleetRepository for FlakyRepository {
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        self.inner.tenant(id)
    }

    fn tenants(&self) -> Result<Vec<Tenant>, RepositoryError> {
        self.inner.tenants()
    }

    fn set_tenant_status(
        &self,
        id: &TenantId,
        status: TenantStatus,
    ) -> Result<Tenant, RepositoryError> {
        self.inner.set_tenant_status(id, status)
    }

    fn vehicles(&self, tenant_id: &TenantId) -> Result<Vec<Vehicle>, RepositoryError> {
        self.vehicle_reads.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RepositoryError::Unavailable("connection reset".to_string()));
        }
        self.inner.vehicles(tenant_id)
    }

    fn insert_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, RepositoryError> {
        self.inner.insert_vehicle(vehicle)
    }

    fn delete_vehicle(&self, tenant_id: &TenantId, id: &VehicleId) -> Result<(), RepositoryError> {
        self.inner.delete_vehicle(tenant_id, id)
    }

    fn records(&self, tenant_id: &TenantId) -> Result<Vec<ComplianceRecord>, RepositoryError> {
        self.inner.records(tenant_id)
    }

    fn upsert_record(&self, record: ComplianceRecord) -> Result<ComplianceRecord, RepositoryError> {
        self.inner.upsert_record(record)
    }

    fn delete_records_for_vehicle(
        &self,
        tenant_id: &TenantId,
        vehicle_id: &VehicleId,
    ) -> Result<usize, RepositoryError> {
        self.inner.delete_records_for_vehicle(tenant_id, vehicle_id)
    }

    fn automation_config(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<AutomationConfig>, RepositoryError> {
        self.inner.automation_config(tenant_id)
    }

    fn save_automation_config(
        &self,
        config: AutomationConfig,
    ) -> Result<AutomationConfig, RepositoryError> {
        self.inner.save_automation_config(config)
    }

    fn notification_logs(
        &self,
        tenant_id: Option<&TenantId>,
        limit: usize,
    ) -> Result<Vec<NotificationLog>, RepositoryError> {
        self.inner.notification_logs(tenant_id, limit)
    }
}

pub(super) fn build_service(
    plan: SubscriptionPlan,
) -> (FleetService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::with_tenant(tenant(plan)));
    let service = FleetService::new(repository.clone());
    (service, repository)
}

pub(super) fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
        backoff: Backoff::Fixed,
    }
}

pub(super) fn router_with_service<R>(service: FleetService<R>) -> axum::Router
where
    R: FleetRepository + 'static,
{
    let state = FleetApiState::new(Arc::new(service), quick_retry()).with_fixed_today(today());
    fleet_router(state)
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = read_body(response).await;
    serde_json::from_slice(&body).expect("json payload")
}
