use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{
    normalize_registration, AttachedDocument, ComplianceRecord, ComplianceStatus, DocumentType,
    RecordId, TenantId, Vehicle, VehicleCategory, VehicleId, DEFAULT_ALERT_DAYS_BEFORE,
    MAX_ALERT_DAYS_BEFORE,
};
use super::export::{write_register_csv, ExportError};
use super::reminders::{
    plan_reminders, AutomationConfig, ReminderNotice, ReminderTemplate, RenderedReminder,
};
use super::report::views::{ComplianceAudit, FleetSummary, RecordStatusView};
use super::report::{aggregate, monitored_vehicle_count, record_statuses, vehicle_audit};
use super::repository::{FleetRepository, RepositoryError};
use crate::platform::PlatformOverview;
use crate::tenancy::{Actor, PlanUsage, Tenant, TenantStatus, UserRole, FREE_PLAN_VEHICLE_LIMIT};

/// Vehicle registration request as submitted from the fleet form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVehicle {
    pub registration_number: String,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub category: VehicleCategory,
    #[serde(default)]
    pub is_draft: bool,
}

/// Record edit as submitted from the vehicle detail form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub vehicle_id: VehicleId,
    pub document_type: DocumentType,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub last_renewed_on: Option<NaiveDate>,
    #[serde(default = "default_alert_enabled")]
    pub alert_enabled: bool,
    #[serde(default)]
    pub alert_days_before: Option<u32>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub document: Option<AttachedDocument>,
}

fn default_alert_enabled() -> bool {
    true
}

/// Changes submitted from the automation settings screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationUpdate {
    #[serde(default)]
    pub add_recipients: Vec<String>,
    #[serde(default)]
    pub remove_recipients: Vec<String>,
    #[serde(default)]
    pub toggle_thresholds: Vec<u32>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub email_template: Option<ReminderTemplate>,
}

/// Everything the dashboard renders for one tenant.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub tenant_id: TenantId,
    pub today: NaiveDate,
    pub summary: FleetSummary,
    pub monitored_vehicle_count: usize,
    pub expired_records: Vec<RecordStatusView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedReminder {
    pub notice: ReminderNotice,
    pub email: RenderedReminder,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderPlanView {
    pub enabled: bool,
    pub recipients: Vec<String>,
    pub reminders: Vec<PlannedReminder>,
}

/// Service composing the repository with classification, tenancy, and reminder rules.
pub struct FleetService<R> {
    repository: Arc<R>,
    vehicle_limit: usize,
    sequence: AtomicU64,
}

impl<R> FleetService<R>
where
    R: FleetRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_vehicle_limit(repository, FREE_PLAN_VEHICLE_LIMIT)
    }

    pub fn with_vehicle_limit(repository: Arc<R>, vehicle_limit: usize) -> Self {
        Self {
            repository,
            vehicle_limit,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{id:06}")
    }

    /// Next generated id not already held by a stored row.
    fn fresh_id<'a>(&self, prefix: &str, taken: impl IntoIterator<Item = &'a str>) -> String {
        let taken: HashSet<&str> = taken.into_iter().collect();
        loop {
            let candidate = self.next_id(prefix);
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
        }
    }

    fn authorize_read(&self, actor: &Actor, tenant_id: &TenantId) -> Result<(), FleetServiceError> {
        if actor.can_access(tenant_id) {
            Ok(())
        } else {
            Err(FleetServiceError::Forbidden)
        }
    }

    fn authorize_write(&self, actor: &Actor, tenant_id: &TenantId) -> Result<(), FleetServiceError> {
        self.authorize_read(actor, tenant_id)?;
        if actor.role.can_write() {
            Ok(())
        } else {
            Err(FleetServiceError::ReadOnly)
        }
    }

    /// Vehicles and records of a tenant as currently persisted.
    pub fn snapshot(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
    ) -> Result<(Vec<Vehicle>, Vec<ComplianceRecord>), FleetServiceError> {
        self.authorize_read(actor, tenant_id)?;
        let vehicles = self.repository.vehicles(tenant_id)?;
        let records = self.repository.records(tenant_id)?;
        Ok((vehicles, records))
    }

    /// Register a vehicle, enforcing plan limits and per-tenant registration uniqueness.
    pub fn register_vehicle(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        request: NewVehicle,
        today: NaiveDate,
    ) -> Result<Vehicle, FleetServiceError> {
        self.authorize_write(actor, tenant_id)?;

        let tenant = self
            .repository
            .tenant(tenant_id)?
            .ok_or(FleetServiceError::TenantNotFound)?;
        if !tenant.is_active() {
            return Err(FleetServiceError::TenantSuspended);
        }

        let registration_number = normalize_registration(&request.registration_number);
        if registration_number.is_empty() {
            return Err(FleetServiceError::InvalidRegistration);
        }

        let existing = self.repository.vehicles(tenant_id)?;
        if !tenant.can_add_vehicle(existing.len(), self.vehicle_limit, today) {
            return Err(FleetServiceError::PlanLimitReached {
                limit: self.vehicle_limit,
            });
        }
        if existing
            .iter()
            .any(|vehicle| vehicle.registration_number == registration_number)
        {
            return Err(FleetServiceError::DuplicateRegistration(registration_number));
        }

        let id = self.fresh_id("veh", existing.iter().map(|vehicle| vehicle.id.0.as_str()));
        let vehicle = Vehicle {
            id: VehicleId(id),
            tenant_id: tenant_id.clone(),
            registration_number,
            make: request.make.trim().to_string(),
            model: request.model.trim().to_string(),
            year: request.year,
            category: request.category,
            added_on: Some(today),
            is_draft: request.is_draft,
        };

        let stored = self.repository.insert_vehicle(vehicle)?;
        info!(tenant = %tenant_id.0, vehicle = %stored.id.0, registration = %stored.registration_number, "vehicle registered");
        Ok(stored)
    }

    /// Create or replace the record for a (vehicle, document type) pair.
    ///
    /// Replacing keeps the record id; reminders already sent are cleared when the
    /// expiry date changes.
    pub fn upsert_record(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        draft: RecordDraft,
    ) -> Result<ComplianceRecord, FleetServiceError> {
        self.authorize_write(actor, tenant_id)?;

        let vehicles = self.repository.vehicles(tenant_id)?;
        if !vehicles.iter().any(|vehicle| vehicle.id == draft.vehicle_id) {
            return Err(FleetServiceError::VehicleNotFound(draft.vehicle_id.0));
        }

        // An unrecognized document type has nothing to track an expiry against.
        let expiry_date = match draft.document_type {
            DocumentType::Unrecognized => None,
            _ => draft.expiry_date,
        };

        let records = self.repository.records(tenant_id)?;
        let existing = records.iter().find(|record| {
            record.vehicle_id == draft.vehicle_id && record.document_type == draft.document_type
        });

        let (id, sent_reminders, last_alert_sent_on) = match existing {
            Some(current) if current.expiry_date == expiry_date => (
                current.id.clone(),
                current.sent_reminders.clone(),
                current.last_alert_sent_on,
            ),
            Some(current) => (current.id.clone(), Vec::new(), None),
            None => (
                RecordId(self.fresh_id("rec", records.iter().map(|record| record.id.0.as_str()))),
                Vec::new(),
                None,
            ),
        };

        let record = ComplianceRecord {
            id,
            tenant_id: tenant_id.clone(),
            vehicle_id: draft.vehicle_id,
            document_type: draft.document_type,
            expiry_date,
            last_renewed_on: draft.last_renewed_on,
            alert_enabled: draft.alert_enabled,
            alert_days_before: draft
                .alert_days_before
                .filter(|days| *days > 0)
                .map_or(DEFAULT_ALERT_DAYS_BEFORE, |days| days.min(MAX_ALERT_DAYS_BEFORE)),
            is_draft: draft.is_draft,
            document: draft.document,
            sent_reminders,
            last_alert_sent_on,
        };

        let stored = self.repository.upsert_record(record)?;
        debug!(tenant = %tenant_id.0, record = %stored.id.0, "compliance record saved");
        Ok(stored)
    }

    /// Delete a vehicle together with its records. Records go first so a failure
    /// never leaves records pointing at a removed vehicle.
    pub fn delete_vehicle(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        vehicle_id: &VehicleId,
    ) -> Result<usize, FleetServiceError> {
        self.authorize_write(actor, tenant_id)?;

        let vehicles = self.repository.vehicles(tenant_id)?;
        if !vehicles.iter().any(|vehicle| &vehicle.id == vehicle_id) {
            return Err(FleetServiceError::VehicleNotFound(vehicle_id.0.clone()));
        }

        let removed = self
            .repository
            .delete_records_for_vehicle(tenant_id, vehicle_id)?;
        self.repository.delete_vehicle(tenant_id, vehicle_id)?;

        info!(tenant = %tenant_id.0, vehicle = %vehicle_id.0, removed_records = removed, "vehicle deleted");
        Ok(removed)
    }

    pub fn dashboard(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        today: NaiveDate,
    ) -> Result<DashboardView, FleetServiceError> {
        let (vehicles, records) = self.snapshot(actor, tenant_id)?;
        let summary = aggregate(&vehicles, &records, today);

        let expired_records = record_statuses(&vehicles, &records, today)
            .into_iter()
            .filter(|view| {
                matches!(
                    view.status,
                    ComplianceStatus::Critical | ComplianceStatus::Missing
                )
            })
            .collect();

        let plan = self
            .repository
            .tenant(tenant_id)?
            .map(|tenant| PlanUsage::for_tenant(&tenant, vehicles.len(), self.vehicle_limit, today));

        Ok(DashboardView {
            tenant_id: tenant_id.clone(),
            today,
            monitored_vehicle_count: monitored_vehicle_count(&vehicles, &records),
            summary,
            expired_records,
            plan,
        })
    }

    pub fn vehicle_audit(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        vehicle_id: &VehicleId,
        today: NaiveDate,
    ) -> Result<ComplianceAudit, FleetServiceError> {
        let (vehicles, records) = self.snapshot(actor, tenant_id)?;
        let vehicle = vehicles
            .iter()
            .find(|vehicle| &vehicle.id == vehicle_id)
            .ok_or_else(|| FleetServiceError::VehicleNotFound(vehicle_id.0.clone()))?;

        Ok(vehicle_audit(vehicle, &records, today))
    }

    pub fn export_csv<W: Write>(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        today: NaiveDate,
        writer: W,
    ) -> Result<usize, FleetServiceError> {
        let (vehicles, records) = self.snapshot(actor, tenant_id)?;
        Ok(write_register_csv(writer, &vehicles, &records, today)?)
    }

    /// Reminders due today with their rendered e-mails. Nothing is sent from here.
    pub fn reminder_plan(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        today: NaiveDate,
    ) -> Result<ReminderPlanView, FleetServiceError> {
        let (vehicles, records) = self.snapshot(actor, tenant_id)?;
        let config = self
            .repository
            .automation_config(tenant_id)?
            .unwrap_or_else(|| AutomationConfig::new(tenant_id.clone()));

        let template = config.template();
        let reminders = plan_reminders(&config, &vehicles, &records, today)
            .into_iter()
            .map(|notice| PlannedReminder {
                email: template.render(&notice),
                notice,
            })
            .collect();

        Ok(ReminderPlanView {
            enabled: config.enabled,
            recipients: config.recipients,
            reminders,
        })
    }

    /// Apply automation settings changes. Invalid or duplicate recipients are skipped.
    pub fn update_automation(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        update: AutomationUpdate,
    ) -> Result<AutomationConfig, FleetServiceError> {
        self.authorize_write(actor, tenant_id)?;

        let mut config = self
            .repository
            .automation_config(tenant_id)?
            .unwrap_or_else(|| AutomationConfig::new(tenant_id.clone()));

        for email in &update.remove_recipients {
            config.remove_recipient(email);
        }
        for email in &update.add_recipients {
            if !config.add_recipient(email) {
                debug!(tenant = %tenant_id.0, recipient = %email, "recipient skipped");
            }
        }
        for days in update.toggle_thresholds {
            config.toggle_threshold(days);
        }
        if let Some(enabled) = update.enabled {
            config.enabled = enabled;
        }
        if let Some(template) = update.email_template {
            config.email_template = Some(template);
        }

        let stored = self.repository.save_automation_config(config)?;
        info!(
            tenant = %tenant_id.0,
            recipients = stored.recipients.len(),
            enabled = stored.enabled,
            "automation settings saved"
        );
        Ok(stored)
    }

    /// Suspend or reactivate a tenant. Without an explicit status the current one is flipped.
    pub fn set_tenant_status(
        &self,
        actor: &Actor,
        tenant_id: &TenantId,
        status: Option<TenantStatus>,
    ) -> Result<Tenant, FleetServiceError> {
        if actor.role != UserRole::SuperAdmin {
            return Err(FleetServiceError::Forbidden);
        }

        let tenant = self
            .repository
            .tenant(tenant_id)?
            .ok_or(FleetServiceError::TenantNotFound)?;
        let status = status.unwrap_or_else(|| tenant.status.toggled());

        let updated = self.repository.set_tenant_status(tenant_id, status)?;
        info!(tenant = %tenant_id.0, status = updated.status.label(), "tenant status changed");
        Ok(updated)
    }

    /// Platform totals for super admins.
    pub fn platform_overview(
        &self,
        actor: &Actor,
        today: NaiveDate,
    ) -> Result<PlatformOverview, FleetServiceError> {
        if actor.role != UserRole::SuperAdmin {
            return Err(FleetServiceError::Forbidden);
        }

        let tenants = self.repository.tenants()?;
        let logs = self.repository.notification_logs(None, PLATFORM_LOG_LIMIT)?;
        Ok(PlatformOverview::from_parts(&tenants, &logs, today))
    }
}

const PLATFORM_LOG_LIMIT: usize = 200;

/// Error raised by the fleet service.
#[derive(Debug, thiserror::Error)]
pub enum FleetServiceError {
    #[error("caller may not access this tenant")]
    Forbidden,
    #[error("caller has read-only access")]
    ReadOnly,
    #[error("tenant not found")]
    TenantNotFound,
    #[error("tenant is suspended")]
    TenantSuspended,
    #[error("vehicle {0} not found")]
    VehicleNotFound(String),
    #[error("registration number must not be empty")]
    InvalidRegistration,
    #[error("vehicle {0} is already registered")]
    DuplicateRegistration(String),
    #[error("free plan is limited to {limit} vehicles; upgrade to Pro to add more")]
    PlanLimitReached { limit: usize },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl FleetServiceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Repository(err) if err.is_transient())
    }
}
