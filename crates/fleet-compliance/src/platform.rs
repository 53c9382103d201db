//! Super-admin overview across every tenant on the platform.

use crate::compliance::domain::TenantId;
use crate::tenancy::{SubscriptionPlan, Tenant, TenantStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

/// One reminder delivery attempt as recorded by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLog {
    pub id: String,
    pub tenant_id: TenantId,
    pub vehicle_registration: String,
    pub document_label: String,
    pub recipient: String,
    pub status: NotificationStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlatformOverview {
    pub total_tenants: usize,
    pub active_tenants: usize,
    pub suspended_tenants: usize,
    pub pro_tenants: usize,
    pub free_tenants: usize,
    pub notifications_sent: usize,
    pub notifications_failed: usize,
}

impl PlatformOverview {
    /// Plans are counted as in force on `today`, so lapsed Pro tenants count as Free.
    pub fn from_parts(tenants: &[Tenant], logs: &[NotificationLog], today: NaiveDate) -> Self {
        let mut overview = Self {
            total_tenants: tenants.len(),
            ..Self::default()
        };

        for tenant in tenants {
            match tenant.status {
                TenantStatus::Active => overview.active_tenants += 1,
                TenantStatus::Suspended => overview.suspended_tenants += 1,
            }
            match tenant.effective_plan(today) {
                SubscriptionPlan::Pro => overview.pro_tenants += 1,
                SubscriptionPlan::Free => overview.free_tenants += 1,
            }
        }

        for log in logs {
            match log.status {
                NotificationStatus::Sent => overview.notifications_sent += 1,
                NotificationStatus::Failed => overview.notifications_failed += 1,
            }
        }

        overview
    }
}
