use crate::compliance::domain::TenantId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Vehicles a tenant may register on the Free plan.
pub const FREE_PLAN_VEHICLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Pro,
}

impl SubscriptionPlan {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
}

impl TenantStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Suspended => "Suspended",
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Suspended,
            Self::Suspended => Self::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub owner_email: String,
    pub plan: SubscriptionPlan,
    pub status: TenantStatus,
    pub created_on: Option<NaiveDate>,
    #[serde(default)]
    pub subscription_expiry: Option<NaiveDate>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl Tenant {
    /// Plan in force on `today`: a lapsed Pro subscription falls back to Free.
    pub fn effective_plan(&self, today: NaiveDate) -> SubscriptionPlan {
        match (self.plan, self.subscription_expiry) {
            (SubscriptionPlan::Pro, Some(expiry)) if expiry < today => SubscriptionPlan::Free,
            (plan, _) => plan,
        }
    }

    /// Days left on the subscription, never negative; `None` without an expiry date.
    pub fn subscription_days_remaining(&self, today: NaiveDate) -> Option<i64> {
        self.subscription_expiry
            .map(|expiry| (expiry - today).num_days().max(0))
    }

    pub fn vehicle_limit(&self, limit: usize, today: NaiveDate) -> Option<usize> {
        match self.effective_plan(today) {
            SubscriptionPlan::Free => Some(limit),
            SubscriptionPlan::Pro => None,
        }
    }

    pub fn can_add_vehicle(&self, current_count: usize, limit: usize, today: NaiveDate) -> bool {
        self.vehicle_limit(limit, today)
            .map_or(true, |limit| current_count < limit)
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// Plan usage shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanUsage {
    pub plan: SubscriptionPlan,
    pub plan_label: &'static str,
    pub vehicle_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots_remaining: Option<usize>,
    pub at_limit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_days_remaining: Option<i64>,
}

impl PlanUsage {
    pub fn for_tenant(tenant: &Tenant, vehicle_count: usize, limit: usize, today: NaiveDate) -> Self {
        let plan = tenant.effective_plan(today);
        let vehicle_limit = tenant.vehicle_limit(limit, today);
        let slots_remaining = vehicle_limit.map(|limit| limit.saturating_sub(vehicle_count));

        Self {
            plan,
            plan_label: plan.label(),
            vehicle_count,
            vehicle_limit,
            slots_remaining,
            at_limit: slots_remaining == Some(0),
            subscription_days_remaining: match plan {
                SubscriptionPlan::Pro => tenant.subscription_days_remaining(today),
                SubscriptionPlan::Free => None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    TenantAdmin,
    TenantManager,
    TenantViewer,
}

impl UserRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Some(Self::SuperAdmin),
            "TENANT_ADMIN" => Some(Self::TenantAdmin),
            "TENANT_MANAGER" => Some(Self::TenantManager),
            "TENANT_VIEWER" => Some(Self::TenantViewer),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::TenantAdmin => "Tenant Admin",
            Self::TenantManager => "Fleet Manager",
            Self::TenantViewer => "Viewer",
        }
    }

    /// Viewers are read-only; every other role may edit fleet data.
    pub const fn can_write(self) -> bool {
        !matches!(self, Self::TenantViewer)
    }
}

/// Caller identity as established by the authentication service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub tenant_id: TenantId,
    pub role: UserRole,
}

impl Actor {
    pub fn new(tenant_id: TenantId, role: UserRole) -> Self {
        Self { tenant_id, role }
    }

    /// Super admins reach every tenant; everyone else only their own.
    pub fn can_access(&self, tenant_id: &TenantId) -> bool {
        self.role == UserRole::SuperAdmin || &self.tenant_id == tenant_id
    }
}
