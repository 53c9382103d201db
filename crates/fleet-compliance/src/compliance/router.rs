use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::{TenantId, VehicleId};
use super::repository::{FleetRepository, RepositoryError};
use super::service::{AutomationUpdate, FleetService, FleetServiceError, NewVehicle, RecordDraft};
use super::{summarize_payload, SummaryReport};
use crate::error::AppError;
use crate::ingest::RawFleetPayload;
use crate::retry::RetryPolicy;
use crate::tenancy::{Actor, TenantStatus, UserRole};

/// Header carrying the caller's role, set by the authenticating gateway.
pub const ROLE_HEADER: &str = "x-fleet-role";
/// Header carrying the caller's tenant. Without it only super admins get through.
pub const TENANT_HEADER: &str = "x-fleet-tenant";

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Shared state for the fleet endpoints.
pub struct FleetApiState<R> {
    pub service: Arc<FleetService<R>>,
    pub retry: RetryPolicy,
    clock: Clock,
}

impl<R> Clone for FleetApiState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            retry: self.retry,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<R> FleetApiState<R>
where
    R: FleetRepository + 'static,
{
    pub fn new(service: Arc<FleetService<R>>, retry: RetryPolicy) -> Self {
        Self {
            service,
            retry,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Pin "today" to a fixed date.
    pub fn with_fixed_today(mut self, today: NaiveDate) -> Self {
        self.clock = Arc::new(move || today);
        self
    }

    fn today(&self) -> NaiveDate {
        (self.clock)()
    }
}

/// Router builder exposing the fleet compliance endpoints.
pub fn fleet_router<R>(state: FleetApiState<R>) -> Router
where
    R: FleetRepository + 'static,
{
    Router::new()
        .route("/api/v1/compliance/summary", post(summary_handler))
        .route(
            "/api/v1/tenants/:tenant_id/dashboard",
            get(dashboard_handler::<R>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/vehicles",
            post(register_vehicle_handler::<R>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/vehicles/:vehicle_id",
            delete(delete_vehicle_handler::<R>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/vehicles/:vehicle_id/audit",
            get(audit_handler::<R>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/records",
            put(upsert_record_handler::<R>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/reminders",
            get(reminders_handler::<R>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/export.csv",
            get(export_handler::<R>),
        )
        .route(
            "/api/v1/tenants/:tenant_id/automation",
            put(automation_handler::<R>),
        )
        .route("/api/v1/platform/overview", get(platform_handler::<R>))
        .route(
            "/api/v1/platform/tenants/:tenant_id/status",
            put(tenant_status_handler::<R>),
        )
        .with_state(state)
}

/// Resolve the caller from gateway headers. Unknown or absent roles are read-only;
/// an absent tenant belongs to no tenant at all.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Actor {
    let role = headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(UserRole::parse)
        .unwrap_or(UserRole::TenantViewer);
    let tenant_id = headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| TenantId(value.trim().to_string()))
        .unwrap_or_else(|| TenantId(String::new()));
    Actor::new(tenant_id, role)
}

pub(crate) fn error_response(error: FleetServiceError) -> Response {
    let status = match &error {
        FleetServiceError::Forbidden | FleetServiceError::ReadOnly => StatusCode::FORBIDDEN,
        FleetServiceError::TenantNotFound | FleetServiceError::VehicleNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        FleetServiceError::TenantSuspended => StatusCode::LOCKED,
        FleetServiceError::InvalidRegistration => StatusCode::UNPROCESSABLE_ENTITY,
        FleetServiceError::DuplicateRegistration(_) => StatusCode::CONFLICT,
        FleetServiceError::PlanLimitReached { .. } => StatusCode::PAYMENT_REQUIRED,
        FleetServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        FleetServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        FleetServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        FleetServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryRequest {
    #[serde(default)]
    pub(crate) today: Option<NaiveDate>,
    #[serde(flatten)]
    pub(crate) payload: RawFleetPayload,
}

pub(crate) async fn summary_handler(Json(request): Json<SummaryRequest>) -> Json<SummaryReport> {
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    Json(summarize_payload(&request.payload, today))
}

pub(crate) async fn dashboard_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let actor = actor_from_headers(&headers);
    let today = state.today();

    let view = state
        .retry
        .run(
            || state.service.dashboard(&actor, &tenant_id, today),
            FleetServiceError::is_transient,
        )
        .await?;

    Ok((StatusCode::OK, Json(view)).into_response())
}

pub(crate) async fn register_vehicle_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<NewVehicle>,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let actor = actor_from_headers(&headers);

    let vehicle = state
        .service
        .register_vehicle(&actor, &tenant_id, request, state.today())?;
    Ok((StatusCode::CREATED, Json(vehicle)).into_response())
}

pub(crate) async fn delete_vehicle_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path((tenant_id, vehicle_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let vehicle_id = VehicleId(vehicle_id);
    let actor = actor_from_headers(&headers);

    let removed_records = state
        .service
        .delete_vehicle(&actor, &tenant_id, &vehicle_id)?;
    let payload = json!({
        "vehicle_id": vehicle_id.0,
        "removed_records": removed_records,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

pub(crate) async fn upsert_record_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    Json(draft): Json<RecordDraft>,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let actor = actor_from_headers(&headers);

    let record = state.service.upsert_record(&actor, &tenant_id, draft)?;
    Ok((StatusCode::OK, Json(record)).into_response())
}

pub(crate) async fn audit_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path((tenant_id, vehicle_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let vehicle_id = VehicleId(vehicle_id);
    let actor = actor_from_headers(&headers);

    let audit = state
        .service
        .vehicle_audit(&actor, &tenant_id, &vehicle_id, state.today())?;
    Ok((StatusCode::OK, Json(audit)).into_response())
}

pub(crate) async fn reminders_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let actor = actor_from_headers(&headers);

    let plan = state
        .service
        .reminder_plan(&actor, &tenant_id, state.today())?;
    Ok((StatusCode::OK, Json(plan)).into_response())
}

pub(crate) async fn export_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let actor = actor_from_headers(&headers);
    let mut buffer = Vec::new();

    state
        .service
        .export_csv(&actor, &tenant_id, state.today(), &mut buffer)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref())],
        buffer,
    )
        .into_response())
}

pub(crate) async fn platform_handler<R>(
    State(state): State<FleetApiState<R>>,
    headers: HeaderMap,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let actor = actor_from_headers(&headers);

    let overview = state.service.platform_overview(&actor, state.today())?;
    Ok((StatusCode::OK, Json(overview)).into_response())
}

pub(crate) async fn automation_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<AutomationUpdate>,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let actor = actor_from_headers(&headers);

    let config = state.service.update_automation(&actor, &tenant_id, update)?;
    Ok((StatusCode::OK, Json(config)).into_response())
}

/// Body of a tenant status change; omitting `status` flips the current one.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TenantStatusRequest {
    #[serde(default)]
    pub(crate) status: Option<TenantStatus>,
}

pub(crate) async fn tenant_status_handler<R>(
    State(state): State<FleetApiState<R>>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<TenantStatusRequest>,
) -> Result<Response, AppError>
where
    R: FleetRepository + 'static,
{
    let tenant_id = TenantId(tenant_id);
    let actor = actor_from_headers(&headers);

    let tenant = state
        .service
        .set_tenant_status(&actor, &tenant_id, request.status)?;
    Ok((StatusCode::OK, Json(tenant)).into_response())
}
