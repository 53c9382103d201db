use crate::cli::ServeArgs;
use crate::filter::parse_payload;
use crate::infra::{local_tenant, AppState, InMemoryFleetRepository};
use crate::routes::with_fleet_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Local;
use fleet_compliance::compliance::{FleetApiState, FleetService, TenantId};
use fleet_compliance::config::AppConfig;
use fleet_compliance::error::AppError;
use fleet_compliance::ingest::FleetSnapshot;
use fleet_compliance::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

const LOCAL_TENANT: &str = "local";

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    if !config.backend.is_configured() {
        warn!("hosted backend not configured; serving from the in-memory store");
    }

    let today = Local::now().date_naive();
    let repository = match args.seed.take() {
        Some(path) => {
            let payload = parse_payload(&std::fs::read_to_string(&path)?)?;
            let snapshot = FleetSnapshot::from_raw(&payload);
            info!(
                vehicles = snapshot.vehicles.len(),
                records = snapshot.records.len(),
                rejected = snapshot.rejects.len(),
                flagged = snapshot.flagged.len(),
                path = %path.display(),
                "seeded in-memory store"
            );
            InMemoryFleetRepository::from_snapshot(snapshot, today)
        }
        None => InMemoryFleetRepository::default(),
    };
    repository.add_tenant(local_tenant(&TenantId(LOCAL_TENANT.to_string()), today));

    let service = Arc::new(FleetService::with_vehicle_limit(
        Arc::new(repository),
        config.limits.free_vehicle_limit,
    ));
    let fleet_state = FleetApiState::new(service, config.retry);

    let app = with_fleet_routes(fleet_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "fleet compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
