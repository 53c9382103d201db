use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower::ServiceExt;

use axum::response::IntoResponse;

use crate::compliance::router::{dashboard_handler, FleetApiState, ROLE_HEADER, TENANT_HEADER};
use crate::compliance::service::FleetService;
use crate::tenancy::SubscriptionPlan;

fn member_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(TENANT_HEADER, HeaderValue::from_static("tenant-north"));
    headers
}

#[tokio::test]
async fn dashboard_route_returns_summary() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    let (vehicles, records) = walkthrough_fleet();
    repository.seed(vehicles, records);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/tenants/tenant-north/dashboard")
                .header(TENANT_HEADER, "tenant-north")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["summary"]["expired_count"], json!(1));
    assert_eq!(payload["summary"]["expiring_soon_count"], json!(1));
    assert_eq!(payload["summary"]["draft_count"], json!(1));
    assert_eq!(payload["summary"]["fleet_health_pct"], json!(0));
    assert_eq!(payload["today"], json!("2025-03-10"));
}

#[tokio::test]
async fn dashboard_handler_retries_transient_failures() {
    let inner = MemoryRepository::with_tenant(tenant(SubscriptionPlan::Pro));
    let (vehicles, records) = walkthrough_fleet();
    inner.seed(vehicles, records);
    let repository = Arc::new(FlakyRepository::new(inner, 2));
    let service = Arc::new(FleetService::new(repository.clone()));
    let state = FleetApiState::new(service, quick_retry()).with_fixed_today(today());

    let response = dashboard_handler::<FlakyRepository>(
        State(state),
        Path("tenant-north".to_string()),
        member_headers(),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(repository.vehicle_reads.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn dashboard_handler_gives_up_after_attempt_budget() {
    let inner = MemoryRepository::with_tenant(tenant(SubscriptionPlan::Pro));
    let repository = Arc::new(FlakyRepository::new(inner, 10));
    let service = Arc::new(FleetService::new(repository.clone()));
    let state = FleetApiState::new(service, quick_retry()).with_fixed_today(today());

    let response = dashboard_handler::<FlakyRepository>(
        State(state),
        Path("tenant-north".to_string()),
        member_headers(),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(repository.vehicle_reads.load(Ordering::SeqCst), 3);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("unavailable"));
}

#[tokio::test]
async fn viewer_cannot_register_vehicles() {
    let (service, _) = build_service(SubscriptionPlan::Pro);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/tenants/tenant-north/vehicles")
                .header(TENANT_HEADER, "tenant-north")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "registration_number": "MH12AB1234",
                        "make": "Tata",
                        "model": "Ace",
                        "year": 2020,
                        "category": "truck"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_route_maps_plan_limit_to_payment_required() {
    let (service, repository) = build_service(SubscriptionPlan::Free);
    repository.seed(
        (0..5)
            .map(|n| vehicle(&format!("v{n}"), &format!("KA01AA000{n}"), false))
            .collect(),
        Vec::new(),
    );
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/tenants/tenant-north/vehicles")
                .header(TENANT_HEADER, "tenant-north")
                .header(header::CONTENT_TYPE, "application/json")
                .header(ROLE_HEADER, "TENANT_MANAGER")
                .body(Body::from(
                    json!({
                        "registration_number": "KA01AA0099",
                        "make": "Eicher",
                        "model": "Pro 2049",
                        "year": 2023,
                        "category": "lorry"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    repository.seed(vec![vehicle("v1", "MH12AB1234", false)], Vec::new());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/tenants/tenant-north/vehicles")
                .header(TENANT_HEADER, "tenant-north")
                .header(header::CONTENT_TYPE, "application/json")
                .header(ROLE_HEADER, "tenant_admin")
                .body(Body::from(
                    json!({
                        "registration_number": "mh12ab1234",
                        "make": "Tata",
                        "model": "Ace",
                        "year": 2020,
                        "category": "truck"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn record_upsert_then_audit() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    repository.seed(vec![vehicle("v1", "MH12AB1234", false)], Vec::new());
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::put("/api/v1/tenants/tenant-north/records")
                .header(TENANT_HEADER, "tenant-north")
                .header(header::CONTENT_TYPE, "application/json")
                .header(ROLE_HEADER, "TENANT_ADMIN")
                .body(Body::from(
                    json!({
                        "vehicle_id": "v1",
                        "document_type": "insurance",
                        "expiry_date": "2025-03-25"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let saved = read_json_body(response).await;
    assert_eq!(saved["alert_days_before"], json!(15));

    let response = router
        .oneshot(
            Request::get("/api/v1/tenants/tenant-north/vehicles/v1/audit")
                .header(TENANT_HEADER, "tenant-north")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let audit = read_json_body(response).await;
    assert_eq!(audit["level"], json!("warning"));
}

#[tokio::test]
async fn delete_route_reports_removed_records() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    let (vehicles, records) = walkthrough_fleet();
    repository.seed(vehicles, records);
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::delete("/api/v1/tenants/tenant-north/vehicles/v2")
                .header(TENANT_HEADER, "tenant-north")
                .header(ROLE_HEADER, "TENANT_ADMIN")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["removed_records"], json!(1));

    let response = router
        .oneshot(
            Request::delete("/api/v1/tenants/tenant-north/vehicles/v2")
                .header(TENANT_HEADER, "tenant-north")
                .header(ROLE_HEADER, "TENANT_ADMIN")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_route_serves_csv() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    let (vehicles, records) = walkthrough_fleet();
    repository.seed(vehicles, records);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/tenants/tenant-north/export.csv")
                .header(TENANT_HEADER, "tenant-north")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE),
        Some(&HeaderValue::from_static("text/csv; charset=utf-8"))
    );
    let body = String::from_utf8(read_body(response).await).expect("utf8");
    assert!(body.starts_with("\"Registration Number\""));
    assert!(body.contains("\"Expiring Soon\""));
}

#[tokio::test]
async fn reminders_route_lists_due_notices() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    let (vehicles, records) = walkthrough_fleet();
    repository.seed(vehicles, records);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/tenants/tenant-north/reminders")
                .header(TENANT_HEADER, "tenant-north")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["reminders"][0]["notice"]["threshold_days"], json!(15));
}

#[tokio::test]
async fn cross_tenant_header_is_forbidden() {
    let (service, _) = build_service(SubscriptionPlan::Pro);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/tenants/tenant-north/dashboard")
                .header(TENANT_HEADER, "tenant-south")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn summary_route_is_stateless() {
    let (service, _) = build_service(SubscriptionPlan::Pro);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/compliance/summary")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "today": "2025-03-10",
                        "vehicles": [
                            { "id": "v1", "tenant_id": "t", "registration_number": "MH12AB1234", "type": "Bus" }
                        ],
                        "records": [
                            { "id": "r1", "tenant_id": "t", "vehicle_id": "v1", "type": "PUC", "expiry_date": "2025-06-30" }
                        ]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["summary"]["fleet_health_pct"], json!(100));
    assert_eq!(payload["monitored_vehicle_count"], json!(1));
    assert_eq!(payload["rejects"], json!([]));
}

#[tokio::test]
async fn request_without_tenant_header_is_forbidden() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    let (vehicles, records) = walkthrough_fleet();
    repository.seed(vehicles, records);
    let router = router_with_service(service);

    for uri in [
        "/api/v1/tenants/tenant-north/dashboard",
        "/api/v1/tenants/tenant-north/vehicles/v1/audit",
        "/api/v1/tenants/tenant-north/export.csv",
    ] {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn automation_route_feeds_reminder_recipients() {
    let (service, repository) = build_service(SubscriptionPlan::Pro);
    let (vehicles, records) = walkthrough_fleet();
    repository.seed(vehicles, records);
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::put("/api/v1/tenants/tenant-north/automation")
                .header(TENANT_HEADER, "tenant-north")
                .header(ROLE_HEADER, "TENANT_MANAGER")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "add_recipients": ["dispatch@northhaulage.test", "not-an-address"],
                        "toggle_thresholds": [60]
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let saved = read_json_body(response).await;
    assert_eq!(saved["recipients"], json!(["dispatch@northhaulage.test"]));
    assert_eq!(saved["default_thresholds"], json!([60, 30, 15, 7, 3, 1]));

    let response = router
        .oneshot(
            Request::get("/api/v1/tenants/tenant-north/reminders")
                .header(TENANT_HEADER, "tenant-north")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let plan = read_json_body(response).await;
    assert_eq!(plan["recipients"], json!(["dispatch@northhaulage.test"]));
}

#[tokio::test]
async fn viewers_cannot_change_automation() {
    let (service, _) = build_service(SubscriptionPlan::Pro);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::put("/api/v1/tenants/tenant-north/automation")
                .header(TENANT_HEADER, "tenant-north")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "enabled": false }).to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn super_admin_suspends_tenant_and_writes_are_locked() {
    let (service, _) = build_service(SubscriptionPlan::Pro);
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::put("/api/v1/platform/tenants/tenant-north/status")
                .header(TENANT_HEADER, "tenant-north")
                .header(ROLE_HEADER, "TENANT_ADMIN")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = router
        .clone()
        .oneshot(
            Request::put("/api/v1/platform/tenants/tenant-north/status")
                .header(ROLE_HEADER, "SUPER_ADMIN")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let tenant = read_json_body(response).await;
    assert_eq!(tenant["status"], json!("suspended"));

    let response = router
        .oneshot(
            Request::post("/api/v1/tenants/tenant-north/vehicles")
                .header(TENANT_HEADER, "tenant-north")
                .header(ROLE_HEADER, "TENANT_ADMIN")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "registration_number": "MH12AB1234",
                        "make": "Tata",
                        "model": "Ace",
                        "year": 2020,
                        "category": "truck"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::LOCKED);
}

#[tokio::test]
async fn unknown_tenant_status_change_is_not_found() {
    let (service, _) = build_service(SubscriptionPlan::Pro);
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::put("/api/v1/platform/tenants/tenant-ghost/status")
                .header(ROLE_HEADER, "SUPER_ADMIN")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "status": "active" }).to_string()))
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
