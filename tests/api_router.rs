//! HTTP-level tests for the console's API router, driven with tower's
//! `oneshot` so no listener is needed.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use certrack::registry::{api_router, ComplianceService, MemoryStore};

const ADMIN_EMAIL: &str = "admin@sistema.com";
const ADMIN_PASSWORD: &str = "admin123";

fn build_router() -> axum::Router {
    let service = Arc::new(ComplianceService::new(Arc::new(MemoryStore::new())));
    service.ensure_default_admin().expect("seed admin");
    api_router(service)
}

async fn login(router: &axum::Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({
                "email": ADMIN_EMAIL,
                "password": ADMIN_PASSWORD,
            }))
            .expect("serialize"),
        ))
        .expect("request");

    let response = router.clone().oneshot(request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    payload["token"].as_str().expect("token").to_string()
}

fn employee_payload(name: &str) -> Value {
    json!({
        "name": name,
        "tax_id": "123.456.789-00",
        "birth_date": "1990-05-20",
        "hire_date": "2021-03-01",
        "job_title": "Eletricista",
        "department": "Manutenção",
        "company": "Acme Industrial",
        "status": "active",
    })
}

#[tokio::test]
async fn login_issues_a_bearer_token() {
    let router = build_router();
    let token = login(&router).await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn bad_credentials_get_unauthorized() {
    let router = build_router();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_vec(&json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
                .expect("serialize"),
        ))
        .expect("request");

    let response = router.oneshot(request).await.expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let router = build_router();
    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/employees")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn employee_crud_round_trip() {
    let router = build_router();
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/employees")
                .header("content-type", "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::to_vec(&employee_payload("Ana")).expect("serialize"),
                ))
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let created: Value = serde_json::from_slice(&body).expect("json");
    let id = created["id"].as_str().expect("id").to_string();
    assert_eq!(created["created_at"], created["updated_at"]);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/employees/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/employees/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/v1/employees/{id}"))
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn certificate_listing_carries_assessment_for_reference_date() {
    let router = build_router();
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/employees")
                .header("content-type", "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::to_vec(&employee_payload("Ana")).expect("serialize"),
                ))
                .expect("request"),
        )
        .await
        .expect("dispatch");
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let employee: Value = serde_json::from_slice(&body).expect("json");

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/certificates")
                .header("content-type", "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from(
                    serde_json::to_vec(&json!({
                        "employee_id": employee["id"],
                        "kind": "nr10",
                        "number": "2024-001",
                        "expiry_date": "2024-01-31",
                        "issuing_authority": "SENAI",
                        "status": "valid",
                    }))
                    .expect("serialize"),
                ))
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/certificates?reference_date=2024-01-01")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let views: Value = serde_json::from_slice(&body).expect("json");
    let view = &views.as_array().expect("array")[0];
    assert_eq!(view["employee_name"], "Ana");
    assert_eq!(view["assessment"]["status"], "expiring_soon");
    assert_eq!(view["assessment"]["days_remaining"], 30);
}

#[tokio::test]
async fn report_download_is_bom_prefixed_csv_with_fixed_filename() {
    let router = build_router();
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/reports/upcoming_expiries?reference_date=2024-01-01")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok()),
        Some("attachment; filename=\"relatorio_vencimentos.csv\"")
    );

    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    assert_eq!(&body[..3], b"\xEF\xBB\xBF");
    let text = String::from_utf8(body[3..].to_vec()).expect("utf-8");
    assert!(text.starts_with("\"Funcionário\""));
}

#[tokio::test]
async fn unknown_report_kind_is_not_found() {
    let router = build_router();
    let token = login(&router).await;

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/reports/payroll")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_is_deterministic_for_a_reference_date() {
    let router = build_router();
    let token = login(&router).await;

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/dashboard?reference_date=2024-01-01")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let summary: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(summary["total_employees"], 0);
    assert_eq!(summary["total_certificates"], 0);
}
