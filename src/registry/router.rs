use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::domain::{
    CertificateId, CertificatePatch, EmployeeId, EmployeePatch, NewCertificate, NewEmployee,
    UserId,
};
use super::report::{ReportFilter, ReportKind};
use super::service::{
    ComplianceService, CreateUserRequest, ServiceError, SessionContext, SessionToken,
    UpdateUserRequest,
};
use super::status::ExpiryStatus;
use super::store::{EntityStore, StoreError};

/// Router builder exposing the console's HTTP surface.
pub fn api_router<S>(service: Arc<ComplianceService<S>>) -> Router
where
    S: EntityStore + 'static,
{
    Router::new()
        .route("/api/v1/auth/login", axum::routing::post(login_handler::<S>))
        .route(
            "/api/v1/auth/logout",
            axum::routing::post(logout_handler::<S>),
        )
        .route(
            "/api/v1/employees",
            get(list_employees_handler::<S>).post(create_employee_handler::<S>),
        )
        .route(
            "/api/v1/employees/:id",
            get(get_employee_handler::<S>)
                .put(update_employee_handler::<S>)
                .delete(delete_employee_handler::<S>),
        )
        .route(
            "/api/v1/certificates",
            get(list_certificates_handler::<S>).post(create_certificate_handler::<S>),
        )
        .route(
            "/api/v1/certificates/:id",
            get(get_certificate_handler::<S>)
                .put(update_certificate_handler::<S>)
                .delete(delete_certificate_handler::<S>),
        )
        .route(
            "/api/v1/users",
            get(list_users_handler::<S>).post(create_user_handler::<S>),
        )
        .route(
            "/api/v1/users/:id",
            axum::routing::put(update_user_handler::<S>).delete(delete_user_handler::<S>),
        )
        .route("/api/v1/dashboard", get(dashboard_handler::<S>))
        .route("/api/v1/reports/:kind", get(report_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

/// Reference date override so temporal endpoints stay deterministic in tests
/// and reproducible in support sessions; defaults to today.
#[derive(Debug, Default, Deserialize)]
struct TemporalQuery {
    reference_date: Option<NaiveDate>,
}

impl TemporalQuery {
    fn resolve(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ReportQuery {
    company: Option<String>,
    employee_status: Option<super::domain::EmployeeStatus>,
    expiry_status: Option<ExpiryStatus>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    reference_date: Option<NaiveDate>,
}

impl ReportQuery {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            company: self.company.clone(),
            employee_status: self.employee_status,
            expiry_status: self.expiry_status,
            from: self.from,
            to: self.to,
        }
    }

    fn resolve(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

fn error_response(error: ServiceError) -> Response {
    let status = match &error {
        ServiceError::InvalidCredentials | ServiceError::Unauthenticated => {
            StatusCode::UNAUTHORIZED
        }
        ServiceError::Forbidden => StatusCode::FORBIDDEN,
        ServiceError::Validation(_) | ServiceError::SelfDeletion => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Store(StoreError::Corrupt(_))
        | ServiceError::Credential(_)
        | ServiceError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, Json(payload)).into_response()
}

fn not_found(entity: &str) -> Response {
    let payload = json!({ "error": format!("{entity} not found") });
    (StatusCode::NOT_FOUND, Json(payload)).into_response()
}

fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| token.trim().parse().ok())
}

fn authenticate<S>(
    service: &ComplianceService<S>,
    headers: &HeaderMap,
) -> Result<SessionContext, Response>
where
    S: EntityStore + 'static,
{
    let token = bearer_token(headers).ok_or_else(|| error_response(ServiceError::Unauthenticated))?;
    service.session(token).map_err(error_response)
}

async fn login_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    Json(request): Json<LoginRequest>,
) -> Response
where
    S: EntityStore + 'static,
{
    match service.login(&request.email, &request.password) {
        Ok((token, user)) => {
            let payload = json!({ "token": token, "user": user });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn logout_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
{
    match bearer_token(&headers) {
        Some(token) => {
            service.logout(token);
            StatusCode::NO_CONTENT.into_response()
        }
        None => error_response(ServiceError::Unauthenticated),
    }
}

async fn list_employees_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.employees(&ctx) {
        Ok(employees) => (StatusCode::OK, Json(employees)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_employee_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Json(new): Json<NewEmployee>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.create_employee(&ctx, new) {
        Ok(employee) => (StatusCode::CREATED, Json(employee)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn get_employee_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.employee(&ctx, EmployeeId(id)) {
        Ok(Some(employee)) => (StatusCode::OK, Json(employee)).into_response(),
        Ok(None) => not_found("employee"),
        Err(error) => error_response(error),
    }
}

async fn update_employee_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<EmployeePatch>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.update_employee(&ctx, EmployeeId(id), patch) {
        Ok(Some(employee)) => (StatusCode::OK, Json(employee)).into_response(),
        Ok(None) => not_found("employee"),
        Err(error) => error_response(error),
    }
}

async fn delete_employee_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.delete_employee(&ctx, EmployeeId(id)) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("employee"),
        Err(error) => error_response(error),
    }
}

async fn list_certificates_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Query(query): Query<TemporalQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.certificate_views(&ctx, query.resolve()) {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_certificate_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Json(new): Json<NewCertificate>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.create_certificate(&ctx, new) {
        Ok(certificate) => (StatusCode::CREATED, Json(certificate)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn get_certificate_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Query(query): Query<TemporalQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.certificate_view(&ctx, CertificateId(id), query.resolve()) {
        Ok(Some(view)) => (StatusCode::OK, Json(view)).into_response(),
        Ok(None) => not_found("certificate"),
        Err(error) => error_response(error),
    }
}

async fn update_certificate_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<CertificatePatch>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.update_certificate(&ctx, CertificateId(id), patch) {
        Ok(Some(certificate)) => (StatusCode::OK, Json(certificate)).into_response(),
        Ok(None) => not_found("certificate"),
        Err(error) => error_response(error),
    }
}

async fn delete_certificate_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.delete_certificate(&ctx, CertificateId(id)) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("certificate"),
        Err(error) => error_response(error),
    }
}

async fn list_users_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.users(&ctx) {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn create_user_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Json(request): Json<CreateUserRequest>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.create_user(&ctx, request) {
        Ok(user) => (StatusCode::CREATED, Json(user)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn update_user_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.update_user(&ctx, UserId(id), request) {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => not_found("user"),
        Err(error) => error_response(error),
    }
}

async fn delete_user_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.delete_user(&ctx, UserId(id)) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("user"),
        Err(error) => error_response(error),
    }
}

async fn dashboard_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Query(query): Query<TemporalQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };
    match service.dashboard(&ctx, query.resolve()) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn report_handler<S>(
    State(service): State<Arc<ComplianceService<S>>>,
    headers: HeaderMap,
    Path(kind): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    S: EntityStore + 'static,
{
    let ctx = match authenticate(service.as_ref(), &headers) {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };

    let kind: ReportKind = match kind.parse() {
        Ok(kind) => kind,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::NOT_FOUND, Json(payload)).into_response();
        }
    };

    let report = match service.report(&ctx, kind, &query.filter(), query.resolve()) {
        Ok(report) => report,
        Err(error) => return error_response(error),
    };

    match report.to_csv() {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", report.filename()),
                ),
            ],
            body,
        )
            .into_response(),
        Err(error) => error_response(ServiceError::Report(error)),
    }
}
