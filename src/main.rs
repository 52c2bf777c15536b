use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use certrack::config::AppConfig;
use certrack::error::AppError;
use certrack::registry::{
    api_router, AccessTier, ComplianceService, EmployeeStatus, ExpiryStatus, FileBackend,
    MemoryStore, Permissions, ReportFilter, ReportKind, SessionContext, UserId,
};
use certrack::telemetry;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct OpsState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "certrack",
    about = "Track employee safety certificates, expiry status, and compliance reports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the certificate-expiry dashboard to stdout
    Dashboard(DashboardArgs),
    /// Export one of the CSV reports
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct DashboardArgs {
    /// Reference date for expiry classification (defaults to today)
    #[arg(long, value_parser = parse_date)]
    reference_date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct ReportArgs {
    /// Report kind: employees, certificates, or upcoming_expiries
    #[arg(long, value_parser = parse_report_kind)]
    kind: ReportKind,
    /// Output path (defaults to the report's fixed filename)
    #[arg(long)]
    out: Option<PathBuf>,
    /// Keep only employees of this company
    #[arg(long)]
    company: Option<String>,
    /// Keep only employees with this status: ativo, inativo, afastado
    #[arg(long, value_parser = parse_employee_status)]
    employee_status: Option<EmployeeStatus>,
    /// Keep only certificates with this classification: valid, expiring_soon, expired
    #[arg(long, value_parser = parse_expiry_status)]
    expiry_status: Option<ExpiryStatus>,
    /// Inclusive lower bound for the report's date field (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Inclusive upper bound for the report's date field (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
    /// Reference date for expiry classification (defaults to today)
    #[arg(long, value_parser = parse_date)]
    reference_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Dashboard(args) => run_dashboard(args),
        Command::Report(args) => run_report(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn parse_report_kind(raw: &str) -> Result<ReportKind, String> {
    raw.trim().parse().map_err(|err| format!("{err}"))
}

fn parse_employee_status(raw: &str) -> Result<EmployeeStatus, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "ativo" | "active" => Ok(EmployeeStatus::Active),
        "inativo" | "inactive" => Ok(EmployeeStatus::Inactive),
        "afastado" | "on_leave" => Ok(EmployeeStatus::OnLeave),
        other => Err(format!("unknown employee status '{other}'")),
    }
}

fn parse_expiry_status(raw: &str) -> Result<ExpiryStatus, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "valid" => Ok(ExpiryStatus::Valid),
        "expiring_soon" => Ok(ExpiryStatus::ExpiringSoon),
        "expired" => Ok(ExpiryStatus::Expired),
        other => Err(format!("unknown expiry status '{other}'")),
    }
}

fn build_service(config: &AppConfig) -> Result<Arc<ComplianceService<MemoryStore>>, AppError> {
    let store = match &config.store.snapshot_path {
        Some(dir) => MemoryStore::with_backend(Arc::new(FileBackend::new(dir)))?,
        None => MemoryStore::new(),
    };
    let service = Arc::new(ComplianceService::new(Arc::new(store)));
    service.ensure_default_admin()?;
    Ok(service)
}

/// The CLI acts with operator rights; there is no login step on the local
/// commands, only on the HTTP surface.
fn operator_context() -> SessionContext {
    SessionContext {
        user_id: UserId::generate(),
        name: "operator".to_string(),
        tier: AccessTier::Admin,
        linked_employee: None,
        permissions: Permissions::for_tier(AccessTier::Admin),
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let service = build_service(&config)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let ops_state = OpsState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let ops_router = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(ops_state);

    let app = api_router(service).merge(ops_router).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "certificate compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;
    let ctx = operator_context();

    let reference = args
        .reference_date
        .unwrap_or_else(|| Local::now().date_naive());
    let summary = service.dashboard(&ctx, reference)?;

    println!("Certificate compliance dashboard (reference {reference})");
    println!(
        "Employees: {} total, {} active",
        summary.total_employees, summary.active_employees
    );
    println!(
        "Certificates: {} total — {} valid, {} expiring within 30 days, {} expired",
        summary.total_certificates,
        summary.valid_certificates,
        summary.expiring_certificates,
        summary.expired_certificates
    );

    if summary.expiring_soon.is_empty() {
        println!("\nExpiring soon: none");
    } else {
        println!("\nExpiring soon");
        for view in &summary.expiring_soon {
            let days = view.assessment.days_remaining().unwrap_or_default();
            println!(
                "- {} | {} | {} | expires {} ({days} days)",
                view.employee_name, view.kind_label, view.certificate.number,
                view.certificate.expiry_date
            );
        }
    }

    if summary.most_overdue.is_empty() {
        println!("\nOverdue: none");
    } else {
        println!("\nOverdue");
        for view in &summary.most_overdue {
            let days = view.assessment.days_overdue().unwrap_or_default();
            println!(
                "- {} | {} | {} | expired {} ({days} days ago)",
                view.employee_name, view.kind_label, view.certificate.number,
                view.certificate.expiry_date
            );
        }
    }

    Ok(())
}

fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;
    let ctx = operator_context();

    let reference = args
        .reference_date
        .unwrap_or_else(|| Local::now().date_naive());
    let filter = ReportFilter {
        company: args.company,
        employee_status: args.employee_status,
        expiry_status: args.expiry_status,
        from: args.from,
        to: args.to,
    };

    let report = service.report(&ctx, args.kind, &filter, reference)?;
    let bytes = report.to_csv()?;

    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(report.filename()));
    std::fs::write(&path, bytes)?;
    println!("wrote {} rows to {}", report.rows.len(), path.display());

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<OpsState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<OpsState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
