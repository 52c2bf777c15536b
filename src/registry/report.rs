use chrono::NaiveDate;
use serde::Deserialize;

use super::domain::{CertificateView, Employee, EmployeeStatus};
use super::status::{ExpiryAssessment, ExpiryStatus};

/// Wider lookahead used only by the upcoming-expiry report.
pub const ATTENTION_WINDOW_DAYS: i64 = 60;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The three fixed export kinds, each with its spreadsheet filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Employees,
    Certificates,
    UpcomingExpiries,
}

impl ReportKind {
    pub const fn filename(self) -> &'static str {
        match self {
            ReportKind::Employees => "relatorio_funcionarios.csv",
            ReportKind::Certificates => "relatorio_certificados.csv",
            ReportKind::UpcomingExpiries => "relatorio_vencimentos.csv",
        }
    }
}

impl std::str::FromStr for ReportKind {
    type Err = UnknownReportKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "employees" => Ok(ReportKind::Employees),
            "certificates" => Ok(ReportKind::Certificates),
            "upcoming_expiries" => Ok(ReportKind::UpcomingExpiries),
            other => Err(UnknownReportKind(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown report kind '{0}'")]
pub struct UnknownReportKind(String);

/// Ad-hoc predicates applied before projection. All optional; the date range
/// is inclusive and applies to the hire date for the employee report and the
/// expiry date for the certificate report. The upcoming-expiry report runs
/// unfiltered, the 60-day rule is its filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub company: Option<String>,
    pub employee_status: Option<EmployeeStatus>,
    pub expiry_status: Option<ExpiryStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportFilter {
    fn date_in_range(&self, date: NaiveDate) -> bool {
        if let Some(from) = self.from {
            if date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if date > to {
                return false;
            }
        }
        true
    }
}

/// A generated report: header row plus projected record rows, ready for CSV
/// serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub kind: ReportKind,
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("csv serialization failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv output could not be finalized: {0}")]
    Finalize(String),
}

impl Report {
    pub fn filename(&self) -> &'static str {
        self.kind.filename()
    }

    /// Serialize as UTF-8 CSV with a leading byte-order mark, every field
    /// quoted, for broad spreadsheet-tool compatibility.
    pub fn to_csv(&self) -> Result<Vec<u8>, ReportError> {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(Vec::new());

        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        let body = writer
            .into_inner()
            .map_err(|err| ReportError::Finalize(err.to_string()))?;

        let mut output = Vec::with_capacity(UTF8_BOM.len() + body.len());
        output.extend_from_slice(UTF8_BOM);
        output.extend_from_slice(&body);
        Ok(output)
    }
}

/// Build the requested report from data already fetched and classified.
pub fn generate(
    kind: ReportKind,
    employees: &[Employee],
    certificates: &[CertificateView],
    filter: &ReportFilter,
) -> Report {
    match kind {
        ReportKind::Employees => employee_report(employees, filter),
        ReportKind::Certificates => certificate_report(certificates, filter),
        ReportKind::UpcomingExpiries => upcoming_report(certificates),
    }
}

fn employee_report(employees: &[Employee], filter: &ReportFilter) -> Report {
    let rows = employees
        .iter()
        .filter(|employee| {
            filter
                .company
                .as_deref()
                .map_or(true, |company| employee.company == company)
        })
        .filter(|employee| {
            filter
                .employee_status
                .map_or(true, |status| employee.status == status)
        })
        .filter(|employee| filter.date_in_range(employee.hire_date))
        .map(|employee| {
            vec![
                employee.name.clone(),
                employee.tax_id.clone(),
                employee.email.clone().unwrap_or_default(),
                employee.phone.clone().unwrap_or_default(),
                employee.company.clone(),
                employee.job_title.clone(),
                employee.hire_date.to_string(),
                employee.status.label().to_string(),
            ]
        })
        .collect();

    Report {
        kind: ReportKind::Employees,
        headers: vec![
            "Nome",
            "CPF",
            "Email",
            "Telefone",
            "Empresa",
            "Cargo",
            "Data Admissão",
            "Status",
        ],
        rows,
    }
}

fn certificate_report(certificates: &[CertificateView], filter: &ReportFilter) -> Report {
    let rows = certificates
        .iter()
        .filter(|view| {
            filter
                .expiry_status
                .map_or(true, |status| view.assessment.status() == status)
        })
        .filter(|view| filter.date_in_range(view.certificate.expiry_date))
        .map(|view| {
            vec![
                view.employee_name.clone(),
                view.kind_label.to_string(),
                view.certificate.number.clone(),
                view.certificate
                    .issue_date
                    .map(|date| date.to_string())
                    .unwrap_or_default(),
                view.certificate.expiry_date.to_string(),
                view.certificate.issuing_authority.clone(),
                view.assessment.status().label().to_string(),
            ]
        })
        .collect();

    Report {
        kind: ReportKind::Certificates,
        headers: vec![
            "Funcionário",
            "Tipo",
            "Número",
            "Data Emissão",
            "Data Validade",
            "Órgão Emissor",
            "Status",
        ],
        rows,
    }
}

fn upcoming_report(certificates: &[CertificateView]) -> Report {
    let rows = certificates
        .iter()
        .filter_map(|view| {
            let tier = match view.assessment {
                ExpiryAssessment::Expired { .. } => "Vencido",
                ExpiryAssessment::ExpiringSoon { .. } => "Crítico (30 dias)",
                ExpiryAssessment::Valid { days_remaining }
                    if days_remaining <= ATTENTION_WINDOW_DAYS =>
                {
                    "Atenção (60 dias)"
                }
                ExpiryAssessment::Valid { .. } => return None,
            };

            Some(vec![
                view.employee_name.clone(),
                view.kind_label.to_string(),
                view.certificate.number.clone(),
                view.certificate.expiry_date.to_string(),
                view.assessment.day_delta().to_string(),
                tier.to_string(),
            ])
        })
        .collect();

    Report {
        kind: ReportKind::UpcomingExpiries,
        headers: vec![
            "Funcionário",
            "Tipo",
            "Número",
            "Data Validade",
            "Dias para Vencer",
            "Status",
        ],
        rows,
    }
}
