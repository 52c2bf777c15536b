use serde::Serialize;

use super::domain::{CertificateView, Employee, EmployeeStatus};
use super::status::{ExpiryAssessment, ExpiryStatus};

/// Fixed display constraint for the three dashboard lists.
const DISPLAY_LIMIT: usize = 5;

/// Aggregated counts and top-5 lists backing the dashboard screen.
///
/// Pure projection over data already fetched; the certificate views carry
/// the expiry assessment computed for the request's reference date, so the
/// three status counts always sum to the certificate total.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_employees: usize,
    pub active_employees: usize,
    pub total_certificates: usize,
    pub valid_certificates: usize,
    pub expiring_certificates: usize,
    pub expired_certificates: usize,
    pub recent_employees: Vec<Employee>,
    pub expiring_soon: Vec<CertificateView>,
    pub most_overdue: Vec<CertificateView>,
}

impl DashboardSummary {
    pub fn build(employees: &[Employee], certificates: &[CertificateView]) -> Self {
        let total_employees = employees.len();
        let active_employees = employees
            .iter()
            .filter(|employee| employee.status == EmployeeStatus::Active)
            .count();

        let total_certificates = certificates.len();
        let mut valid_certificates = 0;
        let mut expiring_certificates = 0;
        let mut expired_certificates = 0;
        for view in certificates {
            match view.assessment.status() {
                ExpiryStatus::Valid => valid_certificates += 1,
                ExpiryStatus::ExpiringSoon => expiring_certificates += 1,
                ExpiryStatus::Expired => expired_certificates += 1,
            }
        }

        // Stable sorts keep insertion order as the tie-breaker.
        let mut recent_employees = employees.to_vec();
        recent_employees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_employees.truncate(DISPLAY_LIMIT);

        let mut expiring_soon: Vec<CertificateView> = certificates
            .iter()
            .filter(|view| {
                matches!(view.assessment, ExpiryAssessment::ExpiringSoon { .. })
            })
            .cloned()
            .collect();
        expiring_soon.sort_by_key(|view| view.assessment.day_delta());
        expiring_soon.truncate(DISPLAY_LIMIT);

        let mut most_overdue: Vec<CertificateView> = certificates
            .iter()
            .filter(|view| matches!(view.assessment, ExpiryAssessment::Expired { .. }))
            .cloned()
            .collect();
        most_overdue.sort_by_key(|view| view.assessment.day_delta());
        most_overdue.truncate(DISPLAY_LIMIT);

        Self {
            total_employees,
            active_employees,
            total_certificates,
            valid_certificates,
            expiring_certificates,
            expired_certificates,
            recent_employees,
            expiring_soon,
            most_overdue,
        }
    }
}
