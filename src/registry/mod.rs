//! Employee and safety-certificate registry: entities, storage, access
//! policy, expiry classification, dashboard aggregation, and CSV reports.

pub mod dashboard;
pub mod domain;
pub mod memory;
pub mod policy;
pub mod report;
pub mod router;
pub mod service;
pub mod status;
pub mod store;

pub use dashboard::DashboardSummary;
pub use domain::{
    AccessTier, Certificate, CertificateId, CertificateKind, CertificatePatch,
    CertificateRecordStatus, CertificateView, Employee, EmployeeId, EmployeePatch, EmployeeStatus,
    NewCertificate, NewEmployee, NewUser, User, UserId, UserPatch, UserView,
    UNKNOWN_EMPLOYEE_NAME,
};
pub use memory::{FileBackend, KeyValueBackend, MemoryStore};
pub use policy::Permissions;
pub use report::{Report, ReportError, ReportFilter, ReportKind, ATTENTION_WINDOW_DAYS};
pub use router::api_router;
pub use service::{
    ComplianceService, CreateUserRequest, ServiceError, SessionContext, SessionToken,
    UpdateUserRequest,
};
pub use status::{ExpiryAssessment, ExpiryStatus, EXPIRY_WARNING_WINDOW_DAYS};
pub use store::{EntityStore, StoreError};
