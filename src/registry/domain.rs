use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::ExpiryAssessment;

/// Identifier wrapper for employee records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub Uuid);

/// Identifier wrapper for certificate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertificateId(pub Uuid);

/// Identifier wrapper for user accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl EmployeeId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl CertificateId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl UserId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for CertificateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Employment lifecycle state, stored as data on the employee record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
    OnLeave,
}

impl EmployeeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EmployeeStatus::Active => "ativo",
            EmployeeStatus::Inactive => "inativo",
            EmployeeStatus::OnLeave => "afastado",
        }
    }
}

/// Regulatory certificate categories tracked by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateKind {
    Aso,
    Nr10,
    Nr35,
    Nr33,
    Nr12,
    Nr18,
    Nr20,
    Cipa,
    Integration,
    Other,
}

impl CertificateKind {
    pub const fn label(self) -> &'static str {
        match self {
            CertificateKind::Aso => "ASO",
            CertificateKind::Nr10 => "NR-10",
            CertificateKind::Nr35 => "NR-35",
            CertificateKind::Nr33 => "NR-33",
            CertificateKind::Nr12 => "NR-12",
            CertificateKind::Nr18 => "NR-18",
            CertificateKind::Nr20 => "NR-20",
            CertificateKind::Cipa => "CIPA",
            CertificateKind::Integration => "Integração",
            CertificateKind::Other => "Outro",
        }
    }
}

/// Stored certificate label maintained by staff, distinct from the computed
/// expiry classification (a certificate under renewal can still be expired
/// in calendar terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateRecordStatus {
    Valid,
    Expired,
    UnderRenewal,
}

impl CertificateRecordStatus {
    pub const fn label(self) -> &'static str {
        match self {
            CertificateRecordStatus::Valid => "valido",
            CertificateRecordStatus::Expired => "vencido",
            CertificateRecordStatus::UnderRenewal => "em_renovacao",
        }
    }
}

/// Fixed permission profiles assignable to user accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    Admin,
    Editor,
    ViewerRestricted,
}

impl AccessTier {
    pub const fn label(self) -> &'static str {
        match self {
            AccessTier::Admin => "administrador",
            AccessTier::Editor => "editor",
            AccessTier::ViewerRestricted => "terceiro",
        }
    }
}

/// A tracked worker. Owned by the entity store; certificates and user
/// accounts reference employees by id, never by embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub tax_id: String,
    pub registry_id: Option<String>,
    pub birth_date: NaiveDate,
    pub hire_date: NaiveDate,
    pub job_title: String,
    pub department: String,
    pub company: String,
    pub status: EmployeeStatus,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when registering an employee; id and timestamps are
/// always system-generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub tax_id: String,
    #[serde(default)]
    pub registry_id: Option<String>,
    pub birth_date: NaiveDate,
    pub hire_date: NaiveDate,
    pub job_title: String,
    pub department: String,
    pub company: String,
    pub status: EmployeeStatus,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update; absent fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub registry_id: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub hire_date: Option<NaiveDate>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub company: Option<String>,
    pub status: Option<EmployeeStatus>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl EmployeePatch {
    pub fn apply(self, employee: &mut Employee) {
        if let Some(name) = self.name {
            employee.name = name;
        }
        if let Some(tax_id) = self.tax_id {
            employee.tax_id = tax_id;
        }
        if let Some(registry_id) = self.registry_id {
            employee.registry_id = Some(registry_id);
        }
        if let Some(birth_date) = self.birth_date {
            employee.birth_date = birth_date;
        }
        if let Some(hire_date) = self.hire_date {
            employee.hire_date = hire_date;
        }
        if let Some(job_title) = self.job_title {
            employee.job_title = job_title;
        }
        if let Some(department) = self.department {
            employee.department = department;
        }
        if let Some(company) = self.company {
            employee.company = company;
        }
        if let Some(status) = self.status {
            employee.status = status;
        }
        if let Some(email) = self.email {
            employee.email = Some(email);
        }
        if let Some(phone) = self.phone {
            employee.phone = Some(phone);
        }
        if let Some(notes) = self.notes {
            employee.notes = Some(notes);
        }
    }
}

/// A time-bounded compliance credential tied to exactly one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: CertificateId,
    pub employee_id: EmployeeId,
    pub kind: CertificateKind,
    pub number: String,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub issuing_authority: String,
    pub status: CertificateRecordStatus,
    pub document_url: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCertificate {
    pub employee_id: EmployeeId,
    pub kind: CertificateKind,
    pub number: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub issuing_authority: String,
    pub status: CertificateRecordStatus,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificatePatch {
    pub employee_id: Option<EmployeeId>,
    pub kind: Option<CertificateKind>,
    pub number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub issuing_authority: Option<String>,
    pub status: Option<CertificateRecordStatus>,
    pub document_url: Option<String>,
    pub notes: Option<String>,
}

impl CertificatePatch {
    pub fn apply(self, certificate: &mut Certificate) {
        if let Some(employee_id) = self.employee_id {
            certificate.employee_id = employee_id;
        }
        if let Some(kind) = self.kind {
            certificate.kind = kind;
        }
        if let Some(number) = self.number {
            certificate.number = number;
        }
        if let Some(issue_date) = self.issue_date {
            certificate.issue_date = Some(issue_date);
        }
        if let Some(expiry_date) = self.expiry_date {
            certificate.expiry_date = expiry_date;
        }
        if let Some(issuing_authority) = self.issuing_authority {
            certificate.issuing_authority = issuing_authority;
        }
        if let Some(status) = self.status {
            certificate.status = status;
        }
        if let Some(document_url) = self.document_url {
            certificate.document_url = Some(document_url);
        }
        if let Some(notes) = self.notes {
            certificate.notes = Some(notes);
        }
    }
}

/// Console account. The password is stored only as an argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub tier: AccessTier,
    pub linked_employee: Option<EmployeeId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store-level creation payload; the credential is hashed before it gets here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub tier: AccessTier,
    #[serde(default)]
    pub linked_employee: Option<EmployeeId>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub tier: Option<AccessTier>,
    pub linked_employee: Option<EmployeeId>,
    pub active: Option<bool>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(password_hash) = self.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(tier) = self.tier {
            user.tier = tier;
        }
        if let Some(linked_employee) = self.linked_employee {
            user.linked_employee = Some(linked_employee);
        }
        if let Some(active) = self.active {
            user.active = active;
        }
    }
}

/// Placeholder shown when a certificate's employee reference no longer
/// resolves; listing must degrade instead of failing.
pub const UNKNOWN_EMPLOYEE_NAME: &str = "Desconhecido";

/// Read-only projection of a certificate for display and export: the stored
/// record plus the resolved employee name and the computed expiry
/// classification. The stored entity shape is never mutated to carry these.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateView {
    #[serde(flatten)]
    pub certificate: Certificate,
    pub employee_name: String,
    pub kind_label: &'static str,
    pub assessment: ExpiryAssessment,
}

/// User projection with the credential hash stripped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub tier: AccessTier,
    pub linked_employee: Option<EmployeeId>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            tier: user.tier,
            linked_employee: user.linked_employee,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_employee() -> Employee {
        Employee {
            id: EmployeeId::generate(),
            name: "Maria Souza".to_string(),
            tax_id: "123.456.789-00".to_string(),
            registry_id: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20).expect("valid"),
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 6).expect("valid"),
            job_title: "Eletricista".to_string(),
            department: "Manutenção".to_string(),
            company: "Acme Industrial".to_string(),
            status: EmployeeStatus::Active,
            email: None,
            phone: None,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_patch_leaves_fields_untouched() {
        let mut employee = sample_employee();
        let before = employee.clone();
        EmployeePatch::default().apply(&mut employee);
        assert_eq!(employee, before);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut employee = sample_employee();
        EmployeePatch {
            job_title: Some("Supervisor".to_string()),
            status: Some(EmployeeStatus::OnLeave),
            ..EmployeePatch::default()
        }
        .apply(&mut employee);

        assert_eq!(employee.job_title, "Supervisor");
        assert_eq!(employee.status, EmployeeStatus::OnLeave);
        assert_eq!(employee.name, "Maria Souza");
    }

    #[test]
    fn user_view_strips_credential_hash() {
        let user = User {
            id: UserId::generate(),
            name: "Admin".to_string(),
            email: "admin@sistema.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            tier: AccessTier::Admin,
            linked_employee: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = UserView::from(&user);
        let json = serde_json::to_value(&view).expect("serializes");
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["tier"], "admin");
    }

    #[test]
    fn certificate_kind_labels_match_regulatory_names() {
        assert_eq!(CertificateKind::Aso.label(), "ASO");
        assert_eq!(CertificateKind::Nr35.label(), "NR-35");
        assert_eq!(CertificateKind::Integration.label(), "Integração");
    }
}
