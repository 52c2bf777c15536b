use super::domain::{
    Certificate, CertificateId, CertificatePatch, Employee, EmployeeId, EmployeePatch,
    NewCertificate, NewEmployee, NewUser, User, UserId, UserPatch,
};

/// Storage contract for the three entity collections.
///
/// Listings come back in insertion order. Absent ids are `Ok(None)` /
/// `Ok(false)`, never errors; `StoreError` is reserved for the backing
/// persistence misbehaving. Creation always generates the id and both
/// timestamps; updates merge a patch and refresh `updated_at` even when the
/// patch is empty.
pub trait EntityStore: Send + Sync {
    fn employees(&self) -> Result<Vec<Employee>, StoreError>;
    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError>;
    fn create_employee(&self, new: NewEmployee) -> Result<Employee, StoreError>;
    fn update_employee(
        &self,
        id: EmployeeId,
        patch: EmployeePatch,
    ) -> Result<Option<Employee>, StoreError>;
    /// Deletes the employee and every certificate referencing it, as one
    /// all-or-nothing step. Returns `false` when the id is unknown.
    fn delete_employee(&self, id: EmployeeId) -> Result<bool, StoreError>;

    fn certificates(&self) -> Result<Vec<Certificate>, StoreError>;
    fn certificate(&self, id: CertificateId) -> Result<Option<Certificate>, StoreError>;
    fn certificates_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Certificate>, StoreError>;
    fn create_certificate(&self, new: NewCertificate) -> Result<Certificate, StoreError>;
    fn update_certificate(
        &self,
        id: CertificateId,
        patch: CertificatePatch,
    ) -> Result<Option<Certificate>, StoreError>;
    fn delete_certificate(&self, id: CertificateId) -> Result<bool, StoreError>;

    fn users(&self) -> Result<Vec<User>, StoreError>;
    fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    fn create_user(&self, new: NewUser) -> Result<User, StoreError>;
    fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<User>, StoreError>;
    fn delete_user(&self, id: UserId) -> Result<bool, StoreError>;
}

/// Error enumeration for persistence failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored snapshot is corrupt: {0}")]
    Corrupt(String),
}
