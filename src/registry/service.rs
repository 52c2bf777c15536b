use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::dashboard::DashboardSummary;
use super::domain::{
    AccessTier, Certificate, CertificateId, CertificatePatch, CertificateView, Employee,
    EmployeeId, EmployeePatch, NewCertificate, NewEmployee, NewUser, UserId, UserPatch, UserView,
    UNKNOWN_EMPLOYEE_NAME,
};
use super::policy::Permissions;
use super::report::{self, Report, ReportFilter, ReportKind};
use super::status::ExpiryAssessment;
use super::store::{EntityStore, StoreError};

const DEFAULT_ADMIN_EMAIL: &str = "admin@sistema.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Opaque bearer token identifying a logged-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub Uuid);

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionToken {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

/// Who is acting. Passed explicitly into every operation that needs an
/// authorization decision; there is no ambient current-user global.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: UserId,
    pub name: String,
    pub tier: AccessTier,
    pub linked_employee: Option<EmployeeId>,
    pub permissions: Permissions,
}

impl SessionContext {
    fn can_view_employee(&self, id: EmployeeId) -> bool {
        self.permissions.can_view_all || self.linked_employee == Some(id)
    }
}

/// Error raised by the compliance service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing or unknown session token")]
    Unauthenticated,
    #[error("operation not permitted for this access tier")]
    Forbidden,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("a user cannot delete their own account")]
    SelfDeletion,
    #[error("credential hashing failed: {0}")]
    Credential(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Report(#[from] report::ReportError),
}

/// User-creation payload accepted at the service boundary; the plaintext
/// password never reaches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub tier: AccessTier,
    #[serde(default)]
    pub linked_employee: Option<EmployeeId>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub tier: Option<AccessTier>,
    pub linked_employee: Option<EmployeeId>,
    pub active: Option<bool>,
}

/// Facade composing the entity store, access policy, and expiry classifier
/// behind session-aware operations.
pub struct ComplianceService<S> {
    store: Arc<S>,
    sessions: Mutex<HashMap<SessionToken, UserId>>,
}

impl<S> ComplianceService<S>
where
    S: EntityStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn sessions_guard(&self) -> std::sync::MutexGuard<'_, HashMap<SessionToken, UserId>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Seed the default administrator when the user table is empty, so a
    /// fresh deployment can be logged into at all.
    pub fn ensure_default_admin(&self) -> Result<(), ServiceError> {
        if !self.store.users()?.is_empty() {
            return Ok(());
        }

        let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)?;
        self.store.create_user(NewUser {
            name: "Administrador".to_string(),
            email: DEFAULT_ADMIN_EMAIL.to_string(),
            password_hash,
            tier: AccessTier::Admin,
            linked_employee: None,
            active: true,
        })?;
        warn!(email = DEFAULT_ADMIN_EMAIL, "seeded default admin account; change its password");
        Ok(())
    }

    // ---- sessions -------------------------------------------------------

    pub fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(SessionToken, UserView), ServiceError> {
        let user = self
            .store
            .user_by_email(email)?
            .filter(|user| user.active)
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(&user.password_hash, password) {
            return Err(ServiceError::InvalidCredentials);
        }

        let token = SessionToken(Uuid::new_v4());
        self.sessions_guard().insert(token, user.id);
        info!(user = %user.id, "session opened");
        Ok((token, UserView::from(&user)))
    }

    pub fn logout(&self, token: SessionToken) -> bool {
        self.sessions_guard().remove(&token).is_some()
    }

    /// Resolve a token into a fresh session context. The user record is
    /// re-read so deactivation or a tier change takes effect immediately.
    pub fn session(&self, token: SessionToken) -> Result<SessionContext, ServiceError> {
        let user_id = self
            .sessions_guard()
            .get(&token)
            .copied()
            .ok_or(ServiceError::Unauthenticated)?;

        let user = self
            .store
            .user(user_id)?
            .filter(|user| user.active)
            .ok_or(ServiceError::Unauthenticated)?;

        Ok(SessionContext {
            user_id: user.id,
            name: user.name,
            tier: user.tier,
            linked_employee: user.linked_employee,
            permissions: Permissions::for_tier(user.tier),
        })
    }

    // ---- employees ------------------------------------------------------

    pub fn employees(&self, ctx: &SessionContext) -> Result<Vec<Employee>, ServiceError> {
        let employees = self.store.employees()?;
        if ctx.permissions.can_view_all {
            return Ok(employees);
        }
        Ok(employees
            .into_iter()
            .filter(|employee| ctx.linked_employee == Some(employee.id))
            .collect())
    }

    pub fn employee(
        &self,
        ctx: &SessionContext,
        id: EmployeeId,
    ) -> Result<Option<Employee>, ServiceError> {
        if !ctx.can_view_employee(id) {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.store.employee(id)?)
    }

    pub fn create_employee(
        &self,
        ctx: &SessionContext,
        new: NewEmployee,
    ) -> Result<Employee, ServiceError> {
        if !ctx.permissions.can_create {
            return Err(ServiceError::Forbidden);
        }
        require_field(&new.name, "employee name")?;
        require_field(&new.tax_id, "employee tax id")?;
        let employee = self.store.create_employee(new)?;
        info!(employee = %employee.id, "employee registered");
        Ok(employee)
    }

    pub fn update_employee(
        &self,
        ctx: &SessionContext,
        id: EmployeeId,
        patch: EmployeePatch,
    ) -> Result<Option<Employee>, ServiceError> {
        if !ctx.permissions.can_edit {
            return Err(ServiceError::Forbidden);
        }
        if let Some(name) = &patch.name {
            require_field(name, "employee name")?;
        }
        Ok(self.store.update_employee(id, patch)?)
    }

    pub fn delete_employee(
        &self,
        ctx: &SessionContext,
        id: EmployeeId,
    ) -> Result<bool, ServiceError> {
        if !ctx.permissions.can_delete {
            return Err(ServiceError::Forbidden);
        }
        let deleted = self.store.delete_employee(id)?;
        if deleted {
            info!(employee = %id, "employee deleted with certificate cascade");
        }
        Ok(deleted)
    }

    // ---- certificates ---------------------------------------------------

    /// List certificates as display views: owning employee name resolved
    /// (with the placeholder for dangling references) and the expiry
    /// classification computed against `reference`.
    pub fn certificate_views(
        &self,
        ctx: &SessionContext,
        reference: NaiveDate,
    ) -> Result<Vec<CertificateView>, ServiceError> {
        let employees = self.store.employees()?;
        let names: HashMap<EmployeeId, &str> = employees
            .iter()
            .map(|employee| (employee.id, employee.name.as_str()))
            .collect();

        let certificates = self.store.certificates()?;
        Ok(certificates
            .into_iter()
            .filter(|certificate| {
                ctx.permissions.can_view_all
                    || ctx.linked_employee == Some(certificate.employee_id)
            })
            .map(|certificate| build_view(certificate, &names, reference))
            .collect())
    }

    pub fn certificate_view(
        &self,
        ctx: &SessionContext,
        id: CertificateId,
        reference: NaiveDate,
    ) -> Result<Option<CertificateView>, ServiceError> {
        let Some(certificate) = self.store.certificate(id)? else {
            return Ok(None);
        };
        if !ctx.can_view_employee(certificate.employee_id) {
            return Err(ServiceError::Forbidden);
        }
        let employee_name = self
            .store
            .employee(certificate.employee_id)?
            .map(|employee| employee.name)
            .unwrap_or_else(|| UNKNOWN_EMPLOYEE_NAME.to_string());
        Ok(Some(CertificateView {
            employee_name,
            kind_label: certificate.kind.label(),
            assessment: ExpiryAssessment::classify(certificate.expiry_date, reference),
            certificate,
        }))
    }

    pub fn create_certificate(
        &self,
        ctx: &SessionContext,
        new: NewCertificate,
    ) -> Result<Certificate, ServiceError> {
        if !ctx.permissions.can_create {
            return Err(ServiceError::Forbidden);
        }
        require_field(&new.number, "certificate number")?;
        self.require_employee(new.employee_id)?;
        let certificate = self.store.create_certificate(new)?;
        info!(certificate = %certificate.id, employee = %certificate.employee_id, "certificate issued");
        Ok(certificate)
    }

    pub fn update_certificate(
        &self,
        ctx: &SessionContext,
        id: CertificateId,
        patch: CertificatePatch,
    ) -> Result<Option<Certificate>, ServiceError> {
        if !ctx.permissions.can_edit {
            return Err(ServiceError::Forbidden);
        }
        if let Some(employee_id) = patch.employee_id {
            self.require_employee(employee_id)?;
        }
        Ok(self.store.update_certificate(id, patch)?)
    }

    pub fn delete_certificate(
        &self,
        ctx: &SessionContext,
        id: CertificateId,
    ) -> Result<bool, ServiceError> {
        if !ctx.permissions.can_delete {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.store.delete_certificate(id)?)
    }

    fn require_employee(&self, id: EmployeeId) -> Result<(), ServiceError> {
        if self.store.employee(id)?.is_none() {
            return Err(ServiceError::Validation(format!(
                "referenced employee {id} does not exist"
            )));
        }
        Ok(())
    }

    // ---- users ----------------------------------------------------------

    pub fn users(&self, ctx: &SessionContext) -> Result<Vec<UserView>, ServiceError> {
        if !ctx.permissions.can_manage_users {
            return Err(ServiceError::Forbidden);
        }
        Ok(self.store.users()?.iter().map(UserView::from).collect())
    }

    pub fn create_user(
        &self,
        ctx: &SessionContext,
        request: CreateUserRequest,
    ) -> Result<UserView, ServiceError> {
        if !ctx.permissions.can_manage_users {
            return Err(ServiceError::Forbidden);
        }
        require_field(&request.name, "user name")?;
        require_field(&request.email, "user email")?;
        require_field(&request.password, "user password")?;

        let password_hash = hash_password(&request.password)?;
        let user = self.store.create_user(NewUser {
            name: request.name,
            email: request.email,
            password_hash,
            tier: request.tier,
            linked_employee: request.linked_employee,
            active: request.active,
        })?;
        info!(user = %user.id, tier = user.tier.label(), "user account created");
        Ok(UserView::from(&user))
    }

    pub fn update_user(
        &self,
        ctx: &SessionContext,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<Option<UserView>, ServiceError> {
        if !ctx.permissions.can_manage_users {
            return Err(ServiceError::Forbidden);
        }
        let password_hash = match request.password.as_deref() {
            Some(password) => {
                require_field(password, "user password")?;
                Some(hash_password(password)?)
            }
            None => None,
        };
        let patch = UserPatch {
            name: request.name,
            email: request.email,
            password_hash,
            tier: request.tier,
            linked_employee: request.linked_employee,
            active: request.active,
        };
        Ok(self
            .store
            .update_user(id, patch)?
            .map(|user| UserView::from(&user)))
    }

    pub fn delete_user(&self, ctx: &SessionContext, id: UserId) -> Result<bool, ServiceError> {
        if !ctx.permissions.can_manage_users {
            return Err(ServiceError::Forbidden);
        }
        // Guarded before any store call so the session can never saw off
        // the branch it is sitting on.
        if ctx.user_id == id {
            return Err(ServiceError::SelfDeletion);
        }
        Ok(self.store.delete_user(id)?)
    }

    // ---- aggregation ----------------------------------------------------

    pub fn dashboard(
        &self,
        ctx: &SessionContext,
        reference: NaiveDate,
    ) -> Result<DashboardSummary, ServiceError> {
        let employees = self.employees(ctx)?;
        let views = self.certificate_views(ctx, reference)?;
        Ok(DashboardSummary::build(&employees, &views))
    }

    pub fn report(
        &self,
        ctx: &SessionContext,
        kind: ReportKind,
        filter: &ReportFilter,
        reference: NaiveDate,
    ) -> Result<Report, ServiceError> {
        if !ctx.permissions.can_view_all {
            return Err(ServiceError::Forbidden);
        }
        let employees = self.store.employees()?;
        let views = self.certificate_views(ctx, reference)?;
        Ok(report::generate(kind, &employees, &views, filter))
    }
}

fn build_view(
    certificate: Certificate,
    names: &HashMap<EmployeeId, &str>,
    reference: NaiveDate,
) -> CertificateView {
    let employee_name = names
        .get(&certificate.employee_id)
        .map_or(UNKNOWN_EMPLOYEE_NAME, |name| *name)
        .to_string();
    CertificateView {
        employee_name,
        kind_label: certificate.kind.label(),
        assessment: ExpiryAssessment::classify(certificate.expiry_date, reference),
        certificate,
    }
}

fn require_field(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ServiceError::Credential(err.to_string()))
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
