use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

use super::domain::{
    Certificate, CertificateId, CertificatePatch, Employee, EmployeeId, EmployeePatch,
    NewCertificate, NewEmployee, NewUser, User, UserId, UserPatch,
};
use super::store::{EntityStore, StoreError};

const EMPLOYEES_KEY: &str = "employees";
const CERTIFICATES_KEY: &str = "certificates";
const USERS_KEY: &str = "users";

/// Flat key/value persistence seam, the shape of a browser localStorage or
/// any blob store: whole collections serialized as JSON strings under fixed
/// keys. A remote tabular backend would implement [`EntityStore`] directly
/// instead of going through this.
pub trait KeyValueBackend: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn store(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Key/value backend writing one JSON file per collection in a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueBackend for FileBackend {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Unavailable(err.to_string())),
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        std::fs::write(self.path_for(key), value)
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

#[derive(Debug, Default, Clone)]
struct Collections {
    employees: Vec<Employee>,
    certificates: Vec<Certificate>,
    users: Vec<User>,
}

/// [`EntityStore`] over an in-process snapshot, optionally persisted through
/// a [`KeyValueBackend`].
///
/// Mutations are prepared on a clone of the affected collections and written
/// to the backend before the in-memory state is swapped, so a persistence
/// failure leaves the visible state exactly as it was and the user can retry
/// the same action.
pub struct MemoryStore {
    state: Mutex<Collections>,
    backend: Option<Arc<dyn KeyValueBackend>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Purely in-memory store; nothing survives the process.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Collections::default()),
            backend: None,
        }
    }

    /// Store hydrated from (and persisted to) a key/value backend.
    pub fn with_backend(backend: Arc<dyn KeyValueBackend>) -> Result<Self, StoreError> {
        let state = Collections {
            employees: load_collection(backend.as_ref(), EMPLOYEES_KEY)?,
            certificates: load_collection(backend.as_ref(), CERTIFICATES_KEY)?,
            users: load_collection(backend.as_ref(), USERS_KEY)?,
        };
        Ok(Self {
            state: Mutex::new(state),
            backend: Some(backend),
        })
    }

    fn persist<T: Serialize>(&self, key: &str, collection: &[T]) -> Result<(), StoreError> {
        if let Some(backend) = &self.backend {
            let payload = serde_json::to_string(collection)
                .map_err(|err| StoreError::Corrupt(err.to_string()))?;
            backend.store(key, &payload)?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Collections>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store state poisoned".to_string()))
    }
}

fn load_collection<T: DeserializeOwned>(
    backend: &dyn KeyValueBackend,
    key: &str,
) -> Result<Vec<T>, StoreError> {
    match backend.load(key)? {
        Some(payload) => {
            serde_json::from_str(&payload).map_err(|err| StoreError::Corrupt(err.to_string()))
        }
        None => Ok(Vec::new()),
    }
}

impl EntityStore for MemoryStore {
    fn employees(&self) -> Result<Vec<Employee>, StoreError> {
        Ok(self.lock()?.employees.clone())
    }

    fn employee(&self, id: EmployeeId) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .lock()?
            .employees
            .iter()
            .find(|employee| employee.id == id)
            .cloned())
    }

    fn create_employee(&self, new: NewEmployee) -> Result<Employee, StoreError> {
        let now = Utc::now();
        let employee = Employee {
            id: EmployeeId::generate(),
            name: new.name,
            tax_id: new.tax_id,
            registry_id: new.registry_id,
            birth_date: new.birth_date,
            hire_date: new.hire_date,
            job_title: new.job_title,
            department: new.department,
            company: new.company,
            status: new.status,
            email: new.email,
            phone: new.phone,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock()?;
        let mut employees = state.employees.clone();
        employees.push(employee.clone());
        self.persist(EMPLOYEES_KEY, &employees)?;
        state.employees = employees;
        Ok(employee)
    }

    fn update_employee(
        &self,
        id: EmployeeId,
        patch: EmployeePatch,
    ) -> Result<Option<Employee>, StoreError> {
        let mut state = self.lock()?;
        let mut employees = state.employees.clone();
        let Some(employee) = employees.iter_mut().find(|employee| employee.id == id) else {
            return Ok(None);
        };
        patch.apply(employee);
        employee.updated_at = Utc::now();
        let updated = employee.clone();
        self.persist(EMPLOYEES_KEY, &employees)?;
        state.employees = employees;
        Ok(Some(updated))
    }

    fn delete_employee(&self, id: EmployeeId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let employees: Vec<Employee> = state
            .employees
            .iter()
            .filter(|employee| employee.id != id)
            .cloned()
            .collect();
        if employees.len() == state.employees.len() {
            return Ok(false);
        }

        let certificates: Vec<Certificate> = state
            .certificates
            .iter()
            .filter(|certificate| certificate.employee_id != id)
            .cloned()
            .collect();

        // The certificate sweep is persisted before the employee removal so
        // a mid-flight failure can never leave certificates pointing at a
        // persisted-but-deleted employee; the in-memory state only swaps
        // once both writes succeed.
        self.persist(CERTIFICATES_KEY, &certificates)?;
        self.persist(EMPLOYEES_KEY, &employees)?;
        state.certificates = certificates;
        state.employees = employees;
        Ok(true)
    }

    fn certificates(&self) -> Result<Vec<Certificate>, StoreError> {
        Ok(self.lock()?.certificates.clone())
    }

    fn certificate(&self, id: CertificateId) -> Result<Option<Certificate>, StoreError> {
        Ok(self
            .lock()?
            .certificates
            .iter()
            .find(|certificate| certificate.id == id)
            .cloned())
    }

    fn certificates_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<Certificate>, StoreError> {
        Ok(self
            .lock()?
            .certificates
            .iter()
            .filter(|certificate| certificate.employee_id == employee_id)
            .cloned()
            .collect())
    }

    fn create_certificate(&self, new: NewCertificate) -> Result<Certificate, StoreError> {
        let now = Utc::now();
        let certificate = Certificate {
            id: CertificateId::generate(),
            employee_id: new.employee_id,
            kind: new.kind,
            number: new.number,
            issue_date: new.issue_date,
            expiry_date: new.expiry_date,
            issuing_authority: new.issuing_authority,
            status: new.status,
            document_url: new.document_url,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock()?;
        let mut certificates = state.certificates.clone();
        certificates.push(certificate.clone());
        self.persist(CERTIFICATES_KEY, &certificates)?;
        state.certificates = certificates;
        Ok(certificate)
    }

    fn update_certificate(
        &self,
        id: CertificateId,
        patch: CertificatePatch,
    ) -> Result<Option<Certificate>, StoreError> {
        let mut state = self.lock()?;
        let mut certificates = state.certificates.clone();
        let Some(certificate) = certificates
            .iter_mut()
            .find(|certificate| certificate.id == id)
        else {
            return Ok(None);
        };
        patch.apply(certificate);
        certificate.updated_at = Utc::now();
        let updated = certificate.clone();
        self.persist(CERTIFICATES_KEY, &certificates)?;
        state.certificates = certificates;
        Ok(Some(updated))
    }

    fn delete_certificate(&self, id: CertificateId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let certificates: Vec<Certificate> = state
            .certificates
            .iter()
            .filter(|certificate| certificate.id != id)
            .cloned()
            .collect();
        if certificates.len() == state.certificates.len() {
            return Ok(false);
        }
        self.persist(CERTIFICATES_KEY, &certificates)?;
        state.certificates = certificates;
        Ok(true)
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.lock()?.users.clone())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.iter().find(|user| user.id == id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()?
            .users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            tier: new.tier,
            linked_employee: new.linked_employee,
            active: new.active,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.lock()?;
        let mut users = state.users.clone();
        users.push(user.clone());
        self.persist(USERS_KEY, &users)?;
        state.users = users;
        Ok(user)
    }

    fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut state = self.lock()?;
        let mut users = state.users.clone();
        let Some(user) = users.iter_mut().find(|user| user.id == id) else {
            return Ok(None);
        };
        patch.apply(user);
        user.updated_at = Utc::now();
        let updated = user.clone();
        self.persist(USERS_KEY, &users)?;
        state.users = users;
        Ok(Some(updated))
    }

    fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let users: Vec<User> = state
            .users
            .iter()
            .filter(|user| user.id != id)
            .cloned()
            .collect();
        if users.len() == state.users.len() {
            return Ok(false);
        }
        self.persist(USERS_KEY, &users)?;
        state.users = users;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::domain::{CertificateKind, CertificateRecordStatus, EmployeeStatus};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn new_employee(name: &str) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            tax_id: "111.222.333-44".to_string(),
            registry_id: None,
            birth_date: NaiveDate::from_ymd_opt(1985, 3, 14).expect("valid"),
            hire_date: NaiveDate::from_ymd_opt(2021, 7, 1).expect("valid"),
            job_title: "Operador".to_string(),
            department: "Produção".to_string(),
            company: "Acme Industrial".to_string(),
            status: EmployeeStatus::Active,
            email: None,
            phone: None,
            notes: None,
        }
    }

    fn new_certificate(employee_id: EmployeeId) -> NewCertificate {
        NewCertificate {
            employee_id,
            kind: CertificateKind::Nr35,
            number: "2024-001".to_string(),
            issue_date: None,
            expiry_date: NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid"),
            issuing_authority: "SENAI".to_string(),
            status: CertificateRecordStatus::Valid,
            document_url: None,
            notes: None,
        }
    }

    #[test]
    fn create_then_fetch_round_trips_with_equal_timestamps() {
        let store = MemoryStore::new();
        let created = store
            .create_employee(new_employee("Ana"))
            .expect("create succeeds");
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store
            .employee(created.id)
            .expect("fetch succeeds")
            .expect("record present");
        assert_eq!(fetched, created);
    }

    #[test]
    fn update_with_empty_patch_still_advances_updated_at() {
        let store = MemoryStore::new();
        let created = store
            .create_employee(new_employee("Ana"))
            .expect("create succeeds");

        let updated = store
            .update_employee(created.id, EmployeePatch::default())
            .expect("update succeeds")
            .expect("record present");

        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_of_unknown_id_returns_none() {
        let store = MemoryStore::new();
        let absent = store
            .update_employee(EmployeeId::generate(), EmployeePatch::default())
            .expect("call succeeds");
        assert!(absent.is_none());
    }

    #[test]
    fn deleting_employee_cascades_to_its_certificates_only() {
        let store = MemoryStore::new();
        let kept = store.create_employee(new_employee("Ana")).expect("create");
        let doomed = store.create_employee(new_employee("Bia")).expect("create");

        store
            .create_certificate(new_certificate(kept.id))
            .expect("create");
        store
            .create_certificate(new_certificate(doomed.id))
            .expect("create");
        store
            .create_certificate(new_certificate(doomed.id))
            .expect("create");

        assert!(store.delete_employee(doomed.id).expect("delete"));

        let certificates = store.certificates().expect("list");
        assert_eq!(certificates.len(), 1);
        assert_eq!(certificates[0].employee_id, kept.id);
        assert!(store.employee(doomed.id).expect("fetch").is_none());
    }

    #[test]
    fn deleting_unknown_employee_reports_false() {
        let store = MemoryStore::new();
        assert!(!store.delete_employee(EmployeeId::generate()).expect("call"));
    }

    #[derive(Default)]
    struct MapBackend {
        entries: Mutex<HashMap<String, String>>,
        fail_writes: std::sync::atomic::AtomicBool,
    }

    impl KeyValueBackend for MapBackend {
        fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.entries.lock().expect("lock").get(key).cloned())
        }

        fn store(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if self.fail_writes.load(std::sync::atomic::Ordering::Relaxed) {
                return Err(StoreError::Unavailable("backend offline".to_string()));
            }
            self.entries
                .lock()
                .expect("lock")
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    #[test]
    fn backend_snapshot_survives_reload() {
        let backend = Arc::new(MapBackend::default());
        let store = MemoryStore::with_backend(backend.clone()).expect("hydrates");
        let created = store.create_employee(new_employee("Ana")).expect("create");

        let reloaded = MemoryStore::with_backend(backend).expect("hydrates");
        let employees = reloaded.employees().expect("list");
        assert_eq!(employees, vec![created]);
    }

    #[test]
    fn failed_persist_leaves_visible_state_unchanged() {
        let backend = Arc::new(MapBackend::default());
        let store = MemoryStore::with_backend(backend.clone()).expect("hydrates");
        let created = store.create_employee(new_employee("Ana")).expect("create");
        store
            .create_certificate(new_certificate(created.id))
            .expect("create");

        backend
            .fail_writes
            .store(true, std::sync::atomic::Ordering::Relaxed);

        let result = store.delete_employee(created.id);
        assert!(matches!(result, Err(StoreError::Unavailable(_))));

        // Nothing committed: the employee and its certificate are still visible.
        assert!(store.employee(created.id).expect("fetch").is_some());
        assert_eq!(store.certificates().expect("list").len(), 1);
    }

    #[test]
    fn corrupt_snapshot_is_reported_distinctly() {
        let backend = Arc::new(MapBackend::default());
        backend
            .entries
            .lock()
            .expect("lock")
            .insert("employees".to_string(), "not-json".to_string());

        let result = MemoryStore::with_backend(backend);
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
