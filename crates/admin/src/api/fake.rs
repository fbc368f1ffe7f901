//! In-memory [`Backend`] for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use buen_sabor_core::{AccountDraft, Employee, EmployeeId, Image, ImageId, Role, User, UserId};

use super::{ApiError, Backend, Upload};

#[derive(Debug, Default)]
pub struct FakeState {
    /// User returned by `login`.
    pub current: Option<User>,
    pub users: Vec<User>,
    pub exists: bool,
    pub customers: HashSet<String>,
    pub employees: Vec<Employee>,
    pub uploaded: Vec<String>,
    /// Names of calls that should fail.
    pub failing: HashSet<&'static str>,
    /// Answer every call with 401.
    pub token_rejected: bool,
    /// Names of calls made, in order.
    pub calls: Vec<&'static str>,
    pub(crate) next_id: i64,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn with(state: FakeState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn enter(&self, call: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.token_rejected {
            return Err(ApiError::Status {
                status: 401,
                message: "Token invalido".to_string(),
            });
        }
        if state.failing.contains(call) {
            return Err(ApiError::Status {
                status: 500,
                message: format!("{call} failed"),
            });
        }
        Ok(state)
    }
}

impl FakeState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        100 + self.next_id
    }
}

impl Backend for FakeBackend {
    async fn login(&self, _token: &str) -> Result<User, ApiError> {
        let state = self.enter("login")?;
        state.current.clone().ok_or_else(|| ApiError::Status {
            status: 404,
            message: "Usuario no encontrado".to_string(),
        })
    }

    async fn register(&self, _token: &str, user: &User) -> Result<User, ApiError> {
        let mut state = self.enter("register")?;
        let mut created = user.clone();
        created.id = Some(UserId::new(state.next_id()));
        state.current = Some(created.clone());
        state.users.push(created.clone());
        state.exists = true;
        Ok(created)
    }

    async fn create_user(&self, _token: &str, draft: &AccountDraft) -> Result<User, ApiError> {
        let mut state = self.enter("create_user")?;
        let id = state.next_id();
        let created = User {
            id: Some(UserId::new(id)),
            auth0_id: format!("auth0|{id}"),
            username: draft.email.clone(),
            email: draft.email.clone(),
            rol: Some(draft.rol),
        };
        state.users.push(created.clone());
        Ok(created)
    }

    async fn user_exists(&self, _token: &str) -> Result<bool, ApiError> {
        let state = self.enter("user_exists")?;
        Ok(state.exists)
    }

    async fn list_users(&self, _token: &str) -> Result<Vec<User>, ApiError> {
        let state = self.enter("list_users")?;
        Ok(state.users.clone())
    }

    async fn update_role(&self, _token: &str, id: UserId, role: Role) -> Result<User, ApiError> {
        let mut state = self.enter("update_role")?;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == Some(id))
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: "Usuario no encontrado".to_string(),
            })?;
        user.rol = Some(role);
        Ok(user.clone())
    }

    async fn find_customer_by_username(
        &self,
        _token: &str,
        username: &str,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let state = self.enter("find_customer")?;
        Ok(state
            .customers
            .contains(username)
            .then(|| serde_json::json!({ "id": 1, "username": username })))
    }

    async fn create_employee(&self, _token: &str, employee: &Employee) -> Result<Employee, ApiError> {
        let mut state = self.enter("create_employee")?;
        let mut created = employee.clone();
        created.id = Some(EmployeeId::new(state.next_id()));
        state.employees.push(created.clone());
        Ok(created)
    }

    async fn upload_employee_images(
        &self,
        _token: &str,
        _id: EmployeeId,
        files: Vec<Upload>,
    ) -> Result<Vec<Image>, ApiError> {
        let mut state = self.enter("upload_images")?;
        let mut images = Vec::with_capacity(files.len());
        for file in files {
            let id = state.next_id();
            state.uploaded.push(file.file_name.clone());
            images.push(Image {
                id: Some(ImageId::new(id)),
                url: format!("https://img.buensabor.com.ar/{}", file.file_name),
            });
        }
        Ok(images)
    }
}
