//! HTTP client for the restaurant API.

use std::sync::Arc;
use std::time::Duration;

use buen_sabor_core::{AccountDraft, Employee, EmployeeId, Image, Role, User, UserId};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::{ApiError, Backend, GENERIC_ERROR_MESSAGE, Upload};
use crate::config::BackendConfig;

/// Per-request timeout for API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the restaurant API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("buen-sabor-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Base URL of the API.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        self.url(&format!("/api/auth{path}"))
    }

    /// Send a request and decode a JSON body from a success response.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Build an [`ApiError::Status`] from a failed response body.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let message = error_message(body);
    tracing::warn!(status = status.as_u16(), %message, "API request failed");
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

/// The `error` field of a JSON error body, or the generic message.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(serde_json::Value::as_str)
                .map(String::from)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string())
}

impl Backend for BackendClient {
    #[instrument(skip(self, token))]
    async fn login(&self, token: &str) -> Result<User, ApiError> {
        let request = self
            .inner
            .client
            .post(self.auth_url("/login"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    #[instrument(skip(self, token, user), fields(auth0_id = %user.auth0_id))]
    async fn register(&self, token: &str, user: &User) -> Result<User, ApiError> {
        let request = self
            .inner
            .client
            .post(self.auth_url("/register"))
            .bearer_auth(token)
            .json(user);
        self.send_json(request).await
    }

    #[instrument(skip(self, token, draft), fields(email = %draft.email, rol = %draft.rol))]
    async fn create_user(&self, token: &str, draft: &AccountDraft) -> Result<User, ApiError> {
        let request = self
            .inner
            .client
            .post(self.auth_url("/create"))
            .bearer_auth(token)
            .json(draft);
        self.send_json(request).await
    }

    #[instrument(skip(self, token))]
    async fn user_exists(&self, token: &str) -> Result<bool, ApiError> {
        let request = self
            .inner
            .client
            .get(self.auth_url("/validar"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    #[instrument(skip(self, token))]
    async fn list_users(&self, token: &str) -> Result<Vec<User>, ApiError> {
        let request = self
            .inner
            .client
            .get(self.auth_url("/usuarios"))
            .bearer_auth(token);
        self.send_json(request).await
    }

    #[instrument(skip(self, token), fields(id = %id, rol = %role))]
    async fn update_role(&self, token: &str, id: UserId, role: Role) -> Result<User, ApiError> {
        let request = self
            .inner
            .client
            .put(self.auth_url(&format!("/usuarios/{id}/rol")))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "text/plain")
            .body(role.as_str());
        self.send_json(request).await
    }

    #[instrument(skip(self, token))]
    async fn find_customer_by_username(
        &self,
        token: &str,
        username: &str,
    ) -> Result<Option<serde_json::Value>, ApiError> {
        let url = self.url(&format!(
            "/api/clientes/username/{}",
            urlencoding::encode(username)
        ));
        let response = self.inner.client.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        Ok((!value.is_null()).then_some(value))
    }

    #[instrument(skip(self, token, employee), fields(email = %employee.email))]
    async fn create_employee(&self, token: &str, employee: &Employee) -> Result<Employee, ApiError> {
        let request = self
            .inner
            .client
            .post(self.url("/api/empleados"))
            .bearer_auth(token)
            .json(employee);
        self.send_json(request).await
    }

    #[instrument(skip(self, token, files), fields(id = %id, count = files.len()))]
    async fn upload_employee_images(
        &self,
        token: &str,
        id: EmployeeId,
        files: Vec<Upload>,
    ) -> Result<Vec<Image>, ApiError> {
        let mut form = Form::new();
        for file in files {
            let mut part = Part::bytes(file.bytes).file_name(file.file_name);
            if let Some(content_type) = file.content_type {
                part = part.mime_str(&content_type)?;
            }
            form = form.part("uploads", part);
        }

        let request = self
            .inner
            .client
            .post(self.url(&format!("/api/empleados/{id}/uploads")))
            .bearer_auth(token)
            .multipart(form);
        self.send_json(request).await
    }
}
