//! Restaurant API integration.
//!
//! The admin panel owns no data: users, employees and customers live in the
//! restaurant API. Every call is made with the signed-in user's bearer token.
//!
//! # Endpoints
//!
//! | Call | Method | Path |
//! |---|---|---|
//! | login | POST | `/api/auth/login` |
//! | register | POST | `/api/auth/register` |
//! | create account | POST | `/api/auth/create` |
//! | existence check | GET | `/api/auth/validar` |
//! | list users | GET | `/api/auth/usuarios` |
//! | update role | PUT | `/api/auth/usuarios/{id}/rol` (`text/plain` body) |
//! | customer by username | GET | `/api/clientes/username/{username}` |
//! | create employee | POST | `/api/empleados` |
//! | upload employee images | POST | `/api/empleados/{id}/uploads` (multipart) |
//!
//! Handlers and services talk to the [`Backend`] trait so they can be
//! exercised against in-memory fakes; [`BackendClient`] is the HTTP
//! implementation.

mod client;
#[cfg(test)]
pub(crate) mod fake;

pub use client::BackendClient;

use std::future::Future;

use buen_sabor_core::{AccountDraft, Employee, EmployeeId, Image, Role, User, UserId};
use thiserror::Error;

/// Message shown when the API fails without saying why.
pub const GENERIC_ERROR_MESSAGE: &str = "Error processing the request";

/// Errors that can occur when calling the restaurant API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response arrived (connect, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The body's `error` field, or [`GENERIC_ERROR_MESSAGE`].
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Status { message, .. } => message,
            Self::Http(_) | Self::Parse(_) => GENERIC_ERROR_MESSAGE,
        }
    }

    /// Whether the API rejected the bearer token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// A file selected in the creation wizard.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Operations the admin panel needs from the restaurant API.
///
/// Every method takes the caller's access token.
pub trait Backend: Send + Sync {
    /// Sync the token's identity and return its application user.
    fn login(&self, token: &str) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// Register a first-time identity.
    fn register(
        &self,
        token: &str,
        user: &User,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// Create an account on behalf of an administrator.
    fn create_user(
        &self,
        token: &str,
        draft: &AccountDraft,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// Whether the token's identity already has an application user.
    fn user_exists(&self, token: &str) -> impl Future<Output = Result<bool, ApiError>> + Send;

    fn list_users(&self, token: &str) -> impl Future<Output = Result<Vec<User>, ApiError>> + Send;

    fn update_role(
        &self,
        token: &str,
        id: UserId,
        role: Role,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;

    /// The customer profile linked to a username, if any.
    ///
    /// The profile is opaque to the admin panel; only its presence matters.
    fn find_customer_by_username(
        &self,
        token: &str,
        username: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, ApiError>> + Send;

    fn create_employee(
        &self,
        token: &str,
        employee: &Employee,
    ) -> impl Future<Output = Result<Employee, ApiError>> + Send;

    fn upload_employee_images(
        &self,
        token: &str,
        id: EmployeeId,
        files: Vec<Upload>,
    ) -> impl Future<Output = Result<Vec<Image>, ApiError>> + Send;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_backend_message() {
        let err = ApiError::Status {
            status: 409,
            message: "El email ya existe".to_string(),
        };
        assert_eq!(err.to_string(), "El email ya existe");
        assert_eq!(err.user_message(), "El email ya existe");
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_parse_error_hides_details_from_users() {
        let parse = serde_json::from_str::<User>("not json").unwrap_err();
        let err = ApiError::from(parse);
        assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_unauthorized_status() {
        let err = ApiError::Status {
            status: 401,
            message: GENERIC_ERROR_MESSAGE.to_string(),
        };
        assert!(err.is_unauthorized());
    }
}
