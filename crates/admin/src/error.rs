//! Handler-level errors.
//!
//! Restaurant API and identity provider failures never reach [`AppError`]:
//! handlers turn them into flash notifications or a forced logout. What is
//! left is a malformed request, a missing sign-in, or a broken session store.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use buen_sabor_core::User;
use thiserror::Error;

/// Error returned by admin handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// The session store could not be read or written.
    #[error("session store failed: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The handler needs a signed-in user.
    #[error("not signed in: {0}")]
    Unauthorized(String),

    /// The submitted form could not be read.
    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    const fn is_server_error(&self) -> bool {
        matches!(self, Self::Session(_) | Self::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if !self.is_server_error() {
            return (status, self.to_string()).into_response();
        }

        let event_id = sentry::capture_error(&self);
        tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");
        (status, "Something went wrong. Please try again.").into_response()
    }
}

/// Attach the signed-in application user to Sentry events, or detach it.
pub fn scope_sentry_user(user: Option<&User>) {
    sentry::configure_scope(|scope| {
        scope.set_user(user.map(|user| sentry::User {
            id: user.id.map(|id| id.to_string()),
            email: Some(user.email.clone()),
            username: Some(user.username.clone()),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn test_client_errors_explain_themselves() {
        let (status, body) = body_of(AppError::BadRequest("missing action".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "malformed request: missing action");

        let (status, _) = body_of(AppError::Unauthorized("no token".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let (status, body) = body_of(AppError::Internal("session layer missing".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("session layer"));
    }
}
