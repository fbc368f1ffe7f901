//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, BackendClient};
use crate::config::AdminConfig;
use crate::identity::{IdentityClient, IdentityError};
use crate::services::InFlight;

/// Error creating the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("backend client: {0}")]
    Backend(#[from] ApiError),
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the API clients, configuration and the in-flight registry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    backend: BackendClient,
    identity: IdentityClient,
    in_flight: InFlight,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: AdminConfig) -> Result<Self, StateError> {
        let backend = BackendClient::new(&config.backend)?;
        let identity = IdentityClient::new(&config.identity)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                identity,
                in_flight: InFlight::new(),
            }),
        })
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the restaurant API client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Get a reference to the registry of running mutations.
    #[must_use]
    pub fn in_flight(&self) -> &InFlight {
        &self.inner.in_flight
    }
}
