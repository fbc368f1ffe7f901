//! Exchange of an identity provider login for an application user.
//!
//! Runs once per login, right after the OAuth callback has produced an
//! access token and profile:
//!
//! 1. Ask the API whether the identity already has a user.
//! 2. Register it as a `Cliente` if not, log in otherwise.
//! 3. A `Cliente` without a customer profile is sent to complete one.
//!
//! Any error is returned to the caller, which must end the provider session;
//! there is no retry.

use buen_sabor_core::{Role, User};
use tracing::instrument;

use crate::api::{ApiError, Backend};
use crate::identity::Profile;

/// Where the user should land after a successful bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Ready to use the application.
    Ready(User),
    /// A client that has not filled in the customer profile yet.
    NeedsCustomerProfile(User),
}

impl BootstrapOutcome {
    #[must_use]
    pub const fn user(&self) -> &User {
        match self {
            Self::Ready(user) | Self::NeedsCustomerProfile(user) => user,
        }
    }

    #[must_use]
    pub fn into_user(self) -> User {
        match self {
            Self::Ready(user) | Self::NeedsCustomerProfile(user) => user,
        }
    }
}

/// Registration draft built from the provider profile.
///
/// Missing profile fields become empty strings.
#[must_use]
pub fn registration_from(profile: &Profile) -> User {
    User::registration(
        profile.sub.clone(),
        profile.name.clone().unwrap_or_default(),
        profile.email.clone().unwrap_or_default(),
    )
}

/// Register or log in the token's identity.
///
/// # Errors
///
/// Returns the first API error encountered.
#[instrument(skip(backend, token, profile), fields(sub = %profile.sub))]
pub async fn bootstrap<B: Backend>(
    backend: &B,
    token: &str,
    profile: &Profile,
) -> Result<BootstrapOutcome, ApiError> {
    let user = if backend.user_exists(token).await? {
        backend.login(token).await?
    } else {
        tracing::info!("First login, registering user");
        backend.register(token, &registration_from(profile)).await?
    };

    if user.rol == Some(Role::Cliente)
        && backend
            .find_customer_by_username(token, &user.username)
            .await?
            .is_none()
    {
        tracing::info!(username = %user.username, "Client has no customer profile");
        return Ok(BootstrapOutcome::NeedsCustomerProfile(user));
    }

    Ok(BootstrapOutcome::Ready(user))
}
