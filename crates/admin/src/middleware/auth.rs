//! Per-request session context and session helpers.
//!
//! [`SessionContext`] is the handler-facing view of the session: who is
//! signed in, their access token, and the branch/company selection. Expired
//! access tokens are refreshed while extracting; if that fails the user is
//! signed out and the request continues unauthenticated.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use buen_sabor_core::{Role, User};
use tower_sessions::Session;

use crate::api::Backend;
use crate::error::{AppError, scope_sentry_user};
use crate::identity::{IdentityClient, IdentityToken};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Signed-in identity stored in the session.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: CurrentUser,
    pub token: IdentityToken,
}

/// Request extension set by the role gate once it has looked the role up.
#[derive(Debug, Clone, Copy)]
pub struct RoleChecked;

/// Extractor exposing the session to handlers.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(ctx: SessionContext) -> impl IntoResponse {
///     match ctx.current_user() {
///         Some(user) => format!("Hola, {}!", user.display_name()),
///         None => "Hola!".to_string(),
///     }
/// }
/// ```
pub struct SessionContext {
    session: Session,
    auth: Option<Authenticated>,
    active_branch: String,
    active_company: String,
    role_checked: bool,
}

impl<S> FromRequestParts<S> for SessionContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let auth = load_authenticated(&session, app.identity()).await;
        scope_sentry_user(auth.as_ref().map(|a| &a.user.user));

        let active_branch = get_string(&session, session_keys::ACTIVE_BRANCH).await;
        let active_company = get_string(&session, session_keys::ACTIVE_COMPANY).await;
        let role_checked = parts.extensions.get::<RoleChecked>().is_some();

        Ok(Self {
            session,
            auth,
            active_branch,
            active_company,
            role_checked,
        })
    }
}

impl SessionContext {
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<&CurrentUser> {
        self.auth.as_ref().map(|a| &a.user)
    }

    /// Bearer token for the restaurant API.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.auth.as_ref().map(|a| a.token.access_token.as_str())
    }

    /// Role as last seen by the bootstrap or the role gate.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.current_user().and_then(CurrentUser::role)
    }

    /// Stable identifier of the signed-in user, for keying in-flight work.
    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        self.current_user().map(|u| u.profile.sub.as_str())
    }

    /// Selected branch id, empty when none.
    #[must_use]
    pub fn active_branch(&self) -> &str {
        &self.active_branch
    }

    /// Selected company id, empty when none.
    #[must_use]
    pub fn active_company(&self) -> &str {
        &self.active_company
    }

    /// Replace the stored application user (e.g. after a role lookup).
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn update_user(&mut self, user: User) -> Result<(), tower_sessions::session::Error> {
        if let Some(auth) = &mut self.auth {
            auth.user.user = user;
            self.session
                .insert(session_keys::CURRENT_USER, &auth.user)
                .await?;
        }
        Ok(())
    }

    /// Look the role up again so the page shows the current one.
    ///
    /// Skipped when the role gate already did it for this request. A rejected
    /// token signs the user out; other failures keep the stored role.
    pub async fn refresh_role<B: Backend>(&mut self, backend: &B) {
        if self.role_checked {
            return;
        }
        let Some(token) = self.access_token().map(str::to_owned) else {
            return;
        };
        self.role_checked = true;

        match backend.login(&token).await {
            Ok(user) => {
                if let Err(e) = self.update_user(user).await {
                    tracing::warn!(error = %e, "Failed to store refreshed role");
                }
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Access token rejected by the API, signing out");
                self.sign_out().await;
            }
            Err(e) => tracing::warn!(error = %e, "Role lookup failed, keeping stored role"),
        }
    }

    /// Forget the signed-in identity, here and in the session.
    pub async fn sign_out(&mut self) {
        self.auth = None;
        scope_sentry_user(None);
        if let Err(e) = clear_authentication(&self.session).await {
            tracing::warn!(error = %e, "Failed to clear session");
        }
    }

    /// Remove and return the pending notifications.
    pub async fn take_flashes(&self) -> Vec<Flash> {
        take_flashes(&self.session).await
    }
}

async fn get_string(session: &Session, key: &str) -> String {
    session
        .get::<String>(key)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

async fn load_authenticated(session: &Session, identity: &IdentityClient) -> Option<Authenticated> {
    let user: CurrentUser = session
        .get(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()?;
    let token: IdentityToken = session
        .get(session_keys::IDENTITY_TOKEN)
        .await
        .ok()
        .flatten()?;

    if !token.is_expired() {
        return Some(Authenticated { user, token });
    }

    match identity.refresh(&token).await {
        Ok(fresh) => {
            if let Err(e) = session.insert(session_keys::IDENTITY_TOKEN, &fresh).await {
                tracing::warn!(error = %e, "Failed to store refreshed token");
            }
            tracing::debug!("Access token refreshed");
            Some(Authenticated { user, token: fresh })
        }
        Err(e) => {
            tracing::warn!(error = %e, "Token refresh failed, signing out");
            if let Err(e) = clear_authentication(session).await {
                tracing::warn!(error = %e, "Failed to clear session after refresh failure");
            }
            None
        }
    }
}

/// Store the signed-in identity.
///
/// The session id is cycled first so a pre-login id cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_authentication(
    session: &Session,
    user: &CurrentUser,
    token: &IdentityToken,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    session.insert(session_keys::IDENTITY_TOKEN, token).await
}

/// Forget the signed-in identity.
///
/// Branch and company selection are kept, like browser storage would.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_authentication(session: &Session) -> Result<(), tower_sessions::session::Error> {
    for key in [
        session_keys::CURRENT_USER,
        session_keys::IDENTITY_TOKEN,
        session_keys::USER_WIZARD,
    ] {
        session.remove_value(key).await?;
    }
    Ok(())
}

/// Queue a notification for the next rendered page.
///
/// Failures are logged; a lost notification never fails the request.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut pending: Vec<Flash> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(flash);
    if let Err(e) = session.insert(session_keys::FLASH, &pending).await {
        tracing::warn!(error = %e, "Failed to store notification");
    }
}

/// Remove and return the pending notifications.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(session_keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read notifications");
            Vec::new()
        }
    }
}
