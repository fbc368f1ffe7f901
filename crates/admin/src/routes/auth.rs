//! Identity provider login route handlers.
//!
//! Handles the OAuth flow against the identity provider:
//! - Login / Register: redirect to the provider's authorization page
//! - Callback: exchange the code, then register or log in against the API
//! - Logout: forget the session and redirect to the provider logout

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rand::{Rng, distr::Alphanumeric};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::safe_return_path;
use crate::middleware::{clear_authentication, push_flash, set_authentication};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::services::{BootstrapOutcome, bootstrap};
use crate::state::AppState;

/// Shown when anything after the provider redirect fails.
const LOGIN_FAILED_MESSAGE: &str = "We could not sign you in. Please try again.";

/// Query parameters of the login and sign-up entry points.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// Query parameters from the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

fn generate_random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Start a login.
///
/// # Route
///
/// `GET /auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Response {
    start(&state, &session, query.return_to.as_deref(), false).await
}

/// Start a sign-up.
///
/// # Route
///
/// `GET /auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Response {
    start(&state, &session, query.return_to.as_deref(), true).await
}

async fn start(
    state: &AppState,
    session: &Session,
    return_to: Option<&str>,
    signup: bool,
) -> Response {
    let oauth_state = generate_random_string(32);

    let stored = async {
        session.insert(session_keys::OAUTH_STATE, &oauth_state).await?;
        match safe_return_path(return_to) {
            Some(path) => session.insert(session_keys::RETURN_TO, path).await,
            None => session.remove_value(session_keys::RETURN_TO).await.map(|_| ()),
        }
    }
    .await;

    if let Err(e) = stored {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        push_flash(session, Flash::error(LOGIN_FAILED_MESSAGE)).await;
        return Redirect::to("/").into_response();
    }

    let auth_url = state.identity().authorization_url(&oauth_state, signup);
    Redirect::to(&auth_url).into_response()
}

/// Handle the provider callback.
///
/// Validates the state parameter, exchanges the code for tokens, loads the
/// profile, and registers or logs the user in against the restaurant API.
/// A failure after the code was issued signs the user out of the provider
/// too, so a half-finished login never lingers.
///
/// # Route
///
/// `GET /auth/callback`
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "Identity provider returned an error");
        push_flash(&session, Flash::error(LOGIN_FAILED_MESSAGE)).await;
        return Redirect::to("/").into_response();
    }

    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        tracing::warn!("OAuth callback missing code or state");
        push_flash(&session, Flash::error(LOGIN_FAILED_MESSAGE)).await;
        return Redirect::to("/").into_response();
    };

    let stored_state: Option<String> = match session.remove(session_keys::OAUTH_STATE).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read OAuth state from session");
            None
        }
    };

    if stored_state.as_deref() != Some(returned_state.as_str()) {
        tracing::warn!("OAuth state mismatch");
        push_flash(&session, Flash::error(LOGIN_FAILED_MESSAGE)).await;
        return Redirect::to("/").into_response();
    }

    let return_to: Option<String> = match session.remove(session_keys::RETURN_TO).await {
        Ok(stored) => stored,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read return path from session");
            None
        }
    };

    let token = match state.identity().exchange_code(&code).await {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Failed to exchange authorization code");
            return forced_logout(&state, &session).await;
        }
    };

    let profile = match state.identity().user_info(&token.access_token).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load identity profile");
            return forced_logout(&state, &session).await;
        }
    };

    let outcome = match bootstrap(state.backend(), &token.access_token, &profile).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, sub = %profile.sub, "Login bootstrap failed");
            return forced_logout(&state, &session).await;
        }
    };

    let needs_profile = matches!(outcome, BootstrapOutcome::NeedsCustomerProfile(_));
    let current = CurrentUser {
        user: outcome.into_user(),
        profile,
    };

    if let Err(e) = set_authentication(&session, &current, &token).await {
        tracing::error!(error = %e, "Failed to store authentication in session");
        return forced_logout(&state, &session).await;
    }

    tracing::info!(user_id = ?current.user.id, role = ?current.role(), "User signed in");

    if needs_profile {
        return Redirect::to("/formulario-cliente").into_response();
    }
    let target = safe_return_path(return_to.as_deref()).unwrap_or_else(|| "/".to_string());
    Redirect::to(&target).into_response()
}

async fn forced_logout(state: &AppState, session: &Session) -> Response {
    if let Err(e) = clear_authentication(session).await {
        tracing::warn!(error = %e, "Failed to clear session");
    }
    push_flash(session, Flash::error(LOGIN_FAILED_MESSAGE)).await;
    let url = state.identity().logout_url(&state.config().base_url);
    Redirect::to(&url).into_response()
}

/// Sign out locally and at the provider.
///
/// # Route
///
/// `POST /auth/logout`
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = clear_authentication(&session).await {
        tracing::warn!(error = %e, "Failed to clear session on logout");
    }
    let url = state.identity().logout_url(&state.config().base_url);
    Redirect::to(&url).into_response()
}
