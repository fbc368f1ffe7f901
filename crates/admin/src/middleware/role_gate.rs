//! Role gate for route groups.
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/usuarios", get(users::index))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         RoleGate::new(state.clone(), &[Role::Admin]),
//!         role_gate,
//!     ))
//! ```
//!
//! Every gated request looks the role up again, so a role change made by an
//! administrator takes effect on the user's next request.

use axum::{
    extract::{FromRef, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use buen_sabor_core::Role;

use super::auth::{RoleChecked, SessionContext};
use crate::services::guard::{self, GuardAction, GuardState};
use crate::state::AppState;

/// State for [`role_gate`]: the application plus the roles let through.
#[derive(Clone)]
pub struct RoleGate {
    state: AppState,
    allowed: &'static [Role],
}

impl RoleGate {
    #[must_use]
    pub const fn new(state: AppState, allowed: &'static [Role]) -> Self {
        Self { state, allowed }
    }
}

impl FromRef<RoleGate> for AppState {
    fn from_ref(gate: &RoleGate) -> Self {
        gate.state.clone()
    }
}

/// Let the request through only if the user's current role is allowed.
///
/// Unauthenticated users go to the entry page, with `returnTo` set for GET
/// requests only. Authenticated users without an allowed role go to `/`. A
/// token the API rejects signs the user out.
pub async fn role_gate(
    State(gate): State<RoleGate>,
    mut ctx: SessionContext,
    mut request: Request,
    next: Next,
) -> Response {
    let requested = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), |pq| pq.as_str().to_string());

    let (state, fetched) =
        guard::resolve(gate.state.backend(), ctx.access_token(), gate.allowed).await;

    if let Some(user) = fetched
        && let Err(e) = ctx.update_user(user).await
    {
        tracing::warn!(error = %e, "Failed to store refreshed role");
    }
    if state == GuardState::Unauthenticated && ctx.is_authenticated() {
        ctx.sign_out().await;
    }

    let action = match state.action(&requested) {
        Some(GuardAction::RedirectToEntry { .. }) if request.method() != Method::GET => {
            Some(GuardAction::RedirectHome)
        }
        action => action,
    };

    match action {
        Some(GuardAction::Render) => {
            request.extensions_mut().insert(RoleChecked);
            next.run(request).await
        }
        Some(action) => {
            tracing::info!(path = %requested, ?state, "Access denied by role gate");
            let location = action.location().unwrap_or_else(|| "/".to_string());
            Redirect::to(&location).into_response()
        }
        None => Redirect::to("/").into_response(),
    }
}
