//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check
//! GET  /                                - Entry page (?returnTo=)
//! GET  /formulario-cliente              - Customer profile completion
//!
//! # Auth (identity provider)
//! GET  /auth/login                      - Start login (?returnTo=)
//! GET  /auth/register                   - Start sign-up (?returnTo=)
//! GET  /auth/callback                   - OAuth callback + bootstrap
//! POST /auth/logout                     - Logout (provider logout)
//!
//! # Selection
//! POST /sucursales/{id}/seleccionar     - Select active branch
//! POST /empresas/{id}/seleccionar       - Select active company
//!
//! # Users (Admin only)
//! GET  /usuarios                        - List users
//! POST /usuarios/{id}/rol               - Change a user's role
//! GET  /usuarios/nuevo                  - Creation wizard
//! POST /usuarios/nuevo                  - Wizard step (next/back/save)
//! POST /usuarios/nuevo/cancelar         - Discard the wizard
//! ```

pub mod auth;
pub mod home;
pub mod layout;
pub mod selection;
pub mod users;
pub mod wizard;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use buen_sabor_core::Role;

use crate::middleware::{RoleGate, role_gate};
use crate::state::AppState;

/// Roles allowed into user administration.
pub const USER_ADMIN_ROLES: &[Role] = &[Role::Admin];

/// Largest wizard submission (images included).
const WIZARD_BODY_LIMIT: usize = 20 * 1024 * 1024;

/// Build the application routes.
pub fn routes(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/usuarios", get(users::index))
        .route("/usuarios/{id}/rol", post(users::update_role))
        .route(
            "/usuarios/nuevo",
            get(wizard::show)
                .post(wizard::submit)
                .layer(DefaultBodyLimit::max(WIZARD_BODY_LIMIT)),
        )
        .route("/usuarios/nuevo/cancelar", post(wizard::cancel))
        .route_layer(from_fn_with_state(
            RoleGate::new(state.clone(), USER_ADMIN_ROLES),
            role_gate,
        ));

    Router::new()
        .route("/", get(home::index))
        .route("/formulario-cliente", get(home::customer_form))
        .route("/auth/login", get(auth::login))
        .route("/auth/register", get(auth::register))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/logout", post(auth::logout))
        .route("/sucursales/{id}/seleccionar", post(selection::select_branch))
        .route("/empresas/{id}/seleccionar", post(selection::select_company))
        .merge(admin)
}

/// Accept a post-login or post-action destination only if it stays on this site.
///
/// Allowed: absolute paths such as `/usuarios?page=2`. Rejected: scheme or
/// protocol-relative URLs, backslashes, and control characters.
#[must_use]
pub fn safe_return_path(raw: Option<&str>) -> Option<String> {
    let path = raw?.trim();
    let is_local = path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control);
    is_local.then(|| path.to_string())
}
