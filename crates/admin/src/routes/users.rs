//! User administration route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use buen_sabor_core::{Role, User, UserId};
use serde::Deserialize;
use tracing::instrument;

use super::layout::Layout;
use crate::error::AppError;
use crate::middleware::{SessionContext, push_flash};
use crate::models::Flash;
use crate::services::users;
use crate::state::AppState;

/// Role `<option>` in a row's selector.
#[derive(Debug, Clone)]
pub struct RoleOption {
    pub value: &'static str,
    pub selected: bool,
}

/// One user in the table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub roles: Vec<RoleOption>,
    /// A role change for this user is still running.
    pub busy: bool,
}

impl UserRow {
    fn new(user: &User, busy: bool) -> Self {
        Self {
            id: user.id.map(|id| id.to_string()).unwrap_or_default(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.rol.map(|r| r.to_string()).unwrap_or_default(),
            roles: role_options(user.rol),
            busy,
        }
    }
}

/// Role options with `current` selected.
#[must_use]
pub fn role_options(current: Option<Role>) -> Vec<RoleOption> {
    Role::ALL
        .into_iter()
        .map(|role| RoleOption {
            value: role.as_str(),
            selected: Some(role) == current,
        })
        .collect()
}

/// User list template.
#[derive(Template, WebTemplate)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub layout: Layout,
    pub users: Vec<UserRow>,
}

/// Role change form.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub rol: String,
}

fn update_role_action(id: UserId) -> String {
    format!("update-role:{id}")
}

/// List users.
///
/// # Route
///
/// `GET /usuarios`
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    mut ctx: SessionContext,
) -> Result<Response, AppError> {
    let mut layout = Layout::new(&state, &mut ctx, "/usuarios").await;
    let token = ctx
        .access_token()
        .ok_or_else(|| AppError::Unauthorized("not signed in".to_string()))?;
    let actor = ctx.actor().unwrap_or_default();

    let users = match users::list_users(state.backend(), token).await {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list users");
            layout = layout.with_flash(Flash::error(e.user_message()));
            Vec::new()
        }
    };

    let rows = users
        .iter()
        .map(|user| {
            let busy = user.id.is_some_and(|id| {
                state
                    .in_flight()
                    .is_running(actor, &update_role_action(id))
            });
            UserRow::new(user, busy)
        })
        .collect();

    Ok(UsersIndexTemplate {
        layout,
        users: rows,
    }
    .into_response())
}

/// Change a user's role, then reload the list.
///
/// # Route
///
/// `POST /usuarios/{id}/rol`
#[instrument(skip_all, fields(user_id = %id, rol = %form.rol))]
pub async fn update_role(
    State(state): State<AppState>,
    ctx: SessionContext,
    Path(id): Path<UserId>,
    Form(form): Form<RoleForm>,
) -> Result<Response, AppError> {
    let token = ctx
        .access_token()
        .ok_or_else(|| AppError::Unauthorized("not signed in".to_string()))?;
    let actor = ctx.actor().unwrap_or_default();
    let session = ctx.session();

    let Ok(role) = form.rol.parse::<Role>() else {
        push_flash(session, Flash::error(format!("Unknown role: {}", form.rol))).await;
        return Ok(Redirect::to("/usuarios").into_response());
    };

    let Some(_guard) = state.in_flight().try_begin(actor, &update_role_action(id)) else {
        push_flash(
            session,
            Flash::error("A role change for this user is already in progress"),
        )
        .await;
        return Ok(Redirect::to("/usuarios").into_response());
    };

    let flash = match users::change_role(state.backend(), token, id, role).await {
        Ok(user) => Flash::success(format!(
            "{} is now {}",
            if user.username.is_empty() {
                &user.email
            } else {
                &user.username
            },
            user.rol.unwrap_or(role)
        )),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update role");
            Flash::error(e.user_message())
        }
    };
    push_flash(session, flash).await;

    Ok(Redirect::to("/usuarios").into_response())
}
