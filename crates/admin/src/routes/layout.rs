//! Data shared by every page: sidebar, user badge and notifications.

use buen_sabor_core::Role;
use buen_sabor_core::navigation::routes_for;

use crate::middleware::SessionContext;
use crate::models::Flash;
use crate::state::AppState;

/// Sidebar link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub path: &'static str,
    pub label: &'static str,
    pub active: bool,
}

/// Page chrome rendered by `base.html`.
#[derive(Debug, Clone)]
pub struct Layout {
    pub nav: Vec<NavLink>,
    pub authenticated: bool,
    pub user_name: String,
    pub role: String,
    pub active_branch: String,
    pub active_company: String,
    pub flashes: Vec<Flash>,
    /// `returnTo` value for the login and sign-up links.
    pub return_to: String,
}

impl Layout {
    /// Build the chrome for `current_path`, consuming pending notifications.
    ///
    /// The sidebar uses the role as the API reports it now, not the one
    /// stored at login.
    pub async fn new(state: &AppState, ctx: &mut SessionContext, current_path: &str) -> Self {
        ctx.refresh_role(state.backend()).await;
        let flashes = ctx.take_flashes().await;
        Self::build(ctx, current_path, flashes)
    }

    fn build(ctx: &SessionContext, current_path: &str, flashes: Vec<Flash>) -> Self {
        let user = ctx.current_user();
        Self {
            nav: nav_links(ctx.role(), current_path),
            authenticated: ctx.is_authenticated(),
            user_name: user.map(|u| u.display_name().to_string()).unwrap_or_default(),
            role: ctx.role().map(|r| r.to_string()).unwrap_or_default(),
            active_branch: ctx.active_branch().to_string(),
            active_company: ctx.active_company().to_string(),
            flashes,
            return_to: urlencoding::encode(current_path).into_owned(),
        }
    }

    /// Add a notification that was not stored in the session.
    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flashes.push(flash);
        self
    }
}

/// Sidebar for a role, marking the entry for `current_path` as active.
#[must_use]
pub fn nav_links(role: Option<Role>, current_path: &str) -> Vec<NavLink> {
    routes_for(role)
        .into_iter()
        .map(|item| NavLink {
            path: item.path,
            label: item.label,
            active: item.path == current_path,
        })
        .collect()
}
