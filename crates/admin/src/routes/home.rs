//! Entry page and customer profile landing page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use super::layout::Layout;
use super::safe_return_path;
use crate::middleware::SessionContext;
use crate::state::AppState;

/// Query parameters of the entry page.
#[derive(Debug, Deserialize)]
pub struct EntryQuery {
    /// Page the user tried to open before being sent here.
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

/// Entry page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    /// The visitor was bounced here from a protected page.
    pub pending: bool,
}

/// Customer profile completion template.
#[derive(Template, WebTemplate)]
#[template(path = "customer_form.html")]
pub struct CustomerFormTemplate {
    pub layout: Layout,
}

/// Entry page.
///
/// Signed-in users with a pending `returnTo` are sent there; everyone else
/// sees the landing page with login links that carry `returnTo` along.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    mut ctx: SessionContext,
    Query(query): Query<EntryQuery>,
) -> Response {
    let return_to = safe_return_path(query.return_to.as_deref());

    if ctx.is_authenticated()
        && let Some(path) = &return_to
    {
        return Redirect::to(path).into_response();
    }

    let mut layout = Layout::new(&state, &mut ctx, "/").await;
    if let Some(path) = &return_to {
        layout.return_to = urlencoding::encode(path).into_owned();
    }

    HomeTemplate {
        pending: return_to.is_some(),
        layout,
    }
    .into_response()
}

/// Landing page for clients without a customer profile.
#[instrument(skip_all)]
pub async fn customer_form(State(state): State<AppState>, mut ctx: SessionContext) -> Response {
    if !ctx.is_authenticated() {
        return Redirect::to("/?returnTo=%2Fformulario-cliente").into_response();
    }

    CustomerFormTemplate {
        layout: Layout::new(&state, &mut ctx, "/formulario-cliente").await,
    }
    .into_response()
}
