//! Active branch and company selection.
//!
//! The selection is kept in the session under the same names the storefront
//! uses for its browser storage, and survives logout.

use axum::{
    Form,
    extract::Path,
    response::{IntoResponse, Redirect, Response},
};
use buen_sabor_core::{BranchId, CompanyId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::safe_return_path;
use crate::error::AppError;
use crate::models::session_keys;

/// Form posted by the selector.
#[derive(Debug, Deserialize)]
pub struct SelectionForm {
    /// Page to return to.
    pub redirect: Option<String>,
}

/// Select the active branch.
///
/// # Route
///
/// `POST /sucursales/{id}/seleccionar`
#[instrument(skip_all, fields(branch_id = %id))]
pub async fn select_branch(
    session: Session,
    Path(id): Path<BranchId>,
    Form(form): Form<SelectionForm>,
) -> Result<Response, AppError> {
    session
        .insert(session_keys::ACTIVE_BRANCH, id.as_i64().to_string())
        .await?;
    Ok(back_to(form.redirect.as_deref()))
}

/// Select the active company.
///
/// # Route
///
/// `POST /empresas/{id}/seleccionar`
#[instrument(skip_all, fields(company_id = %id))]
pub async fn select_company(
    session: Session,
    Path(id): Path<CompanyId>,
    Form(form): Form<SelectionForm>,
) -> Result<Response, AppError> {
    session
        .insert(session_keys::ACTIVE_COMPANY, id.as_i64().to_string())
        .await?;
    Ok(back_to(form.redirect.as_deref()))
}

fn back_to(redirect: Option<&str>) -> Response {
    let target = safe_return_path(redirect).unwrap_or_else(|| "/".to_string());
    Redirect::to(&target).into_response()
}
