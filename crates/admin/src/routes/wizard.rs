//! User + employee creation wizard route handlers.
//!
//! The [`Wizard`] lives in the session between requests. Every step posts the
//! whole form as multipart; the `action` field says whether to go forward,
//! go back, or save. Images are only read on save, since file inputs do not
//! survive a round trip.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, State},
    response::{IntoResponse, Redirect, Response},
};
use buen_sabor_core::wizard::{Field, Step, Wizard};
use tower_sessions::Session;
use tracing::instrument;

use super::layout::Layout;
use super::users::{RoleOption, role_options};
use crate::api::Upload;
use crate::error::AppError;
use crate::middleware::{SessionContext, push_flash};
use crate::models::{Flash, session_keys};
use crate::services::users;
use crate::state::AppState;

const WIZARD_PATH: &str = "/usuarios/nuevo";

/// In-flight key of a save, per actor.
const SAVE_ACTION: &str = "save-user";

/// What the submitted button asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    Next,
    Back,
    Save,
}

impl WizardAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "next" => Some(Self::Next),
            "back" => Some(Self::Back),
            "save" => Some(Self::Save),
            _ => None,
        }
    }
}

/// A decoded wizard submission.
#[derive(Debug, Default)]
pub struct WizardForm {
    pub action: Option<WizardAction>,
    pub values: Vec<(Field, String)>,
    pub uploads: Vec<Upload>,
}

/// Copy submitted values into the wizard.
///
/// Only changed values are written, so errors on untouched fields stay
/// visible. The password is never sent back to the browser; an empty
/// password keeps the one already entered.
pub fn apply(wizard: &mut Wizard, values: Vec<(Field, String)>) {
    for (field, value) in values {
        let current = wizard.value(field);
        if field == Field::Password && value.is_empty() && !current.is_empty() {
            continue;
        }
        if current != value {
            wizard.set(field, value);
        }
    }
}

/// Step indicator entry.
#[derive(Debug, Clone)]
pub struct StepView {
    pub number: usize,
    pub title: &'static str,
    pub current: bool,
    pub done: bool,
}

/// Form input on the current step.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub input_type: &'static str,
    pub value: String,
    pub error: String,
    /// A value is stored but not shown (password).
    pub kept: bool,
}

fn label(field: Field) -> &'static str {
    match field {
        Field::Name => "Name",
        Field::Surname => "Surname",
        Field::Phone => "Phone",
        Field::BirthDate => "Birth date",
        Field::Email => "Email",
        Field::Password => "Password",
        Field::Role => "Role",
    }
}

fn input_type(field: Field) -> &'static str {
    match field {
        Field::BirthDate => "date",
        Field::Email => "email",
        Field::Password => "password",
        Field::Phone => "tel",
        Field::Role => "select",
        Field::Name | Field::Surname => "text",
    }
}

fn field_views(wizard: &Wizard) -> Vec<FieldView> {
    Field::ALL
        .into_iter()
        .filter(|f| f.step() == wizard.step())
        .map(|field| {
            let stored = wizard.value(field);
            let hidden = field == Field::Password;
            FieldView {
                name: field.as_str(),
                label: label(field),
                input_type: input_type(field),
                value: if hidden { String::new() } else { stored.to_string() },
                error: wizard.error(field).unwrap_or_default().to_string(),
                kept: hidden && !stored.is_empty(),
            }
        })
        .collect()
}

fn step_views(current: Step) -> Vec<StepView> {
    Step::ALL
        .into_iter()
        .map(|step| StepView {
            number: step.index() + 1,
            title: step.title(),
            current: step == current,
            done: step.index() < current.index(),
        })
        .collect()
}

/// Wizard page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/wizard.html")]
pub struct WizardTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub title: &'static str,
    pub fields: Vec<FieldView>,
    pub roles: Vec<RoleOption>,
    pub is_first: bool,
    pub is_last: bool,
    pub show_images: bool,
    pub saving: bool,
}

async fn load_wizard(session: &Session) -> Wizard {
    session
        .get(session_keys::USER_WIZARD)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Show the current step.
///
/// # Route
///
/// `GET /usuarios/nuevo`
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, mut ctx: SessionContext) -> Response {
    let wizard = load_wizard(ctx.session()).await;
    let step = wizard.step();
    let saving = ctx
        .actor()
        .is_some_and(|actor| state.in_flight().is_running(actor, SAVE_ACTION));

    WizardTemplate {
        layout: Layout::new(&state, &mut ctx, "/usuarios").await,
        steps: step_views(step),
        title: step.title(),
        fields: field_views(&wizard),
        roles: role_options(wizard.account().role),
        is_first: step.is_first(),
        is_last: step.is_last(),
        show_images: step == Step::Images,
        saving,
    }
    .into_response()
}

async fn read_form(mut multipart: Multipart) -> Result<WizardForm, AppError> {
    let bad = |e: axum::extract::multipart::MultipartError| AppError::BadRequest(e.body_text());
    let mut form = WizardForm::default();

    while let Some(part) = multipart.next_field().await.map_err(bad)? {
        let Some(name) = part.name().map(str::to_string) else {
            continue;
        };

        if name == "images" {
            let file_name = part.file_name().unwrap_or_default().to_string();
            let content_type = part.content_type().map(str::to_string);
            let bytes = part.bytes().await.map_err(bad)?;
            if !file_name.is_empty() && !bytes.is_empty() {
                form.uploads.push(Upload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = part.text().await.map_err(bad)?;
        if name == "action" {
            form.action = WizardAction::parse(&value);
        } else if let Some(field) = Field::from_name(&name) {
            form.values.push((field, value));
        }
    }

    Ok(form)
}

/// Apply a step submission.
///
/// # Route
///
/// `POST /usuarios/nuevo`
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    ctx: SessionContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_form(multipart).await?;
    let action = form
        .action
        .ok_or_else(|| AppError::BadRequest("missing or unknown action".to_string()))?;

    let session = ctx.session();
    let mut wizard = load_wizard(session).await;
    apply(&mut wizard, form.values);

    match action {
        WizardAction::Next => {
            wizard.next();
        }
        WizardAction::Back => wizard.back(),
        WizardAction::Save => return save(&state, &ctx, wizard, form.uploads).await,
    }

    session.insert(session_keys::USER_WIZARD, &wizard).await?;
    Ok(Redirect::to(WIZARD_PATH).into_response())
}

async fn save(
    state: &AppState,
    ctx: &SessionContext,
    mut wizard: Wizard,
    uploads: Vec<Upload>,
) -> Result<Response, AppError> {
    let session = ctx.session();
    let token = ctx
        .access_token()
        .ok_or_else(|| AppError::Unauthorized("not signed in".to_string()))?;
    let actor = ctx.actor().unwrap_or_default();

    let Some(_guard) = state.in_flight().try_begin(actor, SAVE_ACTION) else {
        session.insert(session_keys::USER_WIZARD, &wizard).await?;
        push_flash(session, Flash::error("A save is already in progress")).await;
        return Ok(Redirect::to(WIZARD_PATH).into_response());
    };

    let submission = match wizard.submission() {
        Ok(submission) => submission,
        Err(errors) => {
            tracing::debug!(invalid = errors.len(), "Wizard submission rejected");
            session.insert(session_keys::USER_WIZARD, &wizard).await?;
            push_flash(session, Flash::error("Please fix the highlighted fields")).await;
            return Ok(Redirect::to(WIZARD_PATH).into_response());
        }
    };

    match users::save_employee(state.backend(), token, submission, uploads).await {
        Ok(outcome) => {
            session.remove_value(session_keys::USER_WIZARD).await?;
            push_flash(
                session,
                Flash::success(format!(
                    "{} {} was created",
                    outcome.employee.name, outcome.employee.surname
                )),
            )
            .await;
            Ok(Redirect::to("/usuarios").into_response())
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to save user");
            session.insert(session_keys::USER_WIZARD, &wizard).await?;
            push_flash(session, Flash::error(e.user_message())).await;
            Ok(Redirect::to(WIZARD_PATH).into_response())
        }
    }
}

/// Discard the wizard.
///
/// # Route
///
/// `POST /usuarios/nuevo/cancelar`
#[instrument(skip_all)]
pub async fn cancel(session: Session) -> Result<Response, AppError> {
    session.remove_value(session_keys::USER_WIZARD).await?;
    Ok(Redirect::to("/usuarios").into_response())
}
