//! User administration: listing, role changes, and account + employee creation.

use std::fmt;

use buen_sabor_core::wizard::Submission;
use buen_sabor_core::{Employee, Role, User, UserId};
use thiserror::Error;
use tracing::instrument;

use crate::api::{ApiError, Backend, Upload};

/// List every user.
///
/// # Errors
///
/// Returns the API error; callers render an empty list in that case.
#[instrument(skip(backend, token))]
pub async fn list_users<B: Backend>(backend: &B, token: &str) -> Result<Vec<User>, ApiError> {
    let mut users = backend.list_users(token).await?;
    users.sort_by_key(|u| u.id);
    Ok(users)
}

/// Change a user's role.
///
/// Nothing is applied locally; the caller reloads the list afterwards so
/// the page shows what the API stored.
///
/// # Errors
///
/// Returns the API error unchanged.
#[instrument(skip(backend, token))]
pub async fn change_role<B: Backend>(
    backend: &B,
    token: &str,
    id: UserId,
    role: Role,
) -> Result<User, ApiError> {
    let updated = backend.update_role(token, id, role).await?;
    tracing::info!(id = %id, rol = %role, "Role updated");
    Ok(updated)
}

/// Steps of saving a new user + employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStage {
    CreateAccount,
    CreateEmployee,
    UploadImages,
}

impl fmt::Display for SaveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateAccount => "creating the account",
            Self::CreateEmployee => "creating the employee",
            Self::UploadImages => "uploading images",
        })
    }
}

/// A save that stopped part-way.
///
/// Earlier stages are not rolled back: the API offers no way to delete an
/// account. `account` names what was left behind, if anything.
#[derive(Debug, Error)]
#[error("Failed while {stage}: {source}")]
pub struct SaveError {
    pub stage: SaveStage,
    pub account: Option<UserId>,
    #[source]
    pub source: ApiError,
}

impl SaveError {
    /// Message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.account {
            Some(id) => format!(
                "{} (failed while {}; account {id} was already created)",
                self.source.user_message(),
                self.stage
            ),
            None => self.source.user_message().to_string(),
        }
    }
}

/// Result of a complete save.
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub account: User,
    pub employee: Employee,
}

/// Create the account, then the employee linked to it, then upload images.
///
/// # Errors
///
/// Returns the stage that failed and the account created before it, if any.
#[instrument(skip_all, fields(email = %submission.account.email, images = uploads.len()))]
pub async fn save_employee<B: Backend>(
    backend: &B,
    token: &str,
    submission: Submission,
    uploads: Vec<Upload>,
) -> Result<SaveOutcome, SaveError> {
    let Submission {
        account: draft,
        mut employee,
    } = submission;

    let account = backend
        .create_user(token, &draft)
        .await
        .map_err(|source| SaveError {
            stage: SaveStage::CreateAccount,
            account: None,
            source,
        })?;

    let account_id = account.id;
    employee.attach_account(account.clone());

    let fail = |stage: SaveStage| {
        move |source: ApiError| {
            tracing::error!(
                account_id = ?account_id,
                %stage,
                error = %source,
                "Save failed after the account was created"
            );
            SaveError {
                stage,
                account: account_id,
                source,
            }
        }
    };

    let mut employee = backend
        .create_employee(token, &employee)
        .await
        .map_err(fail(SaveStage::CreateEmployee))?;

    if let Some(employee_id) = employee.id
        && !uploads.is_empty()
    {
        let images = backend
            .upload_employee_images(token, employee_id, uploads)
            .await
            .map_err(fail(SaveStage::UploadImages))?;
        employee.images.extend(images);
    }

    tracing::info!(account_id = ?account_id, employee_id = ?employee.id, "Employee created");
    Ok(SaveOutcome { account, employee })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeBackend, FakeState};
    use buen_sabor_core::wizard::{Field, Wizard};

    fn submission() -> Submission {
        let mut w = Wizard::new();
        w.set(Field::Name, "Lucia");
        w.set(Field::Surname, "Gomez");
        w.set(Field::Phone, "2615550000");
        w.set(Field::BirthDate, "1995-04-12");
        w.set(Field::Email, "lucia@buensabor.com");
        w.set(Field::Password, "Abcdefg1");
        w.set(Field::Role, "Cocinero");
        w.submission().unwrap()
    }

    fn upload(name: &str) -> Upload {
        Upload {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[tokio::test]
    async fn test_role_change_then_list_shows_new_role() {
        let backend = FakeBackend::with(FakeState {
            users: vec![User {
                id: Some(UserId::new(1)),
                rol: Some(Role::Cliente),
                ..User::default()
            }],
            ..FakeState::default()
        });

        change_role(&backend, "tok", UserId::new(1), Role::Cocinero)
            .await
            .unwrap();
        let users = list_users(&backend, "tok").await.unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].rol, Some(Role::Cocinero));
    }

    #[tokio::test]
    async fn test_save_runs_every_stage_in_order() {
        let backend = FakeBackend::default();

        let outcome = save_employee(&backend, "tok", submission(), vec![upload("a.png")])
            .await
            .unwrap();

        assert_eq!(
            backend.calls(),
            vec!["create_user", "create_employee", "upload_images"]
        );
        assert_eq!(outcome.employee.email, "lucia@buensabor.com");
        assert_eq!(
            outcome.employee.user.as_ref().and_then(|u| u.id),
            outcome.account.id
        );
        assert_eq!(outcome.employee.images.len(), 1);
        assert_eq!(outcome.account.rol, Some(Role::Cocinero));
    }

    #[tokio::test]
    async fn test_save_without_images_skips_upload() {
        let backend = FakeBackend::default();
        save_employee(&backend, "tok", submission(), Vec::new())
            .await
            .unwrap();
        assert_eq!(backend.calls(), vec!["create_user", "create_employee"]);
    }

    #[tokio::test]
    async fn test_account_failure_stops_everything() {
        let backend = FakeBackend::with(FakeState {
            failing: ["create_user"].into(),
            ..FakeState::default()
        });

        let err = save_employee(&backend, "tok", submission(), vec![upload("a.png")])
            .await
            .unwrap_err();

        assert_eq!(err.stage, SaveStage::CreateAccount);
        assert!(err.account.is_none());
        assert_eq!(backend.calls(), vec!["create_user"]);
    }

    #[tokio::test]
    async fn test_employee_failure_reports_created_account() {
        let backend = FakeBackend::with(FakeState {
            failing: ["create_employee"].into(),
            ..FakeState::default()
        });

        let err = save_employee(&backend, "tok", submission(), vec![upload("a.png")])
            .await
            .unwrap_err();

        assert_eq!(err.stage, SaveStage::CreateEmployee);
        assert!(err.account.is_some());
        assert!(err.user_message().contains("was already created"));
        assert_eq!(backend.calls(), vec!["create_user", "create_employee"]);
    }

    #[tokio::test]
    async fn test_upload_failure_is_reported() {
        let backend = FakeBackend::with(FakeState {
            failing: ["upload_images"].into(),
            ..FakeState::default()
        });

        let err = save_employee(&backend, "tok", submission(), vec![upload("a.png")])
            .await
            .unwrap_err();
        assert_eq!(err.stage, SaveStage::UploadImages);
    }

    #[tokio::test]
    async fn test_list_is_sorted_by_id() {
        let backend = FakeBackend::with(FakeState {
            users: vec![
                User {
                    id: Some(UserId::new(3)),
                    ..User::default()
                },
                User {
                    id: Some(UserId::new(1)),
                    ..User::default()
                },
            ],
            ..FakeState::default()
        });
        let users = list_users(&backend, "tok").await.unwrap();
        assert_eq!(users[0].id, Some(UserId::new(1)));
    }
}
