//! Integration tests for the restaurant API client and the services on top.
//!
//! Run with: cargo test -p buen-sabor-integration-tests

#![allow(clippy::unwrap_used)]

use buen_sabor_admin::api::{Backend, BackendClient, GENERIC_ERROR_MESSAGE, Upload};
use buen_sabor_admin::config::BackendConfig;
use buen_sabor_admin::identity::Profile;
use buen_sabor_admin::services::users::{self, SaveStage};
use buen_sabor_admin::services::{BootstrapOutcome, bootstrap};
use buen_sabor_core::wizard::{Field, Wizard};
use buen_sabor_core::{Role, UserId};
use buen_sabor_integration_tests::{FakeApi, Failure, SIMULATED_ERROR};

fn client(api: &FakeApi) -> BackendClient {
    BackendClient::new(&BackendConfig {
        base_url: format!("{}/", api.url()),
    })
    .unwrap()
}

fn profile(sub: &str, name: &str, email: &str) -> Profile {
    Profile {
        sub: sub.to_string(),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        ..Profile::default()
    }
}

fn complete_wizard(email: &str) -> Wizard {
    let mut wizard = Wizard::new();
    for (field, value) in [
        (Field::Name, "Lucia"),
        (Field::Surname, "Gomez"),
        (Field::Phone, "2615550101"),
        (Field::BirthDate, "1994-03-12"),
        (Field::Email, email),
        (Field::Password, "Cocina#2024"),
        (Field::Role, "Cocinero"),
    ] {
        wizard.set(field, value);
    }
    wizard
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_role_update_sends_plain_text_role() {
    let api = FakeApi::spawn().await;
    api.identity("admin", "auth0|admin", "Admin", "admin@buensabor.test");
    api.user("auth0|admin", "admin", "admin@buensabor.test", Role::Admin);
    let cook = api.user("auth0|cook", "marta", "marta@buensabor.test", Role::Cliente);

    let updated = users::change_role(&client(&api), "at-admin", cook, Role::Cocinero)
        .await
        .unwrap();

    assert_eq!(updated.rol, Some(Role::Cocinero));
    assert_eq!(api.find_user(cook).unwrap().rol, Some(Role::Cocinero));

    let requests = api.state().role_requests.clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].user_id, cook.as_i64());
    assert!(requests[0].content_type.starts_with("text/plain"));
    assert_eq!(requests[0].body, "Cocinero");
}

#[tokio::test]
async fn test_list_is_sorted_by_id() {
    let api = FakeApi::spawn().await;
    let first = api.user("auth0|a", "ana", "ana@buensabor.test", Role::Cajero);
    let second = api.user("auth0|b", "beto", "beto@buensabor.test", Role::Delivery);
    api.state().users.reverse();

    let listed = users::list_users(&client(&api), "at-x").await.unwrap();
    let ids: Vec<_> = listed.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![Some(first), Some(second)]);
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let api = FakeApi::spawn().await;
    api.fail("usuarios", Failure::Json);

    let err = client(&api).list_users("at-x").await.unwrap_err();
    assert_eq!(err.user_message(), SIMULATED_ERROR);
}

#[tokio::test]
async fn test_unreadable_error_body_falls_back_to_generic_message() {
    let api = FakeApi::spawn().await;
    api.fail("usuarios", Failure::Html);

    let err = client(&api).list_users("at-x").await.unwrap_err();
    assert_eq!(err.user_message(), GENERIC_ERROR_MESSAGE);
}

#[tokio::test]
async fn test_unknown_user_role_update_reports_api_message() {
    let api = FakeApi::spawn().await;

    let err = users::change_role(&client(&api), "at-x", UserId::new(99), Role::Admin)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Usuario no encontrado");
}

// ============================================================================
// Customers
// ============================================================================

#[tokio::test]
async fn test_customer_lookup() {
    let api = FakeApi::spawn().await;
    api.customer("pedro");
    let client = client(&api);

    assert!(client.find_customer_by_username("at-x", "nadie").await.unwrap().is_none());
    assert!(client.find_customer_by_username("at-x", "pedro").await.unwrap().is_some());
}

// ============================================================================
// Login bootstrap
// ============================================================================

#[tokio::test]
async fn test_first_login_registers_a_client() {
    let api = FakeApi::spawn().await;
    api.identity("new", "auth0|new", "Nora", "nora@buensabor.test");

    let outcome = bootstrap(
        &client(&api),
        "at-new",
        &profile("auth0|new", "Nora", "nora@buensabor.test"),
    )
    .await
    .unwrap();

    let BootstrapOutcome::NeedsCustomerProfile(user) = outcome else {
        panic!("expected a client without customer profile");
    };
    assert_eq!(user.rol, Some(Role::Cliente));
    assert_eq!(user.auth0_id, "auth0|new");
    assert!(user.id.is_some());
    assert_eq!(api.calls(), vec!["validar", "register", "cliente"]);
}

#[tokio::test]
async fn test_returning_admin_logs_in() {
    let api = FakeApi::spawn().await;
    api.identity("admin", "auth0|admin", "Admin", "admin@buensabor.test");
    api.user("auth0|admin", "admin", "admin@buensabor.test", Role::Admin);

    let outcome = bootstrap(
        &client(&api),
        "at-admin",
        &profile("auth0|admin", "Admin", "admin@buensabor.test"),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, BootstrapOutcome::Ready(ref u) if u.rol == Some(Role::Admin)));
    assert_eq!(api.calls(), vec!["validar", "login"]);
}

#[tokio::test]
async fn test_returning_client_with_profile_is_ready() {
    let api = FakeApi::spawn().await;
    api.identity("pedro", "auth0|pedro", "Pedro", "pedro@buensabor.test");
    api.user("auth0|pedro", "pedro", "pedro@buensabor.test", Role::Cliente);
    api.customer("pedro");

    let outcome = bootstrap(
        &client(&api),
        "at-pedro",
        &profile("auth0|pedro", "Pedro", "pedro@buensabor.test"),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, BootstrapOutcome::Ready(_)));
}

#[tokio::test]
async fn test_bootstrap_stops_at_first_error() {
    let api = FakeApi::spawn().await;
    api.fail("validar", Failure::Json);

    let result = bootstrap(&client(&api), "at-x", &profile("auth0|x", "X", "x@buensabor.test")).await;

    assert!(result.is_err());
    assert_eq!(api.calls(), vec!["validar"]);
}

// ============================================================================
// Employee creation
// ============================================================================

#[tokio::test]
async fn test_save_employee_creates_account_employee_and_images() {
    let api = FakeApi::spawn().await;
    let submission = complete_wizard("lucia@buensabor.test").submission().unwrap();
    let uploads = vec![
        Upload {
            file_name: "frente.png".to_string(),
            content_type: Some("image/png".to_string()),
            bytes: vec![0x89, b'P', b'N', b'G'],
        },
        Upload {
            file_name: "perfil.jpg".to_string(),
            content_type: None,
            bytes: vec![0xFF, 0xD8],
        },
    ];

    let outcome = users::save_employee(&client(&api), "at-admin", submission, uploads)
        .await
        .unwrap();

    assert_eq!(outcome.account.rol, Some(Role::Cocinero));
    assert_eq!(outcome.employee.email, "lucia@buensabor.test");
    assert_eq!(outcome.employee.images.len(), 2);
    assert_eq!(api.calls(), vec!["create", "create_employee", "upload_images"]);

    let state = api.state();
    let stored = &state.employees[0];
    assert_eq!(stored.name, "Lucia");
    assert_eq!(stored.user.as_ref().unwrap().email, "lucia@buensabor.test");
    let employee_id = outcome.employee.id.unwrap().as_i64();
    assert_eq!(state.uploads[&employee_id], vec!["frente.png", "perfil.jpg"]);
}

#[tokio::test]
async fn test_save_without_images_skips_upload() {
    let api = FakeApi::spawn().await;
    let submission = complete_wizard("sin.fotos@buensabor.test").submission().unwrap();

    users::save_employee(&client(&api), "at-admin", submission, Vec::new())
        .await
        .unwrap();

    assert_eq!(api.calls(), vec!["create", "create_employee"]);
}

#[tokio::test]
async fn test_failed_employee_reports_orphaned_account() {
    let api = FakeApi::spawn().await;
    api.fail("create_employee", Failure::Json);
    let submission = complete_wizard("orphan@buensabor.test").submission().unwrap();

    let err = users::save_employee(&client(&api), "at-admin", submission, Vec::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage, SaveStage::CreateEmployee);
    let orphan = err.account.unwrap();
    assert_eq!(api.find_user(orphan).unwrap().email, "orphan@buensabor.test");
    assert!(err.user_message().contains(SIMULATED_ERROR));
    assert!(err.user_message().contains(&orphan.to_string()));
}

#[tokio::test]
async fn test_duplicate_email_fails_before_anything_is_created() {
    let api = FakeApi::spawn().await;
    api.user("", "taken", "taken@buensabor.test", Role::Cajero);
    let submission = complete_wizard("taken@buensabor.test").submission().unwrap();

    let err = users::save_employee(&client(&api), "at-admin", submission, Vec::new())
        .await
        .unwrap_err();

    assert_eq!(err.stage, SaveStage::CreateAccount);
    assert!(err.account.is_none());
    assert_eq!(err.user_message(), "El email ya esta registrado");
    assert!(api.state().employees.is_empty());
}
