//! Integration tests for Buen Sabor Admin.
//!
//! Everything runs in-process: [`FakeApi`] is a small axum server playing
//! both the identity provider and the restaurant API, and [`spawn_admin`]
//! serves the real admin router against it on an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p buen-sabor-integration-tests
//! ```

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use buen_sabor_admin::config::{AdminConfig, BackendConfig, IdentityConfig};
use buen_sabor_admin::identity::Profile;
use buen_sabor_admin::state::AppState;
use buen_sabor_core::{AccountDraft, Employee, EmployeeId, Image, ImageId, Role, User, UserId};
use secrecy::SecretString;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

/// Message the fake API puts in its JSON error bodies.
pub const SIMULATED_ERROR: &str = "Fallo simulado";

/// How a failing fake route answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// 500 with `{"error": SIMULATED_ERROR}`.
    Json,
    /// 502 with an HTML page, like a proxy in front of a dead API.
    Html,
}

/// A `PUT .../rol` request as received.
#[derive(Debug, Clone)]
pub struct RoleRequest {
    pub user_id: i64,
    pub content_type: String,
    pub body: String,
}

/// Everything the fake remembers.
#[derive(Debug, Default)]
pub struct FakeApiState {
    /// Provider profiles by authorization code.
    pub identities: HashMap<String, Profile>,
    pub users: Vec<User>,
    /// Usernames with a customer profile.
    pub customers: HashSet<String>,
    pub employees: Vec<Employee>,
    pub role_requests: Vec<RoleRequest>,
    /// Images received per employee id.
    pub uploads: HashMap<i64, Vec<String>>,
    /// Route names that fail.
    pub failing: HashMap<&'static str, Failure>,
    /// Route names in call order.
    pub calls: Vec<&'static str>,
    /// Held routes wait here until released.
    held: HashMap<&'static str, Arc<Semaphore>>,
    /// Held routes that have a request waiting.
    waiting: Vec<&'static str>,
    next_id: i64,
}

impl FakeApiState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn profile_for(&self, headers: &HeaderMap) -> Option<Profile> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer at-")?;
        self.identities.get(token).cloned()
    }

    fn user_for(&self, headers: &HeaderMap) -> Option<User> {
        let profile = self.profile_for(headers)?;
        self.users
            .iter()
            .find(|u| u.auth0_id == profile.sub)
            .cloned()
    }
}

/// In-process identity provider + restaurant API.
#[derive(Clone)]
pub struct FakeApi {
    state: Arc<Mutex<FakeApiState>>,
    url: String,
}

impl FakeApi {
    /// Start the fake on an ephemeral port.
    pub async fn spawn() -> Self {
        let state = Arc::new(Mutex::new(FakeApiState::default()));
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let router = fake_router(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { state, url }
    }

    /// Base URL, without trailing slash.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Make requests to `route` wait until [`FakeApi::release`].
    pub fn hold(&self, route: &'static str) {
        self.state().held.insert(route, Arc::new(Semaphore::new(0)));
    }

    /// Let held requests to `route` through.
    pub fn release(&self, route: &'static str) {
        if let Some(gate) = self.state().held.remove(route) {
            gate.close();
        }
    }

    /// Wait until a request to a held `route` has arrived.
    pub async fn arrived(&self, route: &'static str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.state().waiting.contains(&route) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no request reached {route}"));
    }

    /// Lock the shared state.
    pub fn state(&self) -> MutexGuard<'_, FakeApiState> {
        lock(&self.state)
    }

    /// Let `code` log in as `sub`.
    pub fn identity(&self, code: &str, sub: &str, name: &str, email: &str) {
        self.state().identities.insert(
            code.to_string(),
            Profile {
                sub: sub.to_string(),
                name: Some(name.to_string()),
                nickname: None,
                email: Some(email.to_string()),
            },
        );
    }

    /// Store a user and return its id.
    pub fn user(&self, auth0_id: &str, username: &str, email: &str, rol: Role) -> UserId {
        let mut state = self.state();
        let id = UserId::new(state.next_id());
        state.users.push(User {
            id: Some(id),
            auth0_id: auth0_id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            rol: Some(rol),
        });
        id
    }

    /// Register a customer profile for `username`.
    pub fn customer(&self, username: &str) {
        self.state().customers.insert(username.to_string());
    }

    /// Make a route fail.
    pub fn fail(&self, route: &'static str, failure: Failure) {
        self.state().failing.insert(route, failure);
    }

    /// Change a stored user's role behind the panel's back.
    pub fn set_role(&self, id: UserId, rol: Role) {
        if let Some(user) = self.state().users.iter_mut().find(|u| u.id == Some(id)) {
            user.rol = Some(rol);
        }
    }

    /// Look a stored user up.
    #[must_use]
    pub fn find_user(&self, id: UserId) -> Option<User> {
        self.state().users.iter().find(|u| u.id == Some(id)).cloned()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<&'static str> {
        self.state().calls.clone()
    }
}

fn lock(state: &Mutex<FakeApiState>) -> MutexGuard<'_, FakeApiState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

type Shared = Arc<Mutex<FakeApiState>>;

/// Record the call, and answer with the configured failure if any.
fn enter<'a>(state: &'a Shared, route: &'static str) -> Result<MutexGuard<'a, FakeApiState>, Response> {
    let mut guard = lock(state);
    guard.calls.push(route);
    let failure = guard.failing.get(route).copied();
    match failure {
        Some(Failure::Json) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": SIMULATED_ERROR })),
        )
            .into_response()),
        Some(Failure::Html) => Err((
            StatusCode::BAD_GATEWAY,
            [(header::CONTENT_TYPE, "text/html")],
            "<html><body>502 Bad Gateway</body></html>",
        )
            .into_response()),
        None => Ok(guard),
    }
}

/// Wait while `route` is held.
async fn pause(state: &Shared, route: &'static str) {
    let gate = {
        let mut guard = lock(state);
        let gate = guard.held.get(route).cloned();
        if gate.is_some() {
            guard.waiting.push(route);
        }
        gate
    };
    if let Some(gate) = gate {
        // Closed on release
        let _ = gate.acquire().await;
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Token invalido" })),
    )
        .into_response()
}

fn fake_router(state: Shared) -> Router {
    Router::new()
        .route("/oauth/token", post(token))
        .route("/userinfo", get(userinfo))
        .route("/api/auth/validar", get(validar))
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/create", post(create))
        .route("/api/auth/usuarios", get(usuarios))
        .route("/api/auth/usuarios/{id}/rol", put(update_role))
        .route("/api/clientes/username/{username}", get(cliente))
        .route("/api/empleados", post(create_employee))
        .route("/api/empleados/{id}/uploads", post(upload_images))
        .with_state(state)
}

async fn token(State(state): State<Shared>, Form(form): Form<HashMap<String, String>>) -> Response {
    let guard = match enter(&state, "token") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let code = form.get("code").cloned().unwrap_or_default();
    if !guard.identities.contains_key(&code) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid authorization code" })),
        )
            .into_response();
    }
    Json(json!({
        "access_token": format!("at-{code}"),
        "id_token": format!("id-{code}"),
        "refresh_token": format!("rt-{code}"),
        "expires_in": 3600,
    }))
    .into_response()
}

async fn userinfo(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let guard = match enter(&state, "userinfo") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    guard
        .profile_for(&headers)
        .map_or_else(unauthorized, |profile| Json(profile).into_response())
}

async fn validar(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let guard = match enter(&state, "validar") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if guard.profile_for(&headers).is_none() {
        return unauthorized();
    }
    Json(guard.user_for(&headers).is_some()).into_response()
}

async fn login(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let guard = match enter(&state, "login") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    match guard.user_for(&headers) {
        Some(user) => Json(user).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Usuario no encontrado" })),
        )
            .into_response(),
    }
}

async fn register(State(state): State<Shared>, Json(mut user): Json<User>) -> Response {
    let mut guard = match enter(&state, "register") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    user.id = Some(UserId::new(guard.next_id()));
    guard.users.push(user.clone());
    Json(user).into_response()
}

async fn create(State(state): State<Shared>, Json(draft): Json<AccountDraft>) -> Response {
    pause(&state, "create").await;
    let mut guard = match enter(&state, "create") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if guard.users.iter().any(|u| u.email == draft.email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "El email ya esta registrado" })),
        )
            .into_response();
    }
    let user = User {
        id: Some(UserId::new(guard.next_id())),
        auth0_id: String::new(),
        username: draft.email.clone(),
        email: draft.email,
        rol: Some(draft.rol),
    };
    guard.users.push(user.clone());
    Json(user).into_response()
}

async fn usuarios(State(state): State<Shared>) -> Response {
    match enter(&state, "usuarios") {
        Ok(guard) => Json(guard.users.clone()).into_response(),
        Err(response) => response,
    }
}

async fn update_role(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: String,
) -> Response {
    pause(&state, "update_role").await;
    let mut guard = match enter(&state, "update_role") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    guard.role_requests.push(RoleRequest {
        user_id: id,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        body: body.clone(),
    });

    let Ok(rol) = body.parse::<Role>() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Rol invalido" })),
        )
            .into_response();
    };
    match guard
        .users
        .iter_mut()
        .find(|u| u.id == Some(UserId::new(id)))
    {
        Some(user) => {
            user.rol = Some(rol);
            Json(user.clone()).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Usuario no encontrado" })),
        )
            .into_response(),
    }
}

async fn cliente(State(state): State<Shared>, Path(username): Path<String>) -> Response {
    let guard = match enter(&state, "cliente") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    if guard.customers.contains(&username) {
        Json(json!({ "id": 1, "nombre": username, "usuario": { "username": username } }))
            .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn create_employee(State(state): State<Shared>, Json(mut employee): Json<Employee>) -> Response {
    let mut guard = match enter(&state, "create_employee") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    employee.id = Some(EmployeeId::new(guard.next_id()));
    guard.employees.push(employee.clone());
    Json(employee).into_response()
}

async fn upload_images(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Response {
    let mut names = Vec::new();
    while let Ok(Some(part)) = multipart.next_field().await {
        if part.name() == Some("uploads") {
            names.push(part.file_name().unwrap_or_default().to_string());
        }
    }

    let mut guard = match enter(&state, "upload_images") {
        Ok(guard) => guard,
        Err(response) => return response,
    };
    let images: Vec<Image> = names
        .iter()
        .map(|name| Image {
            id: Some(ImageId::new(guard.next_id())),
            url: format!("https://cdn.buensabor.test/empleados/{id}/{name}"),
        })
        .collect();
    guard.uploads.entry(id).or_default().extend(names);
    Json(images).into_response()
}

/// Serve the admin panel against `api` and return its base URL.
pub async fn spawn_admin(api: &FakeApi) -> String {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let base_url = format!("http://{addr}");

    let config = AdminConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: addr.port(),
        base_url: base_url.clone(),
        backend: BackendConfig {
            base_url: api.url().to_string(),
        },
        identity: IdentityConfig {
            domain: api.url().to_string(),
            client_id: "buen-sabor-admin".to_string(),
            client_secret: SecretString::from("q8Rz3LmV7xT2kP9wN4bY6cH1jD5"),
            audience: Some("https://api.buensabor.test".to_string()),
            callback_url: format!("{base_url}/auth/callback"),
        },
        json_logs: false,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    };

    let app = buen_sabor_admin::app(AppState::new(config).unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    base_url
}

/// A browser that does not follow redirects and keeps the session cookie.
pub struct Browser {
    client: reqwest::Client,
    base_url: String,
    cookie: Mutex<Option<String>>,
}

impl Browser {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .unwrap(),
            base_url: base_url.to_string(),
            cookie: Mutex::new(None),
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(cookie) = self.cookie.lock().unwrap().as_ref() {
            request = request.header(header::COOKIE, cookie);
        }
        request
    }

    fn remember(&self, response: &reqwest::Response) {
        for value in response.headers().get_all(header::SET_COOKIE) {
            if let Some(pair) = value.to_str().ok().and_then(|v| v.split(';').next()) {
                *self.cookie.lock().unwrap() = Some(pair.to_string());
            }
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> reqwest::Response {
        let response = request.send().await.unwrap();
        self.remember(&response);
        response
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.send(self.request(reqwest::Method::GET, path)).await
    }

    /// GET and return the body, asserting a 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.text().await.unwrap()
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.send(self.request(reqwest::Method::POST, path).form(form))
            .await
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> reqwest::Response {
        self.send(self.request(reqwest::Method::POST, path).multipart(form))
            .await
    }

    /// Run the OAuth round trip with `code` and return the callback response.
    pub async fn login(&self, code: &str, return_to: Option<&str>) -> reqwest::Response {
        let path = return_to.map_or_else(
            || "/auth/login".to_string(),
            |to| format!("/auth/login?returnTo={}", urlencoding::encode(to)),
        );
        let response = self.get(&path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let authorize = reqwest::Url::parse(&location(&response)).unwrap();
        let state = authorize
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        self.get(&format!("/auth/callback?code={code}&state={state}"))
            .await
    }
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
