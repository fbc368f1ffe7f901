//! Role-gated access decisions.
//!
//! The decision is split into a pure part ([`decide`]) and the role lookup
//! ([`resolve`]) so the state machine can be tested without I/O:
//!
//! ```text
//! Loading ──lookup──> Authorized | Unauthorized | Unauthenticated
//! ```

use buen_sabor_core::{Role, User};
use tracing::instrument;

use crate::api::Backend;

/// Where a guarded request stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// The role lookup has not finished.
    Loading,
    /// No signed-in identity.
    Unauthenticated,
    /// Signed in, and the role is allowed.
    Authorized(Role),
    /// Signed in, but the role is missing or not allowed.
    Unauthorized(Option<Role>),
}

/// What to do with a guarded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    /// Run the handler.
    Render,
    /// Send to the entry page, remembering where the user was going.
    RedirectToEntry { return_to: String },
    /// Send to the entry page.
    RedirectHome,
}

/// Pure decision from the looked-up role.
#[must_use]
pub fn decide(authenticated: bool, role: Option<Role>, allowed: &[Role]) -> GuardState {
    if !authenticated {
        return GuardState::Unauthenticated;
    }
    match role {
        Some(role) if allowed.contains(&role) => GuardState::Authorized(role),
        other => GuardState::Unauthorized(other),
    }
}

impl GuardState {
    /// The action for a resolved state; `None` while still loading.
    #[must_use]
    pub fn action(self, requested: &str) -> Option<GuardAction> {
        match self {
            Self::Loading => None,
            Self::Authorized(_) => Some(GuardAction::Render),
            Self::Unauthorized(_) => Some(GuardAction::RedirectHome),
            Self::Unauthenticated => Some(GuardAction::RedirectToEntry {
                return_to: requested.to_string(),
            }),
        }
    }
}

impl GuardAction {
    /// Redirect target, if the action is a redirect.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Render => None,
            Self::RedirectHome => Some("/".to_string()),
            Self::RedirectToEntry { return_to } => {
                Some(format!("/?returnTo={}", urlencoding::encode(return_to)))
            }
        }
    }
}

/// Look up the caller's current user and decide.
///
/// A rejected token means the user is no longer signed in; any other failed
/// lookup is logged and treated as "no role". The fetched user is returned so
/// the caller can refresh what it has stored.
#[instrument(skip(backend, token, allowed))]
pub async fn resolve<B: Backend>(
    backend: &B,
    token: Option<&str>,
    allowed: &[Role],
) -> (GuardState, Option<User>) {
    let Some(token) = token else {
        return (GuardState::Unauthenticated, None);
    };

    match backend.login(token).await {
        Ok(user) => (decide(true, user.rol, allowed), Some(user)),
        Err(e) if e.is_unauthorized() => {
            tracing::info!("Access token rejected by the API");
            (decide(false, None, allowed), None)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Role lookup failed, denying access");
            (decide(true, None, allowed), None)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeBackend, FakeState};

    const ADMIN_ONLY: &[Role] = &[Role::Admin];

    fn user(role: Role) -> User {
        User {
            rol: Some(role),
            ..User::default()
        }
    }

    #[test]
    fn test_decide() {
        assert_eq!(decide(false, Some(Role::Admin), ADMIN_ONLY), GuardState::Unauthenticated);
        assert_eq!(
            decide(true, Some(Role::Admin), ADMIN_ONLY),
            GuardState::Authorized(Role::Admin)
        );
        assert_eq!(
            decide(true, Some(Role::Cliente), ADMIN_ONLY),
            GuardState::Unauthorized(Some(Role::Cliente))
        );
        assert_eq!(decide(true, None, ADMIN_ONLY), GuardState::Unauthorized(None));
    }

    #[test]
    fn test_every_non_admin_role_is_sent_home() {
        for role in Role::ALL.into_iter().filter(|r| *r != Role::Admin) {
            let action = decide(true, Some(role), ADMIN_ONLY).action("/usuarios").unwrap();
            assert_eq!(action, GuardAction::RedirectHome, "{role}");
            assert_eq!(action.location().as_deref(), Some("/"));
        }
    }

    #[test]
    fn test_loading_has_no_action() {
        assert_eq!(GuardState::Loading.action("/usuarios"), None);
    }

    #[test]
    fn test_unauthenticated_preserves_location() {
        let action = GuardState::Unauthenticated.action("/usuarios?page=2").unwrap();
        assert_eq!(
            action.location().as_deref(),
            Some("/?returnTo=%2Fusuarios%3Fpage%3D2")
        );
    }

    #[tokio::test]
    async fn test_resolve_admin_renders() {
        let backend = FakeBackend::with(FakeState {
            current: Some(user(Role::Admin)),
            ..FakeState::default()
        });
        let (state, fetched) = resolve(&backend, Some("tok"), ADMIN_ONLY).await;
        assert_eq!(state.action("/usuarios"), Some(GuardAction::Render));
        assert_eq!(fetched.and_then(|u| u.rol), Some(Role::Admin));
    }

    #[tokio::test]
    async fn test_resolve_client_is_redirected_home() {
        let backend = FakeBackend::with(FakeState {
            current: Some(user(Role::Cliente)),
            ..FakeState::default()
        });
        let (state, _) = resolve(&backend, Some("tok"), ADMIN_ONLY).await;
        assert_eq!(state.action("/usuarios"), Some(GuardAction::RedirectHome));
    }

    #[tokio::test]
    async fn test_resolve_lookup_failure_denies() {
        let backend = FakeBackend::with(FakeState {
            current: Some(user(Role::Admin)),
            failing: ["login"].into(),
            ..FakeState::default()
        });
        let (state, fetched) = resolve(&backend, Some("tok"), ADMIN_ONLY).await;
        assert_eq!(state, GuardState::Unauthorized(None));
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_resolve_rejected_token_is_unauthenticated() {
        let backend = FakeBackend::with(FakeState {
            current: Some(user(Role::Admin)),
            token_rejected: true,
            ..FakeState::default()
        });
        let (state, fetched) = resolve(&backend, Some("expired"), ADMIN_ONLY).await;
        assert_eq!(state, GuardState::Unauthenticated);
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_resolve_without_token_skips_backend() {
        let backend = FakeBackend::default();
        let (state, _) = resolve(&backend, None, ADMIN_ONLY).await;
        assert_eq!(state, GuardState::Unauthenticated);
        assert!(backend.calls().is_empty());
    }
}
