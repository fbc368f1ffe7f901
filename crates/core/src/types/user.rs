//! Application user records.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::role::Role;

/// An application user as exchanged with the backend (`Usuario`).
///
/// `id` is absent on registration drafts and assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    /// Identity provider subject id.
    #[serde(rename = "auth0Id", default)]
    pub auth0_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rol: Option<Role>,
}

impl User {
    /// Draft used when a first-time identity registers itself.
    ///
    /// Self-registered accounts always start as [`Role::Cliente`].
    #[must_use]
    pub fn registration(auth0_id: String, username: String, email: String) -> Self {
        Self {
            id: None,
            auth0_id,
            username,
            email,
            rol: Some(Role::Cliente),
        }
    }
}

/// Account creation request sent by an administrator (`UsuarioDto`).
///
/// Transient: built by the creation wizard and discarded after submission.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccountDraft {
    pub email: String,
    pub password: String,
    pub rol: Role,
}

impl std::fmt::Debug for AccountDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDraft")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("rol", &self.rol)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserializes_backend_shape() {
        let json = r#"{"id":1,"auth0Id":"auth0|abc","username":"ana","email":"ana@buensabor.com","rol":"Cliente"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, Some(UserId::new(1)));
        assert_eq!(user.auth0_id, "auth0|abc");
        assert_eq!(user.rol, Some(Role::Cliente));
    }

    #[test]
    fn test_user_without_role() {
        let user: User = serde_json::from_str(r#"{"id":3,"username":"x"}"#).unwrap();
        assert_eq!(user.rol, None);
        assert!(user.email.is_empty());
    }

    #[test]
    fn test_registration_draft_omits_id() {
        let draft = User::registration(
            "auth0|abc".to_string(),
            "Ana".to_string(),
            "ana@buensabor.com".to_string(),
        );
        let value = serde_json::to_value(&draft).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["auth0Id"], "auth0|abc");
        assert_eq!(value["rol"], "Cliente");
    }

    #[test]
    fn test_account_draft_debug_redacts_password() {
        let draft = AccountDraft {
            email: "caja@buensabor.com".to_string(),
            password: "Sup3rSecreta!".to_string(),
            rol: Role::Cajero,
        };
        let debug = format!("{draft:?}");
        assert!(debug.contains("caja@buensabor.com"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("Sup3rSecreta!"));
    }
}
