//! Session-related types.
//!
//! Types stored in the session for authentication and selection state.

use buen_sabor_core::{Role, User};
use serde::{Deserialize, Serialize};

use crate::identity::Profile;

/// Session-stored identity of the signed-in user.
///
/// Written by the login bootstrap; the role is refreshed by the role gate
/// whenever it looks the user up again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// The application user returned by the restaurant API.
    pub user: User,
    /// The identity provider profile.
    pub profile: Profile,
}

impl CurrentUser {
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.user.rol
    }

    /// Name shown in the sidebar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.user.username.is_empty() {
            self.profile.display_name()
        } else {
            &self.user.username
        }
    }
}

/// Session keys.
pub mod keys {
    /// The signed-in user ([`super::CurrentUser`]).
    pub const CURRENT_USER: &str = "current_user";

    /// Identity provider tokens.
    pub const IDENTITY_TOKEN: &str = "identity_token";

    /// OAuth CSRF state, valid for one callback.
    pub const OAUTH_STATE: &str = "oauth_state";

    /// Where to go after login.
    pub const RETURN_TO: &str = "return_to";

    /// Selected branch id. Survives logout.
    pub const ACTIVE_BRANCH: &str = "activeSucursal";

    /// Selected company id. Survives logout.
    pub const ACTIVE_COMPANY: &str = "activeEmpresa";

    /// In-progress user creation wizard.
    pub const USER_WIZARD: &str = "user_wizard";

    /// Pending notifications.
    pub const FLASH: &str = "flash";
}
