//! Identity provider types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a token is already treated as expired.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Tokens obtained from the identity provider, stored in the session.
///
/// `Debug` is implemented manually so tokens never reach the logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentityToken {
    /// The access token sent to the restaurant API.
    pub access_token: String,
    /// The ID token (`OpenID` Connect).
    pub id_token: Option<String>,
    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
}

impl std::fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityToken")
            .field("access_token", &"[REDACTED]")
            .field("id_token", &self.id_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_in", &self.expires_in)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

impl IdentityToken {
    pub(super) fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        Self {
            access_token: response.access_token,
            id_token: response.id_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            expires_in: response.expires_in,
            obtained_at: Utc::now().timestamp(),
        }
    }

    /// Check if the access token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Check expiry against an explicit Unix timestamp.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_in.is_some_and(|expires_in| {
            let expires_at = self.obtained_at.saturating_add(expires_in);
            now >= expires_at.saturating_sub(EXPIRY_BUFFER_SECS)
        })
    }
}

/// Raw token response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: String,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
}

/// Profile returned by the provider's `/userinfo` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Subject identifier (e.g. `auth0|64f...`).
    pub sub: String,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub email: Option<String>,
}

impl Profile {
    /// Name shown in the sidebar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.nickname.as_deref())
            .or(self.email.as_deref())
            .unwrap_or(&self.sub)
    }
}
