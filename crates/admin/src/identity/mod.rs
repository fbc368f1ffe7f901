//! Identity provider (Auth0) client.
//!
//! Implements the OAuth 2.0 authorization-code flow against an
//! Auth0-compatible `OpenID` Connect provider.
//!
//! # OAuth Flow
//!
//! 1. Generate the authorization URL with [`IdentityClient::authorization_url`]
//! 2. Redirect the browser to the provider's login page
//! 3. The provider redirects back with an authorization code
//! 4. Exchange the code for tokens with [`IdentityClient::exchange_code`]
//! 5. Read the profile with [`IdentityClient::user_info`]
//! 6. Call the restaurant API with the access token
//!
//! Refresh tokens are requested (`offline_access`) so expired access tokens
//! can be renewed with [`IdentityClient::refresh`].

mod types;

pub use types::*;

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use crate::config::IdentityConfig;

/// Scopes requested at login.
pub const SCOPES: &str = "openid profile email offline_access";

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// The token cannot be refreshed.
    #[error("No refresh token available")]
    NoRefreshToken,
}

/// Client for the identity provider.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: SecretString,
    audience: Option<String>,
    callback_url: String,
}

impl IdentityClient {
    /// Create a new identity provider client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(IdentityClientInner {
                client,
                issuer: config.issuer(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                audience: config.audience.clone(),
                callback_url: config.callback_url.clone(),
            }),
        })
    }

    /// Generate the authorization URL.
    ///
    /// # Arguments
    ///
    /// * `state` - A random string stored in the session to prevent CSRF attacks
    /// * `signup` - Open the provider on its sign-up screen instead of login
    #[must_use]
    pub fn authorization_url(&self, state: &str, signup: bool) -> String {
        let mut url = format!(
            "{}/authorize?\
            response_type=code&\
            client_id={}&\
            redirect_uri={}&\
            scope={}&\
            state={}",
            self.inner.issuer,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(&self.inner.callback_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state)
        );

        if let Some(audience) = &self.inner.audience {
            url.push_str("&audience=");
            url.push_str(&urlencoding::encode(audience));
        }
        if signup {
            url.push_str("&screen_hint=signup");
        }

        url
    }

    /// Generate the provider logout URL.
    ///
    /// # Arguments
    ///
    /// * `return_to` - Where the provider sends the browser after logout
    #[must_use]
    pub fn logout_url(&self, return_to: &str) -> String {
        format!(
            "{}/v2/logout?client_id={}&returnTo={}",
            self.inner.issuer,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(return_to)
        )
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the token exchange fails.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<IdentityToken, IdentityError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", self.inner.callback_url.as_str()),
        ];

        let token_response = self.token_request(&params, "Token exchange").await?;
        Ok(IdentityToken::from_response(token_response, None))
    }

    /// Obtain a fresh access token using the token's refresh token.
    ///
    /// Providers that do not rotate refresh tokens omit it from the
    /// response; the previous one is kept in that case.
    ///
    /// # Errors
    ///
    /// Returns an error if the token has no refresh token or the refresh fails.
    #[instrument(skip(self, token))]
    pub async fn refresh(&self, token: &IdentityToken) -> Result<IdentityToken, IdentityError> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(IdentityError::NoRefreshToken)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("refresh_token", refresh_token),
        ];

        let token_response = self.token_request(&params, "Token refresh").await?;
        Ok(IdentityToken::from_response(
            token_response,
            token.refresh_token.clone(),
        ))
    }

    /// Fetch the profile of the token's subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self, access_token))]
    pub async fn user_info(&self, access_token: &str) -> Result<Profile, IdentityError> {
        let response = self
            .inner
            .client
            .get(format!("{}/userinfo", self.inner.issuer))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::OAuth(format!(
                "User info request failed ({status}): {text}"
            )));
        }

        Ok(response.json().await?)
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        action: &str,
    ) -> Result<TokenResponse, IdentityError> {
        let response = self
            .inner
            .client
            .post(format!("{}/oauth/token", self.inner.issuer))
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::OAuth(format!("{action} failed: {text}")));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(audience: Option<&str>) -> IdentityClient {
        IdentityClient::new(&IdentityConfig {
            domain: "buen-sabor.us.auth0.com".to_string(),
            client_id: "abc123".to_string(),
            client_secret: SecretString::from("k3Jq9ZpX2vLm8RtY"),
            audience: audience.map(String::from),
            callback_url: "http://localhost:3001/auth/callback".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_authorization_url() {
        let url = client(None).authorization_url("st4te", false);

        assert!(url.starts_with("https://buen-sabor.us.auth0.com/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=abc123"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3001%2Fauth%2Fcallback"));
        assert!(url.contains("scope=openid%20profile%20email%20offline_access"));
        assert!(url.contains("state=st4te"));
        assert!(!url.contains("nonce="));
        assert!(!url.contains("audience="));
        assert!(!url.contains("screen_hint"));
    }

    #[test]
    fn test_authorization_url_with_audience_and_signup() {
        let url = client(Some("https://api.buensabor.com.ar")).authorization_url("s", true);
        assert!(url.contains("audience=https%3A%2F%2Fapi.buensabor.com.ar"));
        assert!(url.ends_with("&screen_hint=signup"));
    }

    #[test]
    fn test_logout_url() {
        let url = client(None).logout_url("http://localhost:3001");
        assert_eq!(
            url,
            "https://buen-sabor.us.auth0.com/v2/logout?client_id=abc123&returnTo=http%3A%2F%2Flocalhost%3A3001"
        );
    }
}
