//! External identity provider adapter (OAuth 2.0 authorization code flow)
//!
//! The gateway never sees passwords. It redirects the browser to the
//! provider, exchanges the returned code for an access token, and reads the
//! user's stable email from the userinfo endpoint.

use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::IdentityProviderConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Subset of the OIDC userinfo response the gateway uses
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserInfo {
    /// The email to bind the session to. Providers that report the address
    /// as unverified are refused.
    pub fn verified_email(&self) -> Option<&str> {
        if self.email_verified == Some(false) {
            return None;
        }
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

#[derive(Clone)]
pub struct IdentityClient {
    config: IdentityProviderConfig,
    http_client: reqwest::Client,
}

impl IdentityClient {
    pub fn new(config: IdentityProviderConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn redirect_uri(&self) -> String {
        self.config.redirect_uri()
    }

    /// Build the provider authorization URL
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AppError::Internal(e.into()))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &self.config.client_id);
            pairs.append_pair("redirect_uri", &self.redirect_uri());
            pairs.append_pair("scope", &self.config.scopes);
            pairs.append_pair("state", state);
        }

        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let mut params = vec![
            ("grant_type", "authorization_code".to_string()),
            ("code", code.to_string()),
            ("redirect_uri", self.redirect_uri()),
            ("client_id", self.config.client_id.clone()),
        ];
        // Public clients have no secret
        if !self.config.client_secret.is_empty() {
            params.push(("client_secret", self.config.client_secret.clone()));
        }

        let response = self
            .http_client
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to exchange code: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Failed to exchange code: {} - {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to parse token response: {}", e)))
    }

    /// Fetch the signed-in user's profile
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo> {
        let response = self
            .http_client
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to fetch userinfo: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::IdentityProvider(format!(
                "Failed to fetch userinfo: {} - {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::IdentityProvider(format!("Failed to parse userinfo: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base: &str) -> IdentityProviderConfig {
        IdentityProviderConfig {
            authorize_url: format!("{}/authorize", base),
            token_url: format!("{}/token", base),
            userinfo_url: format!("{}/userinfo", base),
            client_id: "estate-web".to_string(),
            client_secret: "shh".to_string(),
            scopes: "openid email profile".to_string(),
            app_public_url: "http://localhost:3000".to_string(),
        }
    }

    #[test]
    fn test_authorize_url_parameters() {
        let client = IdentityClient::new(config("http://idp.test")).unwrap();
        let url = Url::parse(&client.authorize_url("st4te").unwrap()).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.path(), "/authorize");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "estate-web");
        assert_eq!(pairs["redirect_uri"], "http://localhost:3000/api/auth/callback");
        assert_eq!(pairs["scope"], "openid email profile");
        assert_eq!(pairs["state"], "st4te");
    }

    #[test]
    fn test_verified_email() {
        let mut info = UserInfo {
            sub: "1".to_string(),
            email: Some(" jane@example.com ".to_string()),
            email_verified: None,
            name: None,
        };
        assert_eq!(info.verified_email(), Some("jane@example.com"));

        info.email_verified = Some(false);
        assert_eq!(info.verified_email(), None);

        info.email_verified = Some(true);
        info.email = Some("".to_string());
        assert_eq!(info.verified_email(), None);
    }

    #[tokio::test]
    async fn test_exchange_code_and_userinfo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("client_secret=shh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sub": "google-1",
                "email": "jane@example.com",
                "email_verified": true,
                "name": "Jane"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = IdentityClient::new(config(&server.uri())).unwrap();
        let tokens = client.exchange_code("abc").await.unwrap();
        assert_eq!(tokens.access_token, "at-1");

        let info = client.fetch_userinfo(&tokens.access_token).await.unwrap();
        assert_eq!(info.sub, "google-1");
        assert_eq!(info.verified_email(), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn test_exchange_code_failure_is_identity_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let client = IdentityClient::new(config(&server.uri())).unwrap();
        let err = client.exchange_code("stale").await.unwrap_err();
        assert!(matches!(err, AppError::IdentityProvider(_)));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_GATEWAY);
    }
}
