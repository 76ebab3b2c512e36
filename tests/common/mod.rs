//! Common test utilities

#![allow(dead_code)]

use estate_gateway::config::{
    Config, CorsConfig, IdentityProviderConfig, SecurityHeadersConfig, SessionConfig,
    SessionGateConfig, TelemetryConfig, UpstreamConfig,
};
use estate_gateway::server::build_router;
use estate_gateway::session::SessionManager;
use estate_gateway::state::AppState;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use wiremock::MockServer;

pub const TEST_SECRET: &str = "test-session-secret-with-enough-entropy";
pub const SESSION_COOKIE: &str = "estate_session";

/// An address nothing listens on
pub const UNREACHABLE_UPSTREAM: &str = "http://127.0.0.1:9";

pub struct TestApp {
    pub addr: SocketAddr,
    pub config: Config,
    /// Stands in for the estate planning backend
    pub upstream: MockServer,
    /// Stands in for the identity provider
    pub idp: MockServer,
}

pub fn test_config(upstream_url: &str, idp_url: &str) -> Config {
    Config {
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        upstream: UpstreamConfig {
            base_url: upstream_url.to_string(),
            timeout_secs: 2,
            max_retries: 1,
            retry_base_ms: 10,
            retry_max_ms: 50,
            max_upload_bytes: 1024 * 1024,
        },
        session: SessionConfig {
            secret: TEST_SECRET.to_string(),
            issuer: "http://gateway.test".to_string(),
            ttl_secs: 3600,
            cookie_name: SESSION_COOKIE.to_string(),
            cookie_secure: false,
        },
        identity: IdentityProviderConfig {
            authorize_url: format!("{}/authorize", idp_url),
            token_url: format!("{}/token", idp_url),
            userinfo_url: format!("{}/userinfo", idp_url),
            client_id: "gateway-client".to_string(),
            client_secret: "gateway-secret".to_string(),
            scopes: "openid email profile".to_string(),
            app_public_url: "http://gateway.test".to_string(),
        },
        gate: SessionGateConfig::default(),
        cors: CorsConfig::default(),
        security_headers: SecurityHeadersConfig::default(),
        telemetry: TelemetryConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let upstream = MockServer::start().await;
        let idp = MockServer::start().await;
        let config = test_config(&upstream.uri(), &idp.uri());
        Self::spawn_with(config, upstream, idp).await
    }

    /// Gateway whose upstream refuses every connection
    pub async fn spawn_upstream_down() -> Self {
        let upstream = MockServer::start().await;
        let idp = MockServer::start().await;
        let mut config = test_config(UNREACHABLE_UPSTREAM, &idp.uri());
        config.upstream.max_retries = 0;
        Self::spawn_with(config, upstream, idp).await
    }

    async fn spawn_with(config: Config, upstream: MockServer, idp: MockServer) -> Self {
        let state = AppState::new(config.clone(), None).expect("Failed to build state");
        let app = build_router(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            addr,
            config,
            upstream,
            idp,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// HTTP client that does not follow redirects
    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client")
    }

    pub fn session_token(&self, email: &str) -> String {
        SessionManager::new(self.config.session.clone())
            .create_session_token("user-1", email, Some("Test User"))
            .expect("Failed to create session token")
    }

    /// `Cookie` header value carrying a valid session for `email`
    pub fn session_cookie(&self, email: &str) -> String {
        format!("{}={}", SESSION_COOKIE, self.session_token(email))
    }
}

/// Every `Set-Cookie` value on a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect()
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub const MULTIPART_BOUNDARY: &str = "estate-test-boundary";

/// A `multipart/form-data` body; parts are `(name, file name, content)`.
/// Returns the content type and the encoded body.
pub fn multipart_form(parts: &[(&str, Option<&str>, &str)]) -> (String, Vec<u8>) {
    let mut body = String::new();
    for (name, file_name, content) in parts {
        body.push_str(&format!("--{}\r\n", MULTIPART_BOUNDARY));
        match file_name {
            Some(file) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                name, file
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                name
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", MULTIPART_BOUNDARY));

    (
        format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        body.into_bytes(),
    )
}
