//! Application state shared across handlers

use crate::config::Config;
use crate::identity::IdentityClient;
use crate::session::SessionManager;
use crate::upstream::UpstreamClient;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// State that can resolve session credentials.
///
/// Extractors and the session gate only need this much, so they stay usable
/// with any router state that carries a [`SessionManager`].
pub trait HasSessions: Clone + Send + Sync + 'static {
    fn sessions(&self) -> &SessionManager;
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionManager,
    pub upstream: UpstreamClient,
    pub identity: IdentityClient,
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state from configuration. Fails only if an HTTP client cannot be
    /// constructed (TLS backend initialisation).
    pub fn new(config: Config, metrics_handle: Option<PrometheusHandle>) -> anyhow::Result<Self> {
        let sessions = SessionManager::new(config.session.clone());
        let upstream = UpstreamClient::new(&config.upstream)?;
        let identity = IdentityClient::new(config.identity.clone())?;

        Ok(Self {
            config: Arc::new(config),
            sessions,
            upstream,
            identity,
            metrics_handle,
        })
    }
}

impl HasSessions for AppState {
    fn sessions(&self) -> &SessionManager {
        &self.sessions
    }
}
