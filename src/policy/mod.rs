//! Per-route access policy for proxied resources
//!
//! Every proxy route declares who may call it. Checks run in a fixed order
//! (required parameter, then session, then ownership) and all of them run
//! before any upstream traffic.

use serde_json::Value;
use crate::error::{AppError, Result};
use crate::middleware::Principal;

pub const FORBIDDEN_MESSAGE: &str = "Forbidden - can only access your own data";
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized - please sign in";

/// Who may call a proxy route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Reference data; no session needed
    Public,
    /// Any signed-in user
    Authenticated,
    /// Signed-in user whose email equals the identifying parameter `param`
    Owner { param: &'static str },
}

/// A proxied upstream resource
#[derive(Debug, Clone, Copy)]
pub struct ProxyRoute {
    /// Label used in logs
    pub name: &'static str,
    /// Upstream path; `{id}` is replaced by the encoded path parameter
    pub upstream_path: &'static str,
    pub policy: AccessPolicy,
    /// Whether `multipart/form-data` bodies may be sent to this route
    pub accepts_multipart: bool,
}

impl ProxyRoute {
    pub const fn new(name: &'static str, upstream_path: &'static str, policy: AccessPolicy) -> Self {
        Self {
            name,
            upstream_path,
            policy,
            accepts_multipart: false,
        }
    }

    pub const fn accepting_multipart(self) -> Self {
        Self {
            accepts_multipart: true,
            ..self
        }
    }

    /// Upstream path with `{id}` expanded
    pub fn path_with_id(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => self
                .upstream_path
                .replace("{id}", &urlencoding::encode(id)),
            None => self.upstream_path.to_string(),
        }
    }
}

const fn owner(param: &'static str) -> AccessPolicy {
    AccessPolicy::Owner { param }
}

pub mod routes {
    //! The proxy route table

    use super::{owner, AccessPolicy, ProxyRoute};

    pub const WILLS: ProxyRoute = ProxyRoute::new("wills", "/wills", owner("user_email"));
    pub const WILL: ProxyRoute = ProxyRoute::new("will", "/wills/{id}", owner("user_email"));
    pub const WILL_PDF: ProxyRoute =
        ProxyRoute::new("will_pdf", "/wills/{id}/pdf", owner("user_email"));

    pub const DOCUMENTS_LIST: ProxyRoute =
        ProxyRoute::new("documents_list", "/documents/list", owner("email"));
    pub const DOCUMENTS_UPLOAD: ProxyRoute =
        ProxyRoute::new("documents_upload", "/documents/upload", owner("email"))
            .accepting_multipart();

    pub const HEIRS: ProxyRoute = ProxyRoute::new("heirs", "/heirs", AccessPolicy::Authenticated);

    pub const NOTARY: ProxyRoute = ProxyRoute::new("notary", "/notary/requests", owner("email"));

    pub const BOT_GRIEF: ProxyRoute = ProxyRoute::new("bot_grief", "/bot/grief", owner("email"));
    pub const BOT_HELP: ProxyRoute = ProxyRoute::new("bot_help", "/bot/help", owner("email"));

    pub const COMPLIANCE_RULES: ProxyRoute =
        ProxyRoute::new("compliance_rules", "/compliance/rules", AccessPolicy::Public);
    pub const COMPLIANCE_SUMMARY: ProxyRoute =
        ProxyRoute::new("compliance_summary", "/compliance/summary", AccessPolicy::Public);

    pub const PET_TRUST_SAVE: ProxyRoute =
        ProxyRoute::new("pet_trust_save", "/pet-trust/save", owner("email"));
    pub const PET_TRUST_PDF: ProxyRoute =
        ProxyRoute::new("pet_trust_pdf", "/pet-trust/pdf", owner("email"));

    pub const PAYMENTS_CHECKOUT: ProxyRoute =
        ProxyRoute::new("payments_checkout", "/payments/create-checkout", owner("email"));
    pub const PAYMENTS_STATUS: ProxyRoute =
        ProxyRoute::new("payments_status", "/payments/status", owner("email"));

    pub const LIVE_EVENT: ProxyRoute = ProxyRoute::new("live_event", "/live/event", owner("email"));
    pub const LIVE_STATUS: ProxyRoute =
        ProxyRoute::new("live_status", "/live/status", owner("email"));

    pub const USERS: ProxyRoute = ProxyRoute::new("users", "/users", owner("email"));
}

/// Top-level fields of a JSON object body as name/value pairs.
///
/// Strings are taken as-is; other non-null values keep their JSON text, so a
/// number or object supplied for an identifying parameter never matches an
/// email.
pub fn json_fields(body: &Value) -> Vec<(String, String)> {
    let Some(object) = body.as_object() else {
        return Vec::new();
    };

    object
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

/// Every value supplied for an identifying parameter: each occurrence in the
/// query string, then each occurrence among the body fields. Blank values
/// count as absent.
pub fn find_params(
    name: &str,
    query: &[(String, String)],
    body: &[(String, String)],
) -> Vec<String> {
    query
        .iter()
        .chain(body)
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Apply a route's policy.
///
/// Returns the principal whose identity should be forwarded upstream, or
/// `None` for public routes.
pub fn authorize(
    policy: AccessPolicy,
    principal: Option<&Principal>,
    query: &[(String, String)],
    body: &[(String, String)],
) -> Result<Option<Principal>> {
    match policy {
        AccessPolicy::Public => Ok(None),
        AccessPolicy::Authenticated => principal
            .cloned()
            .map(Some)
            .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())),
        AccessPolicy::Owner { param } => {
            let claimed = find_params(param, query, body);
            if claimed.is_empty() {
                return Err(AppError::BadRequest(format!("Missing {}", param)));
            }

            let principal = principal
                .ok_or_else(|| AppError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string()))?;

            // Every occurrence must name the caller, or a second copy of the
            // parameter would reach the upstream unchecked
            if !claimed.iter().all(|c| principal.owns(c)) {
                tracing::warn!(
                    subject = %principal.subject,
                    param = param,
                    "Rejected access to another principal's data"
                );
                return Err(AppError::Forbidden(FORBIDDEN_MESSAGE.to_string()));
            }

            Ok(Some(principal.clone()))
        }
    }
}
