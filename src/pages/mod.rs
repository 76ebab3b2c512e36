//! Server-rendered pages
//!
//! Each list page issues one uncached read through the same forwarding path
//! the JSON API uses, so the access policy applies to pages too. Upstream
//! failures never fail the page: the list renders its error and empty state.

pub mod templates;
pub mod view;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use validator::Validate;

use crate::api::{self, Inbound};
use crate::middleware::{OptionalPrincipal, Principal};
use crate::policy::{routes, ProxyRoute};
use crate::state::AppState;
use crate::upstream::transport_error;
use templates::TemplateEngine;
use view::{Column, FormState, ListState};

const WILL_COLUMNS: &[Column] = &[
    Column::text("Title", &["title", "name"]),
    Column::badge("Status", &["status"]),
    Column::text("Updated", &["updated_at", "created_at"]),
];

const DOCUMENT_COLUMNS: &[Column] = &[
    Column::text("File", &["filename", "name", "title"]),
    Column::text("Type", &["content_type", "type"]),
    Column::text("Uploaded", &["uploaded_at", "created_at"]),
];

const HEIR_COLUMNS: &[Column] = &[
    Column::text("Name", &["name"]),
    Column::text("Relation", &["relation"]),
    Column::text("Email", &["email"]),
];

const NOTARY_COLUMNS: &[Column] = &[
    Column::text("Document", &["document", "document_name", "title"]),
    Column::badge("Status", &["status"]),
    Column::text("Scheduled", &["scheduled_at", "appointment", "created_at"]),
];

const COMPLIANCE_COLUMNS: &[Column] = &[
    Column::text("State", &["state", "jurisdiction"]),
    Column::text("Witnesses", &["witnesses", "witnesses_required"]),
    Column::text("Notarization", &["notarization", "notary_required"]),
    Column::text("Notes", &["notes", "summary", "description"]),
];

fn render_page(title: &str, principal: Option<&Principal>, content: String) -> Html<String> {
    let mut engine = TemplateEngine::new();
    engine.set("title", title).set_html("content", content);

    match principal {
        Some(p) => {
            let mut account = TemplateEngine::new();
            account.set("email", &p.email);
            engine
                .set_html("nav", templates::NAV_SIGNED_IN)
                .set_html("account", account.render(templates::ACCOUNT_SIGNED_IN));
        }
        None => {
            engine.set_html("nav", "").set_html("account", "");
        }
    }

    Html(engine.render(templates::LAYOUT))
}

fn login_redirect(state: &AppState, callback: &str) -> Response {
    Redirect::to(&format!(
        "{}?callbackUrl={}",
        state.config.gate.login_path,
        urlencoding::encode(callback)
    ))
    .into_response()
}

fn owner_query(param: &str, principal: &Principal) -> String {
    format!("{}={}", param, urlencoding::encode(&principal.email))
}

/// Issue one upstream call and reduce the outcome to a value or a message
/// fit to show the user.
async fn call(
    state: &AppState,
    route: &ProxyRoute,
    principal: &Principal,
    inbound: Inbound,
) -> Result<Value, String> {
    let resp = api::forward(state, route, None, Some(principal), &inbound)
        .await
        .map_err(|e| e.public_message())?;

    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| transport_error(e).public_message())?;

    if status.is_success() {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        return serde_json::from_slice(&bytes).map_err(|_| {
            tracing::warn!(route = route.name, "Upstream returned a non-JSON body");
            "Invalid response from upstream service".to_string()
        });
    }

    let detail = serde_json::from_slice::<Value>(&bytes).ok().and_then(|v| {
        v.get("error")
            .or_else(|| v.get("detail"))
            .and_then(Value::as_str)
            .map(String::from)
    });
    Err(detail.unwrap_or_else(|| format!("Request failed ({})", status.as_u16())))
}

async fn load_list(
    state: &AppState,
    route: &ProxyRoute,
    principal: &Principal,
    query: Option<String>,
) -> ListState {
    ListState::from_result(call(state, route, principal, Inbound::new(Method::GET, query)).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
    pub error: Option<String>,
}

/// GET /login
pub async fn login(
    OptionalPrincipal(principal): OptionalPrincipal,
    Query(query): Query<LoginQuery>,
) -> Response {
    let callback = api::auth::safe_callback_path(query.callback_url.as_deref());
    if principal.is_some() {
        return Redirect::to(&callback).into_response();
    }

    let message = match query.error.as_deref() {
        Some(_) => FormState::Failed("Sign-in was not completed. Please try again.".to_string()),
        None => FormState::Idle,
    };

    let mut engine = TemplateEngine::new();
    engine
        .set(
            "signin_href",
            format!("/api/auth/signin?callbackUrl={}", urlencoding::encode(&callback)),
        )
        .set_html("message", message.render_message());

    render_page("Sign in", None, engine.render(templates::LOGIN_CONTENT)).into_response()
}

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Response {
    let Some(principal) = principal else {
        return login_redirect(&state, "/dashboard");
    };

    let mut engine = TemplateEngine::new();
    engine.set(
        "display_name",
        principal.name.as_deref().unwrap_or(&principal.email),
    );
    render_page(
        "Overview",
        Some(&principal),
        engine.render(templates::DASHBOARD_CONTENT),
    )
    .into_response()
}

/// GET /dashboard/wills
pub async fn wills(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Response {
    let Some(principal) = principal else {
        return login_redirect(&state, "/dashboard/wills");
    };

    let list = load_list(
        &state,
        &routes::WILLS,
        &principal,
        Some(owner_query("user_email", &principal)),
    )
    .await;
    let content = list.render(WILL_COLUMNS, "You have not started a will yet.");
    render_page("Wills", Some(&principal), content).into_response()
}

/// GET /dashboard/documents
pub async fn documents(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Response {
    let Some(principal) = principal else {
        return login_redirect(&state, "/dashboard/documents");
    };

    let list = load_list(
        &state,
        &routes::DOCUMENTS_LIST,
        &principal,
        Some(owner_query("email", &principal)),
    )
    .await;
    let content = list.render(DOCUMENT_COLUMNS, "No documents in your vault.");
    render_page("Documents", Some(&principal), content).into_response()
}

/// GET /dashboard/notary
pub async fn notary(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Response {
    let Some(principal) = principal else {
        return login_redirect(&state, "/dashboard/notary");
    };

    let list = load_list(
        &state,
        &routes::NOTARY,
        &principal,
        Some(owner_query("email", &principal)),
    )
    .await;
    let content = list.render(NOTARY_COLUMNS, "No notary requests.");
    render_page("Notary", Some(&principal), content).into_response()
}

/// GET /dashboard/compliance
pub async fn compliance(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Response {
    let Some(principal) = principal else {
        return login_redirect(&state, "/dashboard/compliance");
    };

    let list = load_list(&state, &routes::COMPLIANCE_RULES, &principal, None).await;
    let content = list.render(COMPLIANCE_COLUMNS, "No compliance rules available.");
    render_page("Compliance", Some(&principal), content).into_response()
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Add-heir form
#[derive(Debug, Default, Deserialize, Validate)]
pub struct HeirForm {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Relation is required"))]
    pub relation: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
}

impl HeirForm {
    fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            relation: self.relation.trim().to_string(),
            email: self.email,
        }
    }

    /// First validation message, in field order
    fn first_error(&self) -> Option<String> {
        let errors = self.validate().err()?;
        let fields = errors.field_errors();
        ["name", "relation", "email"].iter().find_map(|field| {
            fields.get(*field).and_then(|errs| {
                errs.first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
            })
        })
    }

    fn to_json(&self) -> Value {
        let mut body = json!({ "name": self.name, "relation": self.relation });
        if let Some(email) = &self.email {
            body["email"] = json!(email);
        }
        body
    }
}

async fn render_heirs(
    state: &AppState,
    principal: &Principal,
    form: &HeirForm,
    form_state: &FormState,
) -> Html<String> {
    let list = load_list(state, &routes::HEIRS, principal, None).await;

    let mut engine = TemplateEngine::new();
    engine
        .set("name", &form.name)
        .set("relation", &form.relation)
        .set("email", form.email.as_deref().unwrap_or(""))
        .set_html("form_message", form_state.render_message());

    let content = format!(
        "{}{}",
        list.render(HEIR_COLUMNS, "No heirs added yet."),
        engine.render(templates::HEIR_FORM)
    );
    render_page("Heirs", Some(principal), content)
}

/// GET /dashboard/heirs
pub async fn heirs(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
) -> Response {
    let Some(principal) = principal else {
        return login_redirect(&state, "/dashboard/heirs");
    };
    render_heirs(&state, &principal, &HeirForm::default(), &FormState::Idle)
        .await
        .into_response()
}

/// POST /dashboard/heirs
///
/// Invalid input is answered with the form and its message; nothing is sent
/// upstream.
pub async fn add_heir(
    State(state): State<AppState>,
    OptionalPrincipal(principal): OptionalPrincipal,
    Form(form): Form<HeirForm>,
) -> Response {
    let Some(principal) = principal else {
        return login_redirect(&state, "/dashboard/heirs");
    };

    let form = form.trimmed();
    let mut form_state = FormState::Idle;

    if let Some(message) = form.first_error() {
        form_state.finish(Err(message));
        let page = render_heirs(&state, &principal, &form, &form_state).await;
        return (StatusCode::UNPROCESSABLE_ENTITY, page).into_response();
    }

    let inbound = Inbound::new(Method::POST, None).with_json(&form.to_json());
    let outcome = call(&state, &routes::HEIRS, &principal, inbound).await;

    match outcome {
        Ok(_) => {
            form_state.finish(Ok(format!("{} was added as an heir.", form.name)));
            render_heirs(&state, &principal, &HeirForm::default(), &form_state)
                .await
                .into_response()
        }
        Err(message) => {
            tracing::info!("Heir submission failed: {}", message);
            form_state.finish(Err(message));
            render_heirs(&state, &principal, &form, &form_state)
                .await
                .into_response()
        }
    }
}

/// GET /assets/forms.js
pub async fn forms_js() -> impl IntoResponse {
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/javascript; charset=utf-8"),
            ),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=3600"),
            ),
        ],
        templates::FORMS_JS,
    )
}
