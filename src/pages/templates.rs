//! HTML page templates
//!
//! Variables use `{{name}}` syntax. Values set with [`TemplateEngine::set`]
//! are HTML-escaped; [`TemplateEngine::set_html`] is for fragments this crate
//! built itself from already-escaped parts.

use std::collections::HashMap;

/// Template rendering engine with single-pass variable substitution
#[derive(Debug, Default)]
pub struct TemplateEngine {
    variables: HashMap<String, String>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text variable (escaped on insert)
    pub fn set(&mut self, key: impl Into<String>, value: impl AsRef<str>) -> &mut Self {
        self.variables
            .insert(key.into(), escape_html(value.as_ref()));
        self
    }

    /// Set a pre-rendered HTML fragment
    pub fn set_html(&mut self, key: impl Into<String>, html: impl Into<String>) -> &mut Self {
        self.variables.insert(key.into(), html.into());
        self
    }

    /// Render a template. Unknown placeholders are left as-is, and substituted
    /// values are never scanned again.
    pub fn render(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    let key = &after[..end];
                    match self.variables.get(key) {
                        Some(value) => out.push_str(value),
                        None => {
                            out.push_str("{{");
                            out.push_str(key);
                            out.push_str("}}");
                        }
                    }
                    rest = &after[end + 2..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Escape text for HTML element content and quoted attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Shared page chrome
pub const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{title}} | Estate Planner</title>
<style>
body { font-family: system-ui, sans-serif; margin: 0; color: #1f2937; background: #f9fafb; }
header { display: flex; justify-content: space-between; align-items: center; padding: 1rem 2rem; background: #111827; color: #f9fafb; }
header a { color: #f9fafb; margin-right: 1rem; text-decoration: none; }
main { max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
table { width: 100%; border-collapse: collapse; background: #fff; }
th, td { text-align: left; padding: .5rem .75rem; border-bottom: 1px solid #e5e7eb; }
.empty { color: #6b7280; font-style: italic; }
.error { color: #b91c1c; }
.success { color: #047857; }
.badge { padding: .1rem .5rem; border-radius: 9999px; background: #e5e7eb; font-size: .85em; }
.badge-ok { background: #d1fae5; }
.badge-warn { background: #fef3c7; }
form.inline { display: inline; }
</style>
<script src="/assets/forms.js" defer></script>
</head>
<body>
<header>
<nav>{{nav}}</nav>
<div>{{account}}</div>
</header>
<main>
<h1>{{title}}</h1>
{{content}}
</main>
</body>
</html>
"#;

pub const NAV_SIGNED_IN: &str = r#"<a href="/dashboard">Overview</a><a href="/dashboard/wills">Wills</a><a href="/dashboard/documents">Documents</a><a href="/dashboard/heirs">Heirs</a><a href="/dashboard/notary">Notary</a><a href="/dashboard/compliance">Compliance</a>"#;

pub const ACCOUNT_SIGNED_IN: &str = r#"<span>{{email}}</span>
<form class="inline" method="post" action="/api/auth/signout"><button type="submit" data-busy-label="Signing out...">Sign out</button></form>"#;

pub const LOGIN_CONTENT: &str = r#"<p>Sign in to manage your will, documents and heirs.</p>
{{message}}
<p><a href="{{signin_href}}">Continue with your account provider</a></p>"#;

pub const DASHBOARD_CONTENT: &str = r#"<p>Welcome back, {{display_name}}.</p>
<ul>
<li><a href="/dashboard/wills">Review your wills</a></li>
<li><a href="/dashboard/documents">Open the document vault</a></li>
<li><a href="/dashboard/heirs">Manage heirs</a></li>
<li><a href="/dashboard/notary">Track notary requests</a></li>
<li><a href="/dashboard/compliance">Check state compliance rules</a></li>
</ul>"#;

pub const HEIR_FORM: &str = r#"<h2>Add an heir</h2>
{{form_message}}
<form method="post" action="/dashboard/heirs">
<p><label>Name <input name="name" value="{{name}}"></label></p>
<p><label>Relation <input name="relation" value="{{relation}}"></label></p>
<p><label>Email (optional) <input name="email" type="email" value="{{email}}"></label></p>
<p><button type="submit" data-busy-label="Saving...">Add heir</button></p>
</form>"#;

/// Disables a form's submit button once it is submitted, so a request is
/// never sent twice while one is in flight
pub const FORMS_JS: &str = r#"document.addEventListener("submit", function (event) {
  var button = event.target.querySelector('button[type="submit"]');
  if (!button) { return; }
  if (button.disabled) { event.preventDefault(); return; }
  button.disabled = true;
  if (button.dataset.busyLabel) { button.textContent = button.dataset.busyLabel; }
});
"#;
