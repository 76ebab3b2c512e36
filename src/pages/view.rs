//! View state for list pages and forms

use serde_json::Value;

use super::templates::escape_html;

/// Accept either a raw array or an envelope with an `items` array
pub fn extract_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Outcome of a list view's single read
#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
    Loaded(Vec<Value>),
    Empty,
    /// Inline error message; the view still falls back to its empty state
    Failed(String),
}

impl ListState {
    pub fn from_result(result: Result<Value, String>) -> Self {
        match result {
            Ok(value) => {
                let items = extract_items(value);
                if items.is_empty() {
                    ListState::Empty
                } else {
                    ListState::Loaded(items)
                }
            }
            Err(message) => ListState::Failed(message),
        }
    }

    pub fn items(&self) -> &[Value] {
        match self {
            ListState::Loaded(items) => items,
            _ => &[],
        }
    }

    /// Render as an HTML fragment
    pub fn render(&self, columns: &[Column], empty_message: &str) -> String {
        match self {
            ListState::Loaded(items) => render_table(items, columns),
            ListState::Empty => empty(empty_message),
            ListState::Failed(message) => format!(
                r#"<p class="error" role="alert">{}</p>{}"#,
                escape_html(message),
                empty(empty_message)
            ),
        }
    }
}

fn empty(message: &str) -> String {
    format!(r#"<p class="empty">{}</p>"#, escape_html(message))
}

/// A displayed column. The first key present on a row supplies the value,
/// since upstream records are not strictly shaped.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub keys: &'static [&'static str],
    pub badge: bool,
}

impl Column {
    pub const fn text(header: &'static str, keys: &'static [&'static str]) -> Self {
        Self {
            header,
            keys,
            badge: false,
        }
    }

    pub const fn badge(header: &'static str, keys: &'static [&'static str]) -> Self {
        Self {
            header,
            keys,
            badge: true,
        }
    }

    fn value(&self, row: &Value) -> String {
        self.keys
            .iter()
            .find_map(|k| row.get(*k))
            .map(display_value)
            .unwrap_or_default()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        other => other.to_string(),
    }
}

/// CSS class for a status badge
pub fn badge_class(status: &str) -> &'static str {
    match status.to_ascii_lowercase().as_str() {
        "completed" | "complete" | "signed" | "notarized" | "active" | "paid" | "uploaded" => {
            "badge badge-ok"
        }
        "pending" | "draft" | "scheduled" | "in_progress" | "processing" => "badge badge-warn",
        _ => "badge",
    }
}

fn render_table(items: &[Value], columns: &[Column]) -> String {
    let mut html = String::from("<table><thead><tr>");
    for column in columns {
        html.push_str("<th>");
        html.push_str(&escape_html(column.header));
        html.push_str("</th>");
    }
    html.push_str("</tr></thead><tbody>");

    for row in items {
        html.push_str("<tr>");
        for column in columns {
            let value = column.value(row);
            if column.badge && !value.is_empty() {
                html.push_str(&format!(
                    r#"<td><span class="{}">{}</span></td>"#,
                    badge_class(&value),
                    escape_html(&value)
                ));
            } else {
                html.push_str(&format!("<td>{}</td>", escape_html(&value)));
            }
        }
        html.push_str("</tr>");
    }

    html.push_str("</tbody></table>");
    html
}

/// Outcome of the last form submission, as shown beside the form. There is
/// no automatic retry: a failed submission stays failed until the user
/// submits again. The in-flight state lives in the browser (`forms.js`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FormState {
    #[default]
    Idle,
    Succeeded(String),
    Failed(String),
}

impl FormState {
    /// Record the terminal outcome
    pub fn finish(&mut self, outcome: Result<String, String>) {
        *self = match outcome {
            Ok(message) => FormState::Succeeded(message),
            Err(message) => FormState::Failed(message),
        };
    }

    pub fn message(&self) -> Option<(&'static str, &str)> {
        match self {
            FormState::Succeeded(m) => Some(("success", m)),
            FormState::Failed(m) => Some(("error", m)),
            FormState::Idle => None,
        }
    }

    pub fn render_message(&self) -> String {
        match self.message() {
            Some((class, text)) => format!(
                r#"<p class="{}" role="status">{}</p>"#,
                class,
                escape_html(text)
            ),
            None => String::new(),
        }
    }
}
