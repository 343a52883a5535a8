//! Minimal server-rendered markup shared by every page.

use axum::response::Html;
use std::fmt::Write as _;

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:32rem;margin:3rem auto;padding:0 1rem}\
label{display:block;margin-top:1rem}input,textarea{width:100%}\
.error{color:#b00020;font-size:.875rem;margin:.25rem 0}";

/// Escape text for HTML element content and double-quoted attributes.
#[must_use]
pub fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[must_use]
pub fn document(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
<title>{} | Grape Stack</title><style>{STYLE}</style></head><body>{body}</body></html>",
        escape(title)
    ))
}

#[must_use]
pub fn error_list(id: &str, errors: &[String]) -> String {
    if errors.is_empty() {
        return String::new();
    }
    let mut out = format!("<ul id=\"{}-errors\">", escape(id));
    for error in errors {
        let _ = write!(out, "<li class=\"error\">{}</li>", escape(error));
    }
    out.push_str("</ul>");
    out
}

#[must_use]
pub fn input(label: &str, name: &str, kind: &str, value: &str, errors: &[String]) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\
<input id=\"{name}\" name=\"{name}\" type=\"{kind}\" value=\"{value}\"{invalid}>{errors}",
        name = escape(name),
        label = escape(label),
        kind = escape(kind),
        value = escape(value),
        invalid = if errors.is_empty() {
            ""
        } else {
            " aria-invalid=\"true\""
        },
        errors = error_list(name, errors),
    )
}

#[must_use]
pub fn textarea(label: &str, name: &str, value: &str, errors: &[String]) -> String {
    format!(
        "<label for=\"{name}\">{label}</label>\
<textarea id=\"{name}\" name=\"{name}\">{value}</textarea>{errors}",
        name = escape(name),
        label = escape(label),
        value = escape(value),
        errors = error_list(name, errors),
    )
}

#[must_use]
pub fn checkbox(label: &str, name: &str, checked: bool, errors: &[String]) -> String {
    format!(
        "<label><input name=\"{name}\" type=\"checkbox\"{checked}> {label}</label>{errors}",
        name = escape(name),
        label = escape(label),
        checked = if checked { " checked" } else { "" },
        errors = error_list(name, errors),
    )
}

#[must_use]
pub fn hidden(name: &str, value: &str) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
        escape(name),
        escape(value)
    )
}

#[must_use]
pub fn submit(label: &str) -> String {
    format!("<button type=\"submit\">{}</button>", escape(label))
}

#[must_use]
pub fn submit_intent(label: &str, intent: &str) -> String {
    format!(
        "<button type=\"submit\" name=\"intent\" value=\"{}\">{}</button>",
        escape(intent),
        escape(label)
    )
}

/// A POST form to `action` wrapping `fields` and form-level errors.
#[must_use]
pub fn form(id: &str, action: &str, fields: &str, form_errors: &[String]) -> String {
    format!(
        "<form id=\"{id}\" method=\"post\" action=\"{action}\">{fields}{errors}</form>",
        id = escape(id),
        action = escape(action),
        errors = error_list(id, form_errors),
    )
}
