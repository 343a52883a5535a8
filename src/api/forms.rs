//! Per-field validation errors collected while handling a form submission.

use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    form: Vec<String>,
    fields: BTreeMap<&'static str, Vec<String>>,
}

impl FormErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, name: &'static str, message: impl Into<String>) {
        self.fields.entry(name).or_default().push(message.into());
    }

    pub fn form(&mut self, message: impl Into<String>) {
        self.form.push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.values().all(Vec::is_empty)
    }

    #[must_use]
    pub fn field_errors(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn form_errors(&self) -> &[String] {
        &self.form
    }
}

/// HTML checkboxes are submitted as `on` when ticked and omitted otherwise.
#[must_use]
pub fn checked(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty() && value != "off" && value != "false")
}
