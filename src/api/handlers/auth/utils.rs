//! Validation and redirect helpers shared by the auth pages.

use axum::http::Uri;
use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded;

use crate::api::forms::FormErrors;

pub const PASSWORD_MIN_BYTES: usize = 6;
pub const PASSWORD_MAX_BYTES: usize = 72;
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const EMAIL_MIN: usize = 3;
const EMAIL_MAX: usize = 100;

static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());
static USERNAME_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").ok());

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

pub fn validate_email(errors: &mut FormErrors, field: &'static str, email: &str) {
    let length = email.chars().count();
    if length < EMAIL_MIN {
        errors.field(field, "Email is too short");
    } else if length > EMAIL_MAX {
        errors.field(field, "Email is too long");
    } else if !EMAIL_RE.as_ref().is_some_and(|re| re.is_match(email)) {
        errors.field(field, "Email is invalid");
    }
}

pub fn validate_username(errors: &mut FormErrors, field: &'static str, username: &str) {
    let length = username.chars().count();
    if length < USERNAME_MIN {
        errors.field(field, "Username is too short");
    } else if length > USERNAME_MAX {
        errors.field(field, "Username is too long");
    } else if !USERNAME_RE.as_ref().is_some_and(|re| re.is_match(username)) {
        errors.field(
            field,
            "Username can only include letters, numbers, and underscores",
        );
    }
}

/// Password length is measured in bytes; argon2 accepts longer input but the
/// policy caps it at 72.
pub fn validate_password(errors: &mut FormErrors, field: &'static str, password: &str) {
    if password.len() < PASSWORD_MIN_BYTES {
        errors.field(field, "Password is too short");
    } else if password.len() > PASSWORD_MAX_BYTES {
        errors.field(field, "Password is too long");
    }
}

/// New password plus its confirmation, as used by onboarding, reset and change.
pub fn validate_new_password(errors: &mut FormErrors, password: &str, confirm: &str) {
    validate_password(errors, "password", password);
    if password != confirm {
        errors.field("confirmPassword", "The passwords must match");
    }
}

/// Same-site path to continue to after login, `/` for anything else.
#[must_use]
pub fn safe_redirect(to: Option<&str>) -> String {
    match to.map(str::trim) {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// `/login?redirectTo=<path+query>` for the request that needed a login.
#[must_use]
pub fn login_redirect(uri: &Uri) -> String {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string);
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("redirectTo", &target)
        .finish();
    format!("/login?{query}")
}

/// Append `redirectTo` to `path` when the caller supplied one.
#[must_use]
pub fn with_redirect_to(path: &str, redirect_to: Option<&str>) -> String {
    match redirect_to.map(str::trim).filter(|value| !value.is_empty()) {
        Some(redirect_to) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("redirectTo", redirect_to)
                .finish();
            format!("{path}?{query}")
        }
        None => path.to_string(),
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == "23505")
}

pub(crate) fn unique_violation_constraint(err: &sqlx::Error) -> Option<String> {
    if !is_unique_violation(err) {
        return None;
    }
    err.as_database_error()
        .and_then(|db_err| db_err.constraint())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_for(check: impl Fn(&mut FormErrors)) -> Vec<String> {
        let mut errors = FormErrors::new();
        check(&mut errors);
        ["email", "username", "password", "confirmPassword"]
            .iter()
            .flat_map(|field| errors.field_errors(field).to_vec())
            .collect()
    }

    #[test]
    fn password_policy_counts_bytes() {
        assert_eq!(
            errors_for(|e| validate_password(e, "password", "12345")),
            vec!["Password is too short"]
        );
        assert!(errors_for(|e| validate_password(e, "password", "123456")).is_empty());
        assert!(errors_for(|e| validate_password(e, "password", &"a".repeat(72))).is_empty());
        assert_eq!(
            errors_for(|e| validate_password(e, "password", &"a".repeat(73))),
            vec!["Password is too long"]
        );
        // 24 three-byte characters are 72 bytes; one more exceeds the limit.
        assert!(errors_for(|e| validate_password(e, "password", &"€".repeat(24))).is_empty());
        assert_eq!(
            errors_for(|e| validate_password(e, "password", &"€".repeat(25))),
            vec!["Password is too long"]
        );
    }

    #[test]
    fn new_password_must_match_confirmation() {
        assert_eq!(
            errors_for(|e| validate_new_password(e, "secret1", "secret2")),
            vec!["The passwords must match"]
        );
        assert!(errors_for(|e| validate_new_password(e, "secret1", "secret1")).is_empty());
    }

    #[test]
    fn username_rules() {
        assert_eq!(
            errors_for(|e| validate_username(e, "username", "ab")),
            vec!["Username is too short"]
        );
        assert_eq!(
            errors_for(|e| validate_username(e, "username", &"a".repeat(21))),
            vec!["Username is too long"]
        );
        assert_eq!(
            errors_for(|e| validate_username(e, "username", "grape-stack")),
            vec!["Username can only include letters, numbers, and underscores"]
        );
        assert!(errors_for(|e| validate_username(e, "username", "grape_stack1")).is_empty());
    }

    #[test]
    fn email_rules() {
        assert!(errors_for(|e| validate_email(e, "email", "kody@grapestack.dev")).is_empty());
        assert_eq!(
            errors_for(|e| validate_email(e, "email", "not-an-email")),
            vec!["Email is invalid"]
        );
        assert_eq!(
            errors_for(|e| validate_email(e, "email", "a@")),
            vec!["Email is too short"]
        );
    }

    #[test]
    fn normalizes_identifiers() {
        assert_eq!(normalize_email(" Kody@Example.COM "), "kody@example.com");
        assert_eq!(normalize_username(" Kody_1 "), "kody_1");
    }

    #[test]
    fn safe_redirect_only_allows_local_paths() {
        assert_eq!(safe_redirect(Some("/settings/profile")), "/settings/profile");
        assert_eq!(safe_redirect(Some("/a?b=c")), "/a?b=c");
        assert_eq!(safe_redirect(Some("//evil.example")), "/");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.example")), "/");
        assert_eq!(safe_redirect(Some("")), "/");
        assert_eq!(safe_redirect(None), "/");
    }

    #[test]
    fn login_redirect_preserves_path_and_query() {
        let uri: Uri = "/settings/profile?tab=sessions&x=1".parse().unwrap_or_default();
        let location = login_redirect(&uri);
        assert_eq!(
            location,
            "/login?redirectTo=%2Fsettings%2Fprofile%3Ftab%3Dsessions%26x%3D1"
        );

        let query = location.split_once('?').map(|(_, q)| q).unwrap_or_default();
        let decoded: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        assert_eq!(
            decoded,
            vec![(
                "redirectTo".to_string(),
                "/settings/profile?tab=sessions&x=1".to_string()
            )]
        );
    }

    #[test]
    fn with_redirect_to_skips_blank_values() {
        assert_eq!(with_redirect_to("/onboarding", None), "/onboarding");
        assert_eq!(with_redirect_to("/onboarding", Some(" ")), "/onboarding");
        assert_eq!(
            with_redirect_to("/onboarding", Some("/settings/profile")),
            "/onboarding?redirectTo=%2Fsettings%2Fprofile"
        );
    }
}
