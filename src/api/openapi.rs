use super::handlers::{
    auth::{forgot_password, login, logout, onboarding, reset_password, signup, verify},
    health, root,
    settings::{password, profile},
};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Every page is registered here with `.routes(routes!(...))`; handlers that
/// share a path are grouped so `GET` and `POST` land on one route.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(root::root))
        .routes(routes!(login::login_page, login::login))
        .routes(routes!(logout::logout_page, logout::logout))
        .routes(routes!(signup::signup_page, signup::signup))
        .routes(routes!(
            forgot_password::forgot_password_page,
            forgot_password::forgot_password
        ))
        .routes(routes!(verify::verify_page, verify::verify))
        .routes(routes!(onboarding::onboarding_page, onboarding::onboarding))
        .routes(routes!(
            reset_password::reset_password_page,
            reset_password::reset_password
        ))
        .routes(routes!(profile::profile_page, profile::profile))
        .routes(routes!(password::password_page, password::change_password))
        .routes(routes!(password::create_password));

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, signup, verification and password reset".to_string());

    let mut settings_tag = Tag::new("settings");
    settings_tag.description = Some("Profile and password of the logged-in user".to_string());

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness and database status".to_string());

    router.get_openapi_mut().tags = Some(vec![auth_tag, settings_tag, health_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author<'a>(author: &'a str) -> (Option<&'a str>, Option<&'a str>) {
    let non_empty = |value: &'a str| (!value.is_empty()).then_some(value);
    match author.split_once('<') {
        Some((name, email)) => (
            non_empty(name.trim()),
            non_empty(email.trim_end_matches('>').trim()),
        ),
        None => (non_empty(author.trim()), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Grape Stack"));
            assert_eq!(contact.email.as_deref(), Some("team@grapestack.dev"));
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_documents_every_page() {
        let doc = openapi();
        for path in [
            "/",
            "/health",
            "/login",
            "/logout",
            "/signup",
            "/forgot-password",
            "/verify",
            "/onboarding",
            "/reset-password",
            "/settings/profile",
            "/settings/profile/password",
            "/settings/profile/password/create",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let tags = doc.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "settings"));
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Kody <kody@example.com>"),
            (Some("Kody"), Some("kody@example.com"))
        );
        assert_eq!(parse_author("Kody"), (Some("Kody"), None));
        assert_eq!(parse_author("<kody@example.com>"), (None, Some("kody@example.com")));
    }
}
