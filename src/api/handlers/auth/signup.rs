//! `/signup`: start onboarding by proving control of an email address.

use axum::{
    extract::{Extension, Form, Query, rejection::FormRejection, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;

use super::{
    identity::require_anonymous,
    login::RedirectQuery,
    state::AuthState,
    storage,
    utils::{normalize_email, validate_email},
    verification::{VerificationType, prepare_verification},
};
use crate::api::{
    email::onboarding_email,
    error::PageError,
    forms::FormErrors,
    handlers::html,
    pages,
};

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    #[serde(default)]
    email: String,
    redirect_to: Option<String>,
    /// Hidden from people; bots fill it in.
    #[serde(rename = "name__confirm")]
    honeypot: Option<String>,
}

fn render(form: &SignupForm, errors: &FormErrors, status: StatusCode) -> Response {
    let fields = [
        pages::input(
            "Email",
            "email",
            "email",
            &form.email,
            errors.field_errors("email"),
        ),
        "<div style=\"display:none\" aria-hidden=\"true\">".to_string(),
        pages::input("Please leave this field blank", "name__confirm", "text", "", &[]),
        "</div>".to_string(),
        pages::hidden("redirectTo", form.redirect_to.as_deref().unwrap_or_default()),
        pages::submit("Submit"),
    ]
    .concat();
    let body = format!(
        "<main><h1>Let's start your journey!</h1><p>Please enter your email.</p>{}\
<p>Already have an account? <a href=\"/login\">Log in</a></p></main>",
        pages::form("signup-form", "/signup", &fields, errors.form_errors())
    );
    html(status, "Sign Up", &body)
}

#[utoipa::path(
    get,
    path = "/signup",
    params(RedirectQuery),
    responses(
        (status = 200, description = "Signup form", content_type = "text/html", body = String),
        (status = 303, description = "Already logged in")
    ),
    tag = "auth"
)]
pub async fn signup_page(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    query: Result<Query<RedirectQuery>, QueryRejection>,
) -> Response {
    if let Err(response) = require_anonymous(&headers, &pool, &auth_state).await {
        return response;
    }
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let form = SignupForm {
        redirect_to: query.redirect_to,
        ..SignupForm::default()
    };
    render(&form, &FormErrors::new(), StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/signup",
    request_body(content = SignupForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Code emailed, continue at /verify"),
        (status = 400, description = "Invalid or taken email", content_type = "text/html", body = String),
        (status = 500, description = "Email could not be sent", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn signup(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<SignupForm>, FormRejection>,
) -> Response {
    if let Err(response) = require_anonymous(&headers, &pool, &auth_state).await {
        return response;
    }
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };
    if form.honeypot.as_deref().is_some_and(|value| !value.is_empty()) {
        return PageError::BadRequest("Form not submitted properly").into_response();
    }

    let mut errors = FormErrors::new();
    let email = normalize_email(&form.email);
    validate_email(&mut errors, "email", &email);
    if errors.is_empty() {
        match storage::email_taken(&pool, &email).await {
            Ok(true) => errors.field("email", "Email is already taken"),
            Ok(false) => {}
            Err(err) => return PageError::from(err).into_response(),
        }
    }
    if !errors.is_empty() {
        return render(&form, &errors, StatusCode::BAD_REQUEST);
    }

    let prepared = match prepare_verification(
        &pool,
        auth_state.config(),
        VerificationType::Onboarding,
        &email,
        form.redirect_to.as_deref(),
    )
    .await
    {
        Ok(prepared) => prepared,
        Err(err) => return PageError::from(err).into_response(),
    };

    let message = onboarding_email(&email, &prepared.verify_url, &prepared.otp);
    if let Err(err) = auth_state.email().send(&message).await {
        error!("Failed to send onboarding email: {err:#}");
        errors.form(format!("Could not send the verification email: {err}"));
        return render(&form, &errors, StatusCode::INTERNAL_SERVER_ERROR);
    }

    Redirect::to(&prepared.redirect_to).into_response()
}
