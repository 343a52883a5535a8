//! `/forgot-password`: email a reset code to an existing account.
//!
//! Unknown usernames and emails get the same redirect as known ones.

use axum::{
    extract::{Extension, Form, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

use super::{
    identity::require_anonymous,
    state::AuthState,
    storage,
    utils::normalize_username,
    verification::{VerificationType, prepare_verification, verify_path},
};
use crate::api::{
    email::password_reset_email,
    error::PageError,
    forms::FormErrors,
    handlers::html,
    pages,
};

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordForm {
    #[serde(default)]
    username_or_email: String,
}

fn render(form: &ForgotPasswordForm, errors: &FormErrors, status: StatusCode) -> Response {
    let fields = [
        pages::input(
            "Username or Email",
            "usernameOrEmail",
            "text",
            &form.username_or_email,
            errors.field_errors("usernameOrEmail"),
        ),
        pages::submit("Recover password"),
    ]
    .concat();
    let body = format!(
        "<main><h1>Forgot Password</h1>\
<p>No worries, we'll send you reset instructions.</p>{}\
<p><a href=\"/login\">Back to Login</a></p></main>",
        pages::form(
            "forgot-password-form",
            "/forgot-password",
            &fields,
            errors.form_errors()
        )
    );
    html(status, "Password Recovery", &body)
}

#[utoipa::path(
    get,
    path = "/forgot-password",
    responses(
        (status = 200, description = "Password recovery form", content_type = "text/html", body = String),
        (status = 303, description = "Already logged in")
    ),
    tag = "auth"
)]
pub async fn forgot_password_page(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    if let Err(response) = require_anonymous(&headers, &pool, &auth_state).await {
        return response;
    }
    render(
        &ForgotPasswordForm::default(),
        &FormErrors::new(),
        StatusCode::OK,
    )
}

#[utoipa::path(
    post,
    path = "/forgot-password",
    request_body(content = ForgotPasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Continue at /verify"),
        (status = 400, description = "Missing username or email", content_type = "text/html", body = String),
        (status = 500, description = "Email could not be sent", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn forgot_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<ForgotPasswordForm>, FormRejection>,
) -> Response {
    if let Err(response) = require_anonymous(&headers, &pool, &auth_state).await {
        return response;
    }
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };

    let target = normalize_username(&form.username_or_email);
    if target.is_empty() {
        let mut errors = FormErrors::new();
        errors.field("usernameOrEmail", "Username or email is required");
        return render(&form, &errors, StatusCode::BAD_REQUEST);
    }

    let user = match storage::find_user_by_login(&pool, &target).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("password reset requested for unknown account");
            return Redirect::to(&verify_path(VerificationType::ResetPassword, &target, None))
                .into_response();
        }
        Err(err) => return PageError::from(err).into_response(),
    };

    let prepared = match prepare_verification(
        &pool,
        auth_state.config(),
        VerificationType::ResetPassword,
        &target,
        None,
    )
    .await
    {
        Ok(prepared) => prepared,
        Err(err) => return PageError::from(err).into_response(),
    };

    debug!(user_id = %user.id, "password reset code issued");
    let message = password_reset_email(&user.email, &prepared.verify_url, &prepared.otp);
    if let Err(err) = auth_state.email().send(&message).await {
        error!("Failed to send password reset email: {err:#}");
        let mut errors = FormErrors::new();
        errors.form(format!("Could not send the reset email: {err}"));
        return render(&form, &errors, StatusCode::INTERNAL_SERVER_ERROR);
    }

    Redirect::to(&prepared.redirect_to).into_response()
}
