//! `/reset-password`: choose a new password after a reset code was accepted.

use axum::{
    extract::{Extension, Form, rejection::FormRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use super::{
    identity::require_anonymous,
    password::hash_password,
    state::AuthState,
    storage,
    utils::validate_new_password,
    verify_session::VerifySession,
};
use crate::api::{
    error::PageError,
    forms::FormErrors,
    handlers::{html, see_other},
    pages,
};

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordForm {
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

fn render(username: &str, errors: &FormErrors, status: StatusCode) -> Response {
    let fields = [
        pages::input(
            "New Password",
            "password",
            "password",
            "",
            errors.field_errors("password"),
        ),
        pages::input(
            "Confirm Password",
            "confirmPassword",
            "password",
            "",
            errors.field_errors("confirmPassword"),
        ),
        pages::submit("Reset password"),
    ]
    .concat();
    let body = format!(
        "<main><h1>Password Reset</h1><p>Hi, {}. No worries. It happens all the time.</p>{}</main>",
        pages::escape(username),
        pages::form(
            "reset-password-form",
            "/reset-password",
            &fields,
            errors.form_errors()
        )
    );
    html(status, "Reset Password", &body)
}

async fn require_reset_username(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<String, Response> {
    require_anonymous(headers, pool, state).await?;
    VerifySession::reset_username(headers, state)
        .ok_or_else(|| Redirect::to("/login").into_response())
}

#[utoipa::path(
    get,
    path = "/reset-password",
    responses(
        (status = 200, description = "New password form", content_type = "text/html", body = String),
        (status = 303, description = "No reset verification, back to /login")
    ),
    tag = "auth"
)]
pub async fn reset_password_page(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    match require_reset_username(&headers, &pool, &auth_state).await {
        Ok(username) => render(&username, &FormErrors::new(), StatusCode::OK),
        Err(response) => response,
    }
}

#[utoipa::path(
    post,
    path = "/reset-password",
    request_body(content = ResetPasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Password replaced, continue at /login"),
        (status = 400, description = "Password rejected", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn reset_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<ResetPasswordForm>, FormRejection>,
) -> Response {
    let username = match require_reset_username(&headers, &pool, &auth_state).await {
        Ok(username) => username,
        Err(response) => return response,
    };
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };

    let mut errors = FormErrors::new();
    validate_new_password(&mut errors, &form.password, &form.confirm_password);
    if !errors.is_empty() {
        return render(&username, &errors, StatusCode::BAD_REQUEST);
    }

    let hash = match hash_password(form.password).await {
        Ok(hash) => hash,
        Err(err) => return PageError::from(err).into_response(),
    };
    match storage::reset_password(&pool, &username, &hash).await {
        Ok(true) => info!("password reset"),
        Ok(false) => warn!("password reset for a user that no longer exists"),
        Err(err) => return PageError::from(err).into_response(),
    }

    match VerifySession::clear_cookie(&auth_state) {
        Ok(cookie) => see_other("/login", [cookie]),
        Err(err) => PageError::from(err).into_response(),
    }
}
