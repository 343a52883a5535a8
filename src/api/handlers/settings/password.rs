//! `/settings/profile/password`: change the password of the logged-in user.

use axum::{
    extract::{Extension, Form, rejection::FormRejection},
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::api::{
    error::PageError,
    forms::FormErrors,
    handlers::{
        auth::{
            AuthState, require_user_id,
            password::{hash_password, verify_password},
            storage,
            utils::validate_new_password,
        },
        html,
    },
    pages,
};

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

fn render(errors: &FormErrors, status: StatusCode) -> Response {
    let fields = [
        pages::input(
            "Current Password",
            "currentPassword",
            "password",
            "",
            errors.field_errors("currentPassword"),
        ),
        pages::input(
            "New Password",
            "password",
            "password",
            "",
            errors.field_errors("password"),
        ),
        pages::input(
            "Confirm New Password",
            "confirmPassword",
            "password",
            "",
            errors.field_errors("confirmPassword"),
        ),
        pages::submit("Change Password"),
    ]
    .concat();
    let body = format!(
        "<main><h1>Password</h1>{}<p><a href=\"/settings/profile\">Cancel</a></p></main>",
        pages::form(
            "password-change-form",
            "/settings/profile/password",
            &fields,
            errors.form_errors()
        )
    );
    html(status, "Password", &body)
}

#[utoipa::path(
    get,
    path = "/settings/profile/password",
    responses(
        (status = 200, description = "Change password form", content_type = "text/html", body = String),
        (status = 303, description = "Not logged in, redirect to /login")
    ),
    tag = "settings"
)]
pub async fn password_page(
    headers: HeaderMap,
    uri: Uri,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    if let Err(response) = require_user_id(&headers, &uri, &pool, &auth_state).await {
        return response;
    }
    render(&FormErrors::new(), StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/settings/profile/password",
    request_body(content = ChangePasswordForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Password changed"),
        (status = 400, description = "Current password wrong or new password rejected", content_type = "text/html", body = String)
    ),
    tag = "settings"
)]
#[instrument(skip_all)]
pub async fn change_password(
    headers: HeaderMap,
    uri: Uri,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<ChangePasswordForm>, FormRejection>,
) -> Response {
    let identity = match require_user_id(&headers, &uri, &pool, &auth_state).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };

    let mut errors = FormErrors::new();
    validate_new_password(&mut errors, &form.password, &form.confirm_password);
    if form.current_password.is_empty() {
        errors.field("currentPassword", "Current password is required");
    }
    if !errors.is_empty() {
        return render(&errors, StatusCode::BAD_REQUEST);
    }

    let stored = match storage::lookup_password_hash_by_user(&pool, identity.user_id).await {
        Ok(stored) => stored,
        Err(err) => return PageError::from(err).into_response(),
    };
    match verify_password(form.current_password, stored).await {
        Ok(true) => {}
        Ok(false) => {
            errors.field("currentPassword", "Incorrect password");
            return render(&errors, StatusCode::BAD_REQUEST);
        }
        Err(err) => return PageError::from(err).into_response(),
    }

    let hash = match hash_password(form.password).await {
        Ok(hash) => hash,
        Err(err) => return PageError::from(err).into_response(),
    };
    if let Err(err) = storage::update_password(&pool, identity.user_id, &hash).await {
        return PageError::from(err).into_response();
    }
    info!(user_id = %identity.user_id, "password changed");

    Redirect::to("/settings/profile").into_response()
}

#[utoipa::path(
    get,
    path = "/settings/profile/password/create",
    responses(
        (status = 501, description = "Not implemented yet", content_type = "text/html", body = String)
    ),
    tag = "settings"
)]
pub async fn create_password() -> PageError {
    PageError::NotImplemented
}
