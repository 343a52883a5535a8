//! `/verify`: check a one-time code and hand off to the flow that issued it.

use axum::{
    extract::{Extension, Form, Query, rejection::FormRejection, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use super::{
    state::AuthState,
    storage,
    utils::with_redirect_to,
    verification::{VerificationType, is_code_valid},
    verify_session::VerifySession,
};
use crate::api::{
    error::PageError,
    forms::FormErrors,
    handlers::{html, see_other},
    pages,
};

const INVALID_CODE: &str = "Invalid code";

/// Query string of the link sent by email; also the shape of the form.
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VerifyForm {
    /// `onboarding` or `reset-password`.
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub code: String,
    pub redirect_to: Option<String>,
}

fn render(form: &VerifyForm, errors: &FormErrors, status: StatusCode) -> Response {
    let heading = match form.kind.parse::<VerificationType>() {
        Ok(VerificationType::Onboarding) => "Check your email",
        Ok(VerificationType::ResetPassword) => "Check your email to reset your password",
        Err(_) => "Invalid verification type",
    };
    let fields = [
        pages::input("Code", "code", "text", &form.code, errors.field_errors("code")),
        pages::hidden("type", &form.kind),
        pages::hidden("target", &form.target),
        pages::hidden("redirectTo", form.redirect_to.as_deref().unwrap_or_default()),
        pages::submit("Submit"),
    ]
    .concat();
    let body = format!(
        "<main><h1>{}</h1><p>We've sent you a code to verify your email address.</p>{}</main>",
        pages::escape(heading),
        pages::form("verify-form", "/verify", &fields, errors.form_errors())
    );
    html(status, "Verify", &body)
}

#[utoipa::path(
    get,
    path = "/verify",
    params(VerifyForm),
    responses(
        (status = 200, description = "Code form prefilled from the query", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_page(query: Result<Query<VerifyForm>, QueryRejection>) -> Response {
    let form = query.map(|Query(query)| query).unwrap_or_default();
    render(&form, &FormErrors::new(), StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/verify",
    request_body(content = VerifyForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Code accepted, continue at /onboarding or /reset-password"),
        (status = 400, description = "Invalid code", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<VerifyForm>, FormRejection>,
) -> Response {
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };
    match validate_request(&pool, &auth_state, &form).await {
        Ok(response) => response,
        Err(err) => PageError::from(err).into_response(),
    }
}

/// Validate the submitted code, consume the challenge and dispatch on its type.
///
/// Wrong, expired and unknown codes all re-render the form with "Invalid code".
///
/// # Errors
/// Returns an error only when the database or cookie signing fails.
pub async fn validate_request(
    pool: &PgPool,
    state: &AuthState,
    form: &VerifyForm,
) -> anyhow::Result<Response> {
    let mut errors = FormErrors::new();
    let Ok(kind) = form.kind.parse::<VerificationType>() else {
        errors.form("Invalid verification type");
        return Ok(render(form, &errors, StatusCode::BAD_REQUEST));
    };
    let target = form.target.trim();
    let code = form.code.trim();
    if target.is_empty() || code.is_empty() {
        errors.field("code", INVALID_CODE);
        return Ok(render(form, &errors, StatusCode::BAD_REQUEST));
    }

    if !is_code_valid(pool, kind, target, code).await? {
        debug!(%kind, "verification code rejected");
        errors.field("code", INVALID_CODE);
        return Ok(render(form, &errors, StatusCode::BAD_REQUEST));
    }
    // A concurrent submission of the same code may have consumed it first.
    if !storage::delete_verification(pool, kind, target).await? {
        debug!(%kind, "verification code already consumed");
        errors.field("code", INVALID_CODE);
        return Ok(render(form, &errors, StatusCode::BAD_REQUEST));
    }

    let redirect_to = form.redirect_to.as_deref();
    let (session, location) = match kind {
        VerificationType::Onboarding => (
            VerifySession::Onboarding {
                email: target.to_string(),
            },
            with_redirect_to("/onboarding", redirect_to),
        ),
        VerificationType::ResetPassword => {
            let Some(user) = storage::find_user_by_login(pool, target).await? else {
                errors.field("code", INVALID_CODE);
                return Ok(render(form, &errors, StatusCode::BAD_REQUEST));
            };
            (
                VerifySession::ResetPassword {
                    username: user.username,
                },
                "/reset-password".to_string(),
            )
        }
    };

    let cookie = session.to_cookie(state)?;
    Ok(see_other(&location, [cookie]))
}
