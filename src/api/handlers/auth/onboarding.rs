//! `/onboarding`: create the account for a verified email address.

use axum::{
    extract::{Extension, Form, Query, rejection::FormRejection, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{
    identity::{require_anonymous, session_cookie},
    login::RedirectQuery,
    password::hash_password,
    state::AuthState,
    storage::{self, SignupOutcome},
    utils::{normalize_username, safe_redirect, validate_new_password, validate_username},
    verify_session::VerifySession,
};
use crate::api::{
    error::PageError,
    forms::{FormErrors, checked},
    handlers::{html, see_other},
    pages,
};

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
    agree_to_terms_and_privacy: Option<String>,
    remember: Option<String>,
    redirect_to: Option<String>,
}

fn render(email: &str, form: &OnboardingForm, errors: &FormErrors, status: StatusCode) -> Response {
    let fields = [
        pages::input(
            "Username",
            "username",
            "text",
            &form.username,
            errors.field_errors("username"),
        ),
        pages::input(
            "Password",
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
        pages::checkbox(
            "Do you agree to our Terms of Service and Privacy Policy?",
            "agreeToTermsAndPrivacy",
            checked(form.agree_to_terms_and_privacy.as_deref()),
            errors.field_errors("agreeToTermsAndPrivacy"),
        ),
        pages::checkbox(
            "Remember me",
            "remember",
            checked(form.remember.as_deref()),
            &[],
        ),
        pages::hidden("redirectTo", form.redirect_to.as_deref().unwrap_or_default()),
        pages::submit("Create an account"),
    ]
    .concat();
    let body = format!(
        "<main><h1>Welcome aboard {}!</h1><p>Please enter your details.</p>{}</main>",
        pages::escape(email),
        pages::form("onboarding-form", "/onboarding", &fields, errors.form_errors())
    );
    html(status, "Setup Grape Stack Account", &body)
}

async fn require_onboarding_email(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<String, Response> {
    require_anonymous(headers, pool, state).await?;
    VerifySession::onboarding_email(headers, state)
        .ok_or_else(|| Redirect::to("/signup").into_response())
}

#[utoipa::path(
    get,
    path = "/onboarding",
    params(RedirectQuery),
    responses(
        (status = 200, description = "Account details form", content_type = "text/html", body = String),
        (status = 303, description = "No onboarding verification, back to /signup")
    ),
    tag = "auth"
)]
pub async fn onboarding_page(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    query: Result<Query<RedirectQuery>, QueryRejection>,
) -> Response {
    let email = match require_onboarding_email(&headers, &pool, &auth_state).await {
        Ok(email) => email,
        Err(response) => return response,
    };
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let form = OnboardingForm {
        redirect_to: query.redirect_to,
        ..OnboardingForm::default()
    };
    render(&email, &form, &FormErrors::new(), StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/onboarding",
    request_body(content = OnboardingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Account created and logged in"),
        (status = 400, description = "Invalid details or username taken", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn onboarding(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<OnboardingForm>, FormRejection>,
) -> Response {
    let email = match require_onboarding_email(&headers, &pool, &auth_state).await {
        Ok(email) => email,
        Err(response) => return response,
    };
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };

    let mut errors = FormErrors::new();
    let username = normalize_username(&form.username);
    validate_username(&mut errors, "username", &username);
    validate_new_password(&mut errors, &form.password, &form.confirm_password);
    if !checked(form.agree_to_terms_and_privacy.as_deref()) {
        errors.field(
            "agreeToTermsAndPrivacy",
            "You must agree to the terms of service and privacy policy",
        );
    }
    if errors.field_errors("username").is_empty() {
        match storage::username_taken(&pool, &username).await {
            Ok(true) => errors.field("username", "A user already exists with this username"),
            Ok(false) => {}
            Err(err) => return PageError::from(err).into_response(),
        }
    }
    if !errors.is_empty() {
        return render(&email, &form, &errors, StatusCode::BAD_REQUEST);
    }

    let hash = match hash_password(form.password.clone()).await {
        Ok(hash) => hash,
        Err(err) => return PageError::from(err).into_response(),
    };
    let outcome = storage::insert_user_with_session(
        &pool,
        &email,
        &username,
        &hash,
        auth_state.config().session_ttl_seconds(),
    )
    .await;

    let session_id = match outcome {
        Ok(SignupOutcome::Created {
            user_id,
            session_id,
        }) => {
            info!(%user_id, "user onboarded");
            session_id
        }
        Ok(SignupOutcome::UsernameTaken) => {
            errors.field("username", "A user already exists with this username");
            return render(&email, &form, &errors, StatusCode::BAD_REQUEST);
        }
        Ok(SignupOutcome::EmailTaken) => {
            errors.form("Email is already taken");
            return render(&email, &form, &errors, StatusCode::BAD_REQUEST);
        }
        Err(err) => return PageError::from(err).into_response(),
    };

    let remember = checked(form.remember.as_deref());
    match (
        session_cookie(&auth_state, session_id, remember),
        VerifySession::clear_cookie(&auth_state),
    ) {
        (Ok(session), Ok(verification)) => see_other(
            &safe_redirect(form.redirect_to.as_deref()),
            [session, verification],
        ),
        (Err(err), _) | (_, Err(err)) => PageError::from(err).into_response(),
    }
}
