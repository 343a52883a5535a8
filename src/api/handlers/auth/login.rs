//! `/login`: exchange a username (or email) and password for a session.

use axum::{
    extract::{Extension, Form, Query, rejection::FormRejection, rejection::QueryRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::{IntoParams, ToSchema};

use super::{
    identity::{require_anonymous, session_cookie},
    password::verify_password,
    state::AuthState,
    storage,
    utils::{normalize_username, safe_redirect, validate_password},
};
use crate::api::{
    error::PageError,
    forms::{FormErrors, checked},
    handlers::{html, see_other},
    pages,
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RedirectQuery {
    /// Same-site path to continue to afterwards.
    pub redirect_to: Option<String>,
}

#[derive(Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    remember: Option<String>,
    redirect_to: Option<String>,
}

fn render(form: &LoginForm, errors: &FormErrors, status: StatusCode) -> Response {
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
        pages::checkbox(
            "Remember me",
            "remember",
            checked(form.remember.as_deref()),
            &[],
        ),
        pages::hidden("redirectTo", form.redirect_to.as_deref().unwrap_or_default()),
        pages::submit("Log in"),
    ]
    .concat();
    let body = format!(
        "<main><h1>Welcome back!</h1>{}\
<p><a href=\"/forgot-password\">Forgot password?</a></p>\
<p>New here? <a href=\"/signup\">Create an account</a></p></main>",
        pages::form("login-form", "/login", &fields, errors.form_errors())
    );
    html(status, "Login", &body)
}

#[utoipa::path(
    get,
    path = "/login",
    params(RedirectQuery),
    responses(
        (status = 200, description = "Login form", content_type = "text/html", body = String),
        (status = 303, description = "Already logged in")
    ),
    tag = "auth"
)]
pub async fn login_page(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    query: Result<Query<RedirectQuery>, QueryRejection>,
) -> Response {
    if let Err(response) = require_anonymous(&headers, &pool, &auth_state).await {
        return response;
    }
    let query = query.map(|Query(query)| query).unwrap_or_default();
    let form = LoginForm {
        redirect_to: query.redirect_to,
        ..LoginForm::default()
    };
    render(&form, &FormErrors::new(), StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged in, session cookie set"),
        (status = 400, description = "Invalid credentials", content_type = "text/html", body = String)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Response {
    if let Err(response) = require_anonymous(&headers, &pool, &auth_state).await {
        return response;
    }
    let Ok(Form(form)) = form else {
        return PageError::BadRequest("Invalid form submission").into_response();
    };

    let mut errors = FormErrors::new();
    let login = normalize_username(&form.username);
    if login.is_empty() {
        errors.field("username", "Username is required");
    }
    validate_password(&mut errors, "password", &form.password);
    if !errors.is_empty() {
        return render(&form, &errors, StatusCode::BAD_REQUEST);
    }

    let user_id = match authenticate_password(&pool, &login, &form.password).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => {
            debug!("login rejected");
            errors.form(INVALID_CREDENTIALS);
            return render(&form, &errors, StatusCode::BAD_REQUEST);
        }
        Err(err) => return PageError::from(err).into_response(),
    };

    let ttl = auth_state.config().session_ttl_seconds();
    let cookie = storage::insert_session(&pool, user_id, ttl)
        .await
        .and_then(|session_id| {
            session_cookie(&auth_state, session_id, checked(form.remember.as_deref()))
        });
    match cookie {
        Ok(cookie) => see_other(&safe_redirect(form.redirect_to.as_deref()), [cookie]),
        Err(err) => PageError::from(err).into_response(),
    }
}

/// User id when `password` matches; unknown logins cost one argon2 verification too.
async fn authenticate_password(
    pool: &PgPool,
    login: &str,
    password: &str,
) -> anyhow::Result<Option<uuid::Uuid>> {
    let record = storage::lookup_password_hash(pool, login).await?;
    let (user_id, hash) = match record {
        Some((user_id, hash)) => (Some(user_id), Some(hash)),
        None => (None, None),
    };
    let valid = verify_password(password.to_string(), hash).await?;
    Ok(user_id.filter(|_| valid))
}
