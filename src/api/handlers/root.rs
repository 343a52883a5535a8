use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::{
    auth::{AuthState, require_user_id, storage},
    html,
};
use crate::api::{error::PageError, pages};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Home page", content_type = "text/html", body = String),
        (status = 303, description = "Not logged in, redirect to /login")
    ),
    tag = "auth"
)]
pub async fn root(
    headers: HeaderMap,
    uri: Uri,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    let identity = match require_user_id(&headers, &uri, &pool, &auth_state).await {
        Ok(identity) => identity,
        Err(response) => return response,
    };
    let user = match storage::find_user_by_id(&pool, identity.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return PageError::NotFound.into_response(),
        Err(err) => return PageError::from(err).into_response(),
    };

    let body = format!(
        "<main><h1>Hello, {}!</h1>\
<p><a href=\"/settings/profile\">Settings</a></p>\
<form method=\"post\" action=\"/logout\">{}</form></main>",
        pages::escape(&user.username),
        pages::submit("Logout")
    );
    html(StatusCode::OK, "Grape Stack", &body)
}

/// Any unrouted path.
pub async fn not_found() -> PageError {
    PageError::NotFound
}
