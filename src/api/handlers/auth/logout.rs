//! `/logout`: delete the current session row and forget the cookie.

use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use super::{
    identity::{Authentication, authenticate, clear_session_cookie},
    state::AuthState,
    storage,
};
use crate::api::{error::PageError, handlers::see_other};

#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 303, description = "Logging out requires a POST; back to /")),
    tag = "auth"
)]
pub async fn logout_page() -> Redirect {
    Redirect::to("/")
}

#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 303, description = "Session deleted and cookie cleared")),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Response {
    match authenticate(&headers, &pool, &auth_state).await {
        Ok(Authentication::Authenticated(identity)) => {
            if let Err(err) = storage::delete_session(&pool, identity.session_id).await {
                return PageError::from(err).into_response();
            }
        }
        Ok(Authentication::Anonymous { .. }) => {}
        Err(err) => return PageError::from(err).into_response(),
    }
    match clear_session_cookie(&auth_state) {
        Ok(cookie) => see_other("/", [cookie]),
        Err(err) => PageError::from(err).into_response(),
    }
}
