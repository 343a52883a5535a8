//! Resolve the signed session cookie into a user, and the page guards built on it.

use anyhow::Result;
use axum::{
    http::{HeaderMap, HeaderValue, Uri, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    cookie::{clear_cookie, read_cookie, set_cookie},
    state::AuthState,
    storage,
    utils::login_redirect,
};
use crate::api::error::PageError;

pub const AUTH_COOKIE_NAME: &str = "gs-session";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    Authenticated(Identity),
    /// `stale_cookie` is set when a cookie was sent but no live session backs it.
    Anonymous { stale_cookie: bool },
}

/// Look up the session named by the auth cookie.
///
/// # Errors
/// Returns an error only if the database query fails.
pub async fn authenticate(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Authentication> {
    let Some(raw) = read_cookie(headers, AUTH_COOKIE_NAME) else {
        return Ok(Authentication::Anonymous {
            stale_cookie: false,
        });
    };
    let session_id = state
        .cookies()
        .unsign(&raw)
        .and_then(|value| Uuid::parse_str(&value).ok());
    let Some(session_id) = session_id else {
        return Ok(Authentication::Anonymous { stale_cookie: true });
    };

    Ok(match storage::lookup_session(pool, session_id).await? {
        Some(user_id) => Authentication::Authenticated(Identity {
            user_id,
            session_id,
        }),
        None => Authentication::Anonymous { stale_cookie: true },
    })
}

/// The logged-in identity, or a redirect to the login page that returns here.
///
/// # Errors
/// Returns the response to send instead of the page.
pub async fn require_user_id(
    headers: &HeaderMap,
    uri: &Uri,
    pool: &PgPool,
    state: &AuthState,
) -> Result<Identity, Response> {
    match authenticate(headers, pool, state).await {
        Ok(Authentication::Authenticated(identity)) => Ok(identity),
        Ok(Authentication::Anonymous { stale_cookie }) => {
            let redirect = Redirect::to(&login_redirect(uri));
            if stale_cookie {
                Err(with_cleared_session(redirect, state))
            } else {
                Err(redirect.into_response())
            }
        }
        Err(err) => Err(PageError::from(err).into_response()),
    }
}

/// Continue only for visitors without a live session; others go home.
///
/// # Errors
/// Returns the response to send instead of the page.
pub async fn require_anonymous(
    headers: &HeaderMap,
    pool: &PgPool,
    state: &AuthState,
) -> Result<(), Response> {
    match authenticate(headers, pool, state).await {
        Ok(Authentication::Anonymous { .. }) => Ok(()),
        Ok(Authentication::Authenticated(_)) => Err(Redirect::to("/").into_response()),
        Err(err) => Err(PageError::from(err).into_response()),
    }
}

/// `Set-Cookie` for a new session; `remember` persists it past the browser session.
///
/// # Errors
/// Returns an error if the value cannot be signed or encoded as a header.
pub fn session_cookie(state: &AuthState, session_id: Uuid, remember: bool) -> Result<HeaderValue> {
    let signed = state.cookies().sign(&session_id.to_string())?;
    let max_age = remember.then(|| state.config().session_ttl_seconds());
    Ok(set_cookie(
        AUTH_COOKIE_NAME,
        &signed,
        max_age,
        state.config().secure_cookies(),
    )?)
}

/// # Errors
/// Returns an error if the header cannot be encoded.
pub fn clear_session_cookie(state: &AuthState) -> Result<HeaderValue> {
    Ok(clear_cookie(
        AUTH_COOKIE_NAME,
        state.config().secure_cookies(),
    )?)
}

fn with_cleared_session(response: impl IntoResponse, state: &AuthState) -> Response {
    match clear_session_cookie(state) {
        Ok(cookie) => ([(SET_COOKIE, cookie)], response).into_response(),
        Err(_) => response.into_response(),
    }
}
