//! Route handlers and the response helpers they share.

pub mod auth;
pub mod health;
pub mod root;
pub mod settings;

use axum::{
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};

use super::pages;

/// Full HTML page with `status`.
pub(crate) fn html(status: StatusCode, title: &str, body: &str) -> Response {
    (status, pages::document(title, body)).into_response()
}

/// `303 See Other` to `location`, appending one `Set-Cookie` per value.
pub(crate) fn see_other(
    location: &str,
    cookies: impl IntoIterator<Item = HeaderValue>,
) -> Response {
    let mut response = Redirect::to(location).into_response();
    for cookie in cookies {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}
