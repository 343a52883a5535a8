//! Fallback error page used when a handler cannot render its own form.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::pages;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Not found")]
    NotFound,
    #[error("Not implemented yet")]
    NotImplemented,
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl PageError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Request failed: {err:#}");
        }
        let status = self.status();
        let message = self.to_string();
        let body = format!(
            "<main><h1>{} {}</h1><p><a href=\"/\">Back home</a></p></main>",
            status.as_u16(),
            pages::escape(&message)
        );
        (status, pages::document(&message, &body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_codes() {
        assert_eq!(PageError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            PageError::NotImplemented.status(),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            PageError::BadRequest("Invalid intent").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PageError::from(anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = PageError::from(anyhow!("password for postgres is hunter2"));
        assert_eq!(err.to_string(), "Internal Server Error");
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
