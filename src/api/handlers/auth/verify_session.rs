//! Short-lived signed cookie marking a requester who just proved control of an
//! email address or account.

use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{
    cookie::{clear_cookie, read_cookie, set_cookie},
    state::AuthState,
};

pub const VERIFY_COOKIE_NAME: &str = "gs-verification";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VerifySession {
    Onboarding { email: String },
    ResetPassword { username: String },
}

impl VerifySession {
    /// Decode the cookie; forged, malformed and missing values read as `None`.
    #[must_use]
    pub fn read(headers: &HeaderMap, state: &AuthState) -> Option<Self> {
        let raw = read_cookie(headers, VERIFY_COOKIE_NAME)?;
        let json = state.cookies().unsign(&raw)?;
        serde_json::from_str(&json).ok()
    }

    #[must_use]
    pub fn onboarding_email(headers: &HeaderMap, state: &AuthState) -> Option<String> {
        match Self::read(headers, state)? {
            Self::Onboarding { email } => Some(email),
            Self::ResetPassword { .. } => None,
        }
    }

    #[must_use]
    pub fn reset_username(headers: &HeaderMap, state: &AuthState) -> Option<String> {
        match Self::read(headers, state)? {
            Self::ResetPassword { username } => Some(username),
            Self::Onboarding { .. } => None,
        }
    }

    /// `Set-Cookie` value storing this session for the verification lifetime.
    ///
    /// # Errors
    /// Returns an error if the value cannot be signed or encoded as a header.
    pub fn to_cookie(&self, state: &AuthState) -> anyhow::Result<HeaderValue> {
        let json = serde_json::to_string(self)?;
        let signed = state.cookies().sign(&json)?;
        Ok(set_cookie(
            VERIFY_COOKIE_NAME,
            &signed,
            Some(state.config().verification_ttl_seconds()),
            state.config().secure_cookies(),
        )?)
    }

    /// # Errors
    /// Returns an error if the header cannot be encoded.
    pub fn clear_cookie(state: &AuthState) -> anyhow::Result<HeaderValue> {
        Ok(clear_cookie(
            VERIFY_COOKIE_NAME,
            state.config().secure_cookies(),
        )?)
    }
}
