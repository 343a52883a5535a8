//! One-time code challenges bound to a `(type, target)` pair.
//!
//! A challenge is issued by [`prepare_verification`], delivered by email and
//! consumed by the `/verify` handler after [`is_code_valid`] accepts it.

use std::{fmt, str::FromStr};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, warn};
use url::form_urlencoded;
use utoipa::ToSchema;

use super::{state::AuthConfig, storage};
use crate::otp::OtpParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationType {
    Onboarding,
    ResetPassword,
}

impl VerificationType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::ResetPassword => "reset-password",
        }
    }
}

impl fmt::Display for VerificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown verification type: {0}")]
pub struct UnknownVerificationType(String);

impl FromStr for VerificationType {
    type Err = UnknownVerificationType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "onboarding" => Ok(Self::Onboarding),
            "reset-password" => Ok(Self::ResetPassword),
            other => Err(UnknownVerificationType(other.to_string())),
        }
    }
}

/// A freshly issued challenge.
#[derive(Debug, Clone)]
pub struct PreparedVerification {
    /// The code to send to the user.
    pub otp: String,
    /// Same-site `/verify` location the requester is sent to.
    pub redirect_to: String,
    /// Absolute link carrying the code, for the email body.
    pub verify_url: String,
}

fn verify_query(
    kind: VerificationType,
    target: &str,
    code: Option<&str>,
    redirect_to: Option<&str>,
) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("type", kind.as_str());
    query.append_pair("target", target);
    if let Some(code) = code {
        query.append_pair("code", code);
    }
    if let Some(redirect_to) = redirect_to.map(str::trim).filter(|value| !value.is_empty()) {
        query.append_pair("redirectTo", redirect_to);
    }
    query.finish()
}

/// `/verify` location for a challenge, without the code.
pub(crate) fn verify_path(kind: VerificationType, target: &str, redirect_to: Option<&str>) -> String {
    format!("/verify?{}", verify_query(kind, target, None, redirect_to))
}

/// Issue a new code for `(kind, target)`, replacing any previous one.
///
/// # Errors
/// Returns an error if the secret cannot be generated or stored.
pub async fn prepare_verification(
    pool: &PgPool,
    config: &AuthConfig,
    kind: VerificationType,
    target: &str,
    redirect_to: Option<&str>,
) -> Result<PreparedVerification> {
    let ttl = config.verification_ttl_seconds();
    let period = u64::try_from(ttl).context("verification TTL must be positive")?;
    let params = OtpParams::generate(period)?;
    let otp = params.current_code()?;

    storage::upsert_verification(pool, kind, target, &params, ttl).await?;
    debug!(%kind, "verification issued");

    let link_query = verify_query(kind, target, Some(&otp), redirect_to);

    Ok(PreparedVerification {
        redirect_to: verify_path(kind, target, redirect_to),
        verify_url: format!("{}/verify?{link_query}", config.base_url()),
        otp,
    })
}

/// Whether `code` matches the live challenge for `(kind, target)`.
///
/// Expired and missing challenges are both reported as `false`.
///
/// # Errors
/// Returns an error only when the database cannot be reached.
pub async fn is_code_valid(
    pool: &PgPool,
    kind: VerificationType,
    target: &str,
    code: &str,
) -> Result<bool> {
    let Some(params) = storage::lookup_verification(pool, kind, target).await? else {
        return Ok(false);
    };
    match params.verify(code) {
        Ok(valid) => Ok(valid),
        Err(err) => {
            warn!(%kind, "stored verification is unusable: {err}");
            Ok(false)
        }
    }
}
