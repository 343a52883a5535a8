//! Signed cookie values and `Set-Cookie` header construction.
//!
//! A signed value is `base64url(value) "." base64url(hmac_sha256(secret, value))`.
//! The first secret signs; every configured secret is tried when verifying so
//! a new secret can be rolled out without logging everyone out.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CookieError {
    #[error("at least one cookie signing secret is required")]
    NoSecrets,
    #[error("invalid cookie signing key")]
    InvalidKey,
}

#[derive(Debug)]
pub struct CookieSigner {
    secrets: Vec<SecretString>,
}

impl CookieSigner {
    /// # Errors
    /// Returns an error if `secrets` is empty.
    pub fn new(secrets: Vec<SecretString>) -> Result<Self, CookieError> {
        if secrets.is_empty() {
            return Err(CookieError::NoSecrets);
        }
        Ok(Self { secrets })
    }

    /// Sign `value` with the newest secret.
    ///
    /// # Errors
    /// Returns an error if the MAC cannot be keyed.
    pub fn sign(&self, value: &str) -> Result<String, CookieError> {
        let secret = self.secrets.first().ok_or(CookieError::NoSecrets)?;
        let tag = mac(secret, value.as_bytes())?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(value.as_bytes()),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Recover the value if any configured secret produced the signature.
    #[must_use]
    pub fn unsign(&self, signed: &str) -> Option<String> {
        let (payload, signature) = signed.split_once('.')?;
        let value = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let valid = self.secrets.iter().any(|secret| {
            HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
                .map(|mut mac| {
                    mac.update(&value);
                    mac.verify_slice(&signature).is_ok()
                })
                .unwrap_or(false)
        });
        if !valid {
            return None;
        }
        String::from_utf8(value).ok()
    }
}

fn mac(secret: &SecretString, value: &[u8]) -> Result<Vec<u8>, CookieError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| CookieError::InvalidKey)?;
    mac.update(value);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// `Set-Cookie` value; `max_age` of `None` makes a browser-session cookie.
pub(crate) fn set_cookie(
    name: &str,
    value: &str,
    max_age: Option<i64>,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(crate) fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    set_cookie(name, "", Some(0), secure)
}

/// Raw value of cookie `name` from the request, if present and non-empty.
pub(crate) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(secrets: &[&str]) -> Result<CookieSigner, CookieError> {
        CookieSigner::new(
            secrets
                .iter()
                .map(|s| SecretString::from((*s).to_string()))
                .collect(),
        )
    }

    #[test]
    fn signed_values_round_trip() -> Result<(), CookieError> {
        let signer = signer(&["current"])?;
        let signed = signer.sign("session-id")?;
        assert_eq!(signer.unsign(&signed).as_deref(), Some("session-id"));
        Ok(())
    }

    #[test]
    fn tampered_values_are_rejected() -> Result<(), CookieError> {
        let signer = signer(&["current"])?;
        let signed = signer.sign("session-id")?;
        let (_, signature) = signed.split_once('.').unwrap_or_default();
        let forged = format!("{}.{signature}", URL_SAFE_NO_PAD.encode("other-id"));
        assert_eq!(signer.unsign(&forged), None);
        assert_eq!(signer.unsign("no-dot"), None);
        assert_eq!(signer.unsign("!!.??"), None);
        Ok(())
    }

    #[test]
    fn rotated_secrets_still_verify() -> Result<(), CookieError> {
        let old = signer(&["old"])?;
        let signed_with_old = old.sign("value")?;

        let rotated = signer(&["new", "old"])?;
        assert_eq!(rotated.unsign(&signed_with_old).as_deref(), Some("value"));

        let retired = signer(&["new"])?;
        assert_eq!(retired.unsign(&signed_with_old), None);
        Ok(())
    }

    #[test]
    fn empty_secret_list_is_rejected() {
        assert_eq!(
            CookieSigner::new(Vec::new()).err(),
            Some(CookieError::NoSecrets)
        );
    }

    #[test]
    fn set_cookie_attributes() -> Result<(), InvalidHeaderValue> {
        let persistent = set_cookie("gs-session", "abc", Some(60), true)?;
        assert_eq!(
            persistent.to_str().unwrap_or_default(),
            "gs-session=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60; Secure"
        );

        let browser = set_cookie("gs-session", "abc", None, false)?;
        assert_eq!(
            browser.to_str().unwrap_or_default(),
            "gs-session=abc; Path=/; HttpOnly; SameSite=Lax"
        );

        let cleared = clear_cookie("gs-session", false)?;
        assert!(cleared.to_str().unwrap_or_default().contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn read_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; gs-session=abc.def ; empty="),
        );
        assert_eq!(read_cookie(&headers, "gs-session").as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, "empty"), None);
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
