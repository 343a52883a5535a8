//! # Grape Stack
//!
//! `grapestack` is a starter web application: username/password login backed
//! by database sessions, email verification through one-time codes, password
//! reset, and profile settings, all served as plain HTML forms.
//!
//! ## Sessions
//!
//! Logging in creates a row in `sessions`; the browser only holds the row id in
//! the `gs-session` cookie, signed with HMAC-SHA256. Every request re-checks
//! that the row exists and has not expired, so deleting the row is a logout.
//! Signing secrets rotate: the first configured secret signs, all of them verify.
//!
//! ## Verification
//!
//! Signup and forgot-password issue a one-time code bound to a
//! `(target, type)` pair. Issuing again replaces the previous code. A correct
//! code deletes the challenge and moves the browser into a short lived verify
//! session (`gs-verification` cookie) that unlocks `/onboarding` or
//! `/reset-password`. Wrong and expired codes produce the same error.

pub mod api;
pub mod cli;
pub mod otp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
