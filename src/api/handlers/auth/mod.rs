//! Auth pages and supporting modules.
//!
//! Sessions are rows in `sessions`; the `gs-session` cookie carries only the
//! signed row id and is re-checked against the database on every request.
//!
//! ## Verification flow
//!
//! `/signup` and `/forgot-password` issue a one-time code for a
//! `(target, type)` pair and email it. `/verify` accepts the code, deletes the
//! challenge and sets the signed `gs-verification` cookie, which is what
//! unlocks `/onboarding` (email) or `/reset-password` (username). The cookie
//! lives as long as a code does.

mod cookie;
pub(crate) mod forgot_password;
pub(crate) mod identity;
pub(crate) mod login;
pub(crate) mod logout;
pub(crate) mod onboarding;
pub(crate) mod password;
pub(crate) mod reset_password;
mod seed;
pub(crate) mod signup;
mod state;
pub(crate) mod storage;
pub(crate) mod utils;
pub(crate) mod verification;
pub(crate) mod verify;
pub(crate) mod verify_session;

pub use cookie::{CookieError, CookieSigner};
pub use identity::{
    AUTH_COOKIE_NAME, Authentication, Identity, authenticate, require_anonymous, require_user_id,
};
pub use seed::{DEMO_EMAIL, DEMO_PASSWORD, DEMO_USERNAME, seed_demo_user};
pub use state::{AuthConfig, AuthState};
pub use verification::{
    PreparedVerification, VerificationType, is_code_valid, prepare_verification,
};
pub use verify::validate_request;
pub use verify_session::{VERIFY_COOKIE_NAME, VerifySession};

#[cfg(test)]
mod tests;
