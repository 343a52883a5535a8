//! Account settings for the logged-in user.

pub(crate) mod password;
pub(crate) mod profile;
mod storage;
