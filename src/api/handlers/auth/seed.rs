//! Demo account for local development.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

use super::{password::hash_password, storage};

pub const DEMO_EMAIL: &str = "demouser@email.com";
pub const DEMO_USERNAME: &str = "demouser";
pub const DEMO_PASSWORD: &str = "demopassword";

/// Insert `demouser` / `demopassword` unless the account already exists.
///
/// Returns whether the user was created.
///
/// # Errors
/// Returns an error if hashing or the database fails.
pub async fn seed_demo_user(pool: &PgPool) -> Result<bool> {
    let hash = hash_password(DEMO_PASSWORD.to_string()).await?;
    let created = storage::insert_user_if_absent(pool, DEMO_EMAIL, DEMO_USERNAME, &hash).await?;
    if created {
        info!(username = DEMO_USERNAME, "seeded demo user");
    }
    Ok(created)
}
