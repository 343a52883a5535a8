use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use crate::api::handlers::auth::storage::db_span;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Profile {
    pub(crate) name: String,
    pub(crate) bio: String,
    pub(crate) website: String,
}

/// Stored profile, or an empty one when the user never saved it.
pub(crate) async fn fetch_profile(pool: &PgPool, user_id: Uuid) -> Result<Profile> {
    let query = "SELECT name, bio, website FROM profiles WHERE user_id = $1";
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to fetch profile")?;

    Ok(row.map_or_else(Profile::default, |row| Profile {
        name: row.get("name"),
        bio: row.get("bio"),
        website: row.get("website"),
    }))
}

pub(crate) async fn upsert_profile(pool: &PgPool, user_id: Uuid, profile: &Profile) -> Result<()> {
    let query = r"
        INSERT INTO profiles (user_id, name, bio, website)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO UPDATE SET
            name = EXCLUDED.name,
            bio = EXCLUDED.bio,
            website = EXCLUDED.website,
            updated_at = NOW()
    ";
    sqlx::query(query)
        .bind(user_id)
        .bind(&profile.name)
        .bind(&profile.bio)
        .bind(&profile.website)
        .execute(pool)
        .instrument(db_span("UPSERT", query))
        .await
        .context("failed to upsert profile")?;
    Ok(())
}
