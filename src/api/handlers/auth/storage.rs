//! Database helpers for users, sessions and verification challenges.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::{Instrument, Span, info_span};
use uuid::Uuid;

use super::utils::unique_violation_constraint;
use super::verification::VerificationType;
use crate::otp::{OtpAlgorithm, OtpParams};

/// Outcome when creating a user from a completed onboarding form.
#[derive(Debug)]
pub(crate) enum SignupOutcome {
    Created { user_id: Uuid, session_id: Uuid },
    UsernameTaken,
    EmailTaken,
}

#[derive(Debug, Clone)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) username: String,
}

pub(crate) fn db_span(operation: &'static str, statement: &'static str) -> Span {
    info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Password hash for a login identifier (username or email).
pub(crate) async fn lookup_password_hash(
    pool: &PgPool,
    login: &str,
) -> Result<Option<(Uuid, String)>> {
    let query = r"
        SELECT users.id, passwords.hash
        FROM users
        JOIN passwords ON passwords.user_id = users.id
        WHERE users.username = $1 OR users.email = $1
    ";
    let row = sqlx::query(query)
        .bind(login)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup password hash")?;

    Ok(row.map(|row| (row.get("id"), row.get("hash"))))
}

pub(crate) async fn lookup_password_hash_by_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<String>> {
    let query = "SELECT hash FROM passwords WHERE user_id = $1";
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup password hash")?;

    Ok(row.map(|row| row.get("hash")))
}

pub(crate) async fn find_user_by_login(pool: &PgPool, login: &str) -> Result<Option<UserRecord>> {
    let query = "SELECT id, email, username FROM users WHERE username = $1 OR email = $1";
    let row = sqlx::query(query)
        .bind(login)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup user")?;

    Ok(row.map(|row| UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
    }))
}

pub(crate) async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = "SELECT id, email, username FROM users WHERE id = $1";
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup user")?;

    Ok(row.map(|row| UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
    }))
}

pub(crate) async fn email_taken(pool: &PgPool, email: &str) -> Result<bool> {
    let query = "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1) AS taken";
    let row = sqlx::query(query)
        .bind(email)
        .fetch_one(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to check email")?;

    Ok(row.get("taken"))
}

pub(crate) async fn username_taken(pool: &PgPool, username: &str) -> Result<bool> {
    let query = "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1) AS taken";
    let row = sqlx::query(query)
        .bind(username)
        .fetch_one(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to check username")?;

    Ok(row.get("taken"))
}

/// Create the user, its password and a first session in one transaction.
pub(crate) async fn insert_user_with_session(
    pool: &PgPool,
    email: &str,
    username: &str,
    password_hash: &str,
    session_ttl_seconds: i64,
) -> Result<SignupOutcome> {
    let mut tx = pool.begin().await.context("begin signup transaction")?;

    let query = "INSERT INTO users (email, username) VALUES ($1, $2) RETURNING id";
    let row = sqlx::query(query)
        .bind(email)
        .bind(username)
        .fetch_one(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await;

    let user_id: Uuid = match row {
        Ok(row) => row.get("id"),
        Err(err) => {
            if let Some(constraint) = unique_violation_constraint(&err) {
                let _ = tx.rollback().await;
                return Ok(if constraint.contains("email") {
                    SignupOutcome::EmailTaken
                } else {
                    SignupOutcome::UsernameTaken
                });
            }
            return Err(err).context("failed to insert user");
        }
    };

    let query = "INSERT INTO passwords (user_id, hash) VALUES ($1, $2)";
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert password")?;

    let session_id = insert_session_in(&mut tx, user_id, session_ttl_seconds).await?;

    tx.commit().await.context("commit signup transaction")?;

    Ok(SignupOutcome::Created {
        user_id,
        session_id,
    })
}

/// Create a user with a password unless the username or email already exists.
pub(crate) async fn insert_user_if_absent(
    pool: &PgPool,
    email: &str,
    username: &str,
    password_hash: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin seed transaction")?;

    let query = r"
        INSERT INTO users (email, username) VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        RETURNING id
    ";
    let row = sqlx::query(query)
        .bind(email)
        .bind(username)
        .fetch_optional(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert user")?;
    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(false);
    };
    let user_id: Uuid = row.get("id");

    let query = "INSERT INTO passwords (user_id, hash) VALUES ($1, $2)";
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert password")?;

    tx.commit().await.context("commit seed transaction")?;
    Ok(true)
}

async fn insert_session_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    ttl_seconds: i64,
) -> Result<Uuid> {
    let query = r"
        INSERT INTO sessions (user_id, expiration_date)
        VALUES ($1, NOW() + ($2 * INTERVAL '1 second'))
        RETURNING id
    ";
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(ttl_seconds)
        .fetch_one(&mut **tx)
        .instrument(db_span("INSERT", query))
        .await
        .context("failed to insert session")?;

    Ok(row.get("id"))
}

pub(crate) async fn insert_session(pool: &PgPool, user_id: Uuid, ttl_seconds: i64) -> Result<Uuid> {
    let mut tx = pool.begin().await.context("begin session transaction")?;
    let session_id = insert_session_in(&mut tx, user_id, ttl_seconds).await?;
    tx.commit().await.context("commit session transaction")?;
    Ok(session_id)
}

/// Owner of an unexpired session.
pub(crate) async fn lookup_session(pool: &PgPool, session_id: Uuid) -> Result<Option<Uuid>> {
    let query = "SELECT user_id FROM sessions WHERE id = $1 AND expiration_date > NOW()";
    let row = sqlx::query(query)
        .bind(session_id)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup session")?;

    Ok(row.map(|row| row.get("user_id")))
}

pub(crate) async fn delete_session(pool: &PgPool, session_id: Uuid) -> Result<()> {
    let query = "DELETE FROM sessions WHERE id = $1";
    sqlx::query(query)
        .bind(session_id)
        .execute(pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete session")?;
    Ok(())
}

pub(crate) async fn delete_other_sessions(
    pool: &PgPool,
    user_id: Uuid,
    keep_session_id: Uuid,
) -> Result<u64> {
    let query = "DELETE FROM sessions WHERE user_id = $1 AND id <> $2";
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(keep_session_id)
        .execute(pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete other sessions")?;
    Ok(result.rows_affected())
}

pub(crate) async fn count_other_sessions(
    pool: &PgPool,
    user_id: Uuid,
    current_session_id: Uuid,
) -> Result<i64> {
    let query = r"
        SELECT COUNT(*) AS sessions
        FROM sessions
        WHERE user_id = $1 AND id <> $2 AND expiration_date > NOW()
    ";
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(current_session_id)
        .fetch_one(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to count sessions")?;
    Ok(row.get("sessions"))
}

pub(crate) async fn update_password(pool: &PgPool, user_id: Uuid, password_hash: &str) -> Result<()> {
    let query = r"
        INSERT INTO passwords (user_id, hash) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET hash = EXCLUDED.hash
    ";
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(db_span("UPSERT", query))
        .await
        .context("failed to update password")?;
    Ok(())
}

/// Replace the password of `username` and revoke every session it has.
///
/// Returns `false` when the user no longer exists.
pub(crate) async fn reset_password(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
) -> Result<bool> {
    let mut tx = pool.begin().await.context("begin reset transaction")?;

    let query = "SELECT id FROM users WHERE username = $1 FOR UPDATE";
    let row = sqlx::query(query)
        .bind(username)
        .fetch_optional(&mut *tx)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup user for reset")?;
    let Some(row) = row else {
        let _ = tx.rollback().await;
        return Ok(false);
    };
    let user_id: Uuid = row.get("id");

    let query = r"
        INSERT INTO passwords (user_id, hash) VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET hash = EXCLUDED.hash
    ";
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .instrument(db_span("UPSERT", query))
        .await
        .context("failed to reset password")?;

    let query = "DELETE FROM sessions WHERE user_id = $1";
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to revoke sessions")?;

    tx.commit().await.context("commit reset transaction")?;
    Ok(true)
}

/// Store a challenge, replacing any previous one for the same pair.
pub(crate) async fn upsert_verification(
    pool: &PgPool,
    kind: VerificationType,
    target: &str,
    params: &OtpParams,
    ttl_seconds: i64,
) -> Result<()> {
    let query = r"
        INSERT INTO verifications
            (type, target, secret, algorithm, digits, period, char_set, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW() + ($8 * INTERVAL '1 second'))
        ON CONFLICT (target, type) DO UPDATE SET
            secret = EXCLUDED.secret,
            algorithm = EXCLUDED.algorithm,
            digits = EXCLUDED.digits,
            period = EXCLUDED.period,
            char_set = EXCLUDED.char_set,
            expires_at = EXCLUDED.expires_at,
            created_at = NOW()
    ";
    let digits = i32::try_from(params.digits()).context("OTP digits out of range")?;
    let period = i32::try_from(params.period()).context("OTP period out of range")?;
    sqlx::query(query)
        .bind(kind.as_str())
        .bind(target)
        .bind(params.secret())
        .bind(params.algorithm().as_db_value())
        .bind(digits)
        .bind(period)
        .bind(params.char_set())
        .bind(ttl_seconds)
        .execute(pool)
        .instrument(db_span("UPSERT", query))
        .await
        .context("failed to upsert verification")?;
    Ok(())
}

/// Live challenge parameters for the pair; expired rows are invisible.
pub(crate) async fn lookup_verification(
    pool: &PgPool,
    kind: VerificationType,
    target: &str,
) -> Result<Option<OtpParams>> {
    let query = r"
        SELECT secret, algorithm, digits, period, char_set
        FROM verifications
        WHERE type = $1 AND target = $2
          AND (expires_at IS NULL OR expires_at > NOW())
    ";
    let row = sqlx::query(query)
        .bind(kind.as_str())
        .bind(target)
        .fetch_optional(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to lookup verification")?;

    let Some(row) = row else {
        return Ok(None);
    };
    let algorithm: String = row.get("algorithm");
    let digits: i32 = row.get("digits");
    let period: i32 = row.get("period");
    let params = OtpParams::new(
        row.get("secret"),
        algorithm.parse::<OtpAlgorithm>()?,
        row.get("char_set"),
        u32::try_from(digits).context("stored OTP digits are negative")?,
        u64::try_from(period).context("stored OTP period is negative")?,
    )?;
    Ok(Some(params))
}

pub(crate) async fn delete_verification(
    pool: &PgPool,
    kind: VerificationType,
    target: &str,
) -> Result<bool> {
    let query = "DELETE FROM verifications WHERE type = $1 AND target = $2";
    let result = sqlx::query(query)
        .bind(kind.as_str())
        .bind(target)
        .execute(pool)
        .instrument(db_span("DELETE", query))
        .await
        .context("failed to delete verification")?;
    Ok(result.rows_affected() > 0)
}
