use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::RefreshToken;

const TOKEN_COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked_at, replaced_by, created_at, created_by_ip";

pub async fn insert(
    db: impl PgExecutor<'_>,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
    created_by_ip: Option<&str>,
) -> Result<RefreshToken, DatabaseError> {
    let sql = format!(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_by_ip)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        TOKEN_COLUMNS
    );
    Ok(sqlx::query_as::<_, RefreshToken>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(created_by_ip)
        .fetch_one(db)
        .await?)
}

pub async fn find_by_hash(db: impl PgExecutor<'_>, token_hash: &str) -> Result<Option<RefreshToken>, DatabaseError> {
    let sql = format!("SELECT {} FROM refresh_tokens WHERE token_hash = $1", TOKEN_COLUMNS);
    Ok(sqlx::query_as::<_, RefreshToken>(&sql)
        .bind(token_hash)
        .fetch_optional(db)
        .await?)
}

/// Revoke one token, recording its successor when rotating.
/// Returns false if it was already revoked (a concurrent rotation won).
pub async fn revoke(db: impl PgExecutor<'_>, id: Uuid, replaced_by: Option<Uuid>) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now(), replaced_by = $2
         WHERE id = $1 AND revoked_at IS NULL",
    )
    .bind(id)
    .bind(replaced_by)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn revoke_all_for_user(db: impl PgExecutor<'_>, user_id: Uuid) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "UPDATE refresh_tokens SET revoked_at = now()
         WHERE user_id = $1 AND revoked_at IS NULL",
    )
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Delete tokens that expired or were revoked before `cutoff`
pub async fn purge_before(db: impl PgExecutor<'_>, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "DELETE FROM refresh_tokens WHERE expires_at < $1 OR revoked_at < $1",
    )
    .bind(cutoff)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
