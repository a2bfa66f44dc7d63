use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::OnlineUser;

const ONLINE_COLUMNS: &str = "connection_id, user_id, username, ip_address, user_agent, connected_at, \
                              last_heartbeat_at, is_online, disconnected_at";

pub struct NewConnection<'a> {
    pub connection_id: Uuid,
    pub user_id: Uuid,
    pub username: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub at: DateTime<Utc>,
}

pub async fn insert(db: impl PgExecutor<'_>, conn: NewConnection<'_>) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO online_users (connection_id, user_id, username, ip_address, user_agent,
                                   connected_at, last_heartbeat_at, is_online)
         VALUES ($1, $2, $3, $4, $5, $6, $6, TRUE)
         ON CONFLICT (connection_id) DO UPDATE
           SET last_heartbeat_at = EXCLUDED.last_heartbeat_at, is_online = TRUE, disconnected_at = NULL",
    )
    .bind(conn.connection_id)
    .bind(conn.user_id)
    .bind(conn.username)
    .bind(conn.ip_address)
    .bind(conn.user_agent)
    .bind(conn.at)
    .execute(db)
    .await?;
    Ok(())
}

/// Record liveness. A row the cleanup sweep marked offline comes back online,
/// since the socket is evidently still open. Returns false for unknown ids.
pub async fn touch_heartbeat(db: impl PgExecutor<'_>, connection_id: Uuid, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE online_users
            SET last_heartbeat_at = GREATEST(last_heartbeat_at, $2), is_online = TRUE, disconnected_at = NULL
         WHERE connection_id = $1",
    )
    .bind(connection_id)
    .bind(at)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn mark_offline(db: impl PgExecutor<'_>, connection_id: Uuid, at: DateTime<Utc>) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE online_users SET is_online = FALSE, disconnected_at = $2
         WHERE connection_id = $1 AND is_online",
    )
    .bind(connection_id)
    .bind(at)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Flip every connection whose last heartbeat is older than `cutoff` to offline
pub async fn mark_stale_offline(db: impl PgExecutor<'_>, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "UPDATE online_users SET is_online = FALSE, disconnected_at = now()
         WHERE is_online AND last_heartbeat_at < $1",
    )
    .bind(cutoff)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Startup reset: connections from a previous process cannot still be live
pub async fn mark_all_offline(db: impl PgExecutor<'_>) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE online_users SET is_online = FALSE, disconnected_at = now() WHERE is_online")
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub async fn list_online(db: impl PgExecutor<'_>) -> Result<Vec<OnlineUser>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM online_users WHERE is_online ORDER BY connected_at DESC",
        ONLINE_COLUMNS
    );
    Ok(sqlx::query_as::<_, OnlineUser>(&sql).fetch_all(db).await?)
}

pub async fn find(db: impl PgExecutor<'_>, connection_id: Uuid) -> Result<Option<OnlineUser>, DatabaseError> {
    let sql = format!("SELECT {} FROM online_users WHERE connection_id = $1", ONLINE_COLUMNS);
    Ok(sqlx::query_as::<_, OnlineUser>(&sql)
        .bind(connection_id)
        .fetch_optional(db)
        .await?)
}

/// (connections, distinct users) currently online
pub async fn count_online(db: impl PgExecutor<'_>) -> Result<(i64, i64), DatabaseError> {
    let counts: (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(DISTINCT user_id) FROM online_users WHERE is_online",
    )
    .fetch_one(db)
    .await?;
    Ok(counts)
}

/// Remove offline rows older than `cutoff`
pub async fn purge_offline_before(db: impl PgExecutor<'_>, cutoff: DateTime<Utc>) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM online_users WHERE NOT is_online AND disconnected_at < $1")
        .bind(cutoff)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}
