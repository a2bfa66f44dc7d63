use chrono::{DateTime, Utc};
use sqlx::{postgres::PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Permission, Role, User};
use crate::types::PageQuery;

const USER_COLUMNS: &str =
    "id, username, password_hash, email, nickname, enabled, last_login_at, created_at, modified_at";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub email: Option<&'a str>,
    pub nickname: Option<&'a str>,
    pub enabled: bool,
}

pub async fn find_by_id(db: impl PgExecutor<'_>, id: Uuid) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(db).await?)
}

pub async fn get(db: impl PgExecutor<'_>, id: Uuid) -> Result<User, DatabaseError> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))
}

pub async fn find_by_username(db: impl PgExecutor<'_>, username: &str) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
    Ok(sqlx::query_as::<_, User>(&sql).bind(username).fetch_optional(db).await?)
}

pub async fn username_exists(db: impl PgExecutor<'_>, username: &str) -> Result<bool, DatabaseError> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

pub async fn list(pool: &PgPool, query: &PageQuery) -> Result<(Vec<User>, i64), DatabaseError> {
    let pattern = query.like_pattern();
    let filter = "($1::text IS NULL OR username ILIKE $1 OR email ILIKE $1 OR nickname ILIKE $1)";

    let sql = format!(
        "SELECT {} FROM users WHERE {} ORDER BY created_at DESC, username LIMIT $2 OFFSET $3",
        USER_COLUMNS, filter
    );
    let users = sqlx::query_as::<_, User>(&sql)
        .bind(&pattern)
        .bind(query.page_size())
        .bind(query.offset())
        .fetch_all(pool)
        .await?;

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM users WHERE {}", filter))
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

    Ok((users, total))
}

pub async fn insert(db: impl PgExecutor<'_>, new_user: NewUser<'_>) -> Result<User, DatabaseError> {
    let sql = format!(
        "INSERT INTO users (id, username, password_hash, email, nickname, enabled)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(Uuid::new_v4())
        .bind(new_user.username)
        .bind(new_user.password_hash)
        .bind(new_user.email)
        .bind(new_user.nickname)
        .bind(new_user.enabled)
        .fetch_one(db)
        .await
        .map_err(|e| DatabaseError::on_unique(e, "Username already exists"))
}

/// Partial profile update. `None` keeps the column; `Some(None)` clears it.
pub async fn update_profile(
    db: impl PgExecutor<'_>,
    id: Uuid,
    email: Option<Option<&str>>,
    nickname: Option<Option<&str>>,
) -> Result<User, DatabaseError> {
    let sql = format!(
        "UPDATE users
            SET email = CASE WHEN $2 THEN $3 ELSE email END,
                nickname = CASE WHEN $4 THEN $5 ELSE nickname END,
                modified_at = now()
         WHERE id = $1
         RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .bind(email.is_some())
        .bind(email.flatten())
        .bind(nickname.is_some())
        .bind(nickname.flatten())
        .fetch_one(db)
        .await
        .map_err(|e| DatabaseError::on_missing(e, "User"))
}

pub async fn set_enabled(db: impl PgExecutor<'_>, id: Uuid, enabled: bool) -> Result<User, DatabaseError> {
    let sql = format!(
        "UPDATE users SET enabled = $2, modified_at = now() WHERE id = $1 RETURNING {}",
        USER_COLUMNS
    );
    sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .bind(enabled)
        .fetch_one(db)
        .await
        .map_err(|e| DatabaseError::on_missing(e, "User"))
}

pub async fn set_password_hash(db: impl PgExecutor<'_>, id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE users SET password_hash = $2, modified_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound("User not found".to_string()));
    }
    Ok(())
}

pub async fn touch_last_login(db: impl PgExecutor<'_>, id: Uuid, at: DateTime<Utc>) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
        .bind(id)
        .bind(at)
        .execute(db)
        .await?;
    Ok(())
}

/// Returns false when no such user existed
pub async fn delete(db: impl PgExecutor<'_>, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn roles_of(db: impl PgExecutor<'_>, user_id: Uuid) -> Result<Vec<Role>, DatabaseError> {
    let roles = sqlx::query_as::<_, Role>(
        "SELECT r.id, r.name, r.code, r.description, r.enabled, r.created_at, r.modified_at
         FROM roles r
         JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = $1
         ORDER BY r.code",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(roles)
}

pub async fn replace_roles(pool: &PgPool, user_id: Uuid, role_ids: &[Uuid]) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    add_roles(&mut *tx, user_id, role_ids).await?;

    tx.commit().await?;
    Ok(())
}

pub async fn direct_permissions(db: impl PgExecutor<'_>, user_id: Uuid) -> Result<Vec<Permission>, DatabaseError> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT p.id, p.name, p.code, p.description, p.enabled, p.created_at, p.modified_at
         FROM permissions p
         JOIN user_permissions up ON up.permission_id = p.id
         WHERE up.user_id = $1
         ORDER BY p.code",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(permissions)
}

/// Permissions reachable through the user's enabled roles (may contain duplicates)
pub async fn inherited_permissions(db: impl PgExecutor<'_>, user_id: Uuid) -> Result<Vec<Permission>, DatabaseError> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT p.id, p.name, p.code, p.description, p.enabled, p.created_at, p.modified_at
         FROM permissions p
         JOIN role_permissions rp ON rp.permission_id = p.id
         JOIN roles r ON r.id = rp.role_id AND r.enabled
         JOIN user_roles ur ON ur.role_id = r.id
         WHERE ur.user_id = $1",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(permissions)
}

pub async fn replace_permissions(pool: &PgPool, user_id: Uuid, permission_ids: &[Uuid]) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if !permission_ids.is_empty() {
        sqlx::query(
            "INSERT INTO user_permissions (user_id, permission_id)
             SELECT $1, UNNEST($2::uuid[])
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(permission_ids)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Add role links without touching existing ones
pub async fn add_roles(db: impl PgExecutor<'_>, user_id: Uuid, role_ids: &[Uuid]) -> Result<(), DatabaseError> {
    if role_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id)
         SELECT $1, UNNEST($2::uuid[])
         ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(role_ids)
    .execute(db)
    .await?;
    Ok(())
}
