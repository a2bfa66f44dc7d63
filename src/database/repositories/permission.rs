use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Permission;

const PERMISSION_COLUMNS: &str = "id, name, code, description, enabled, created_at, modified_at";

pub struct PermissionFields<'a> {
    pub name: &'a str,
    pub code: &'a str,
    pub description: Option<&'a str>,
    pub enabled: bool,
}

pub async fn list(db: impl PgExecutor<'_>, like_pattern: Option<&str>) -> Result<Vec<Permission>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM permissions
         WHERE ($1::text IS NULL OR name ILIKE $1 OR code ILIKE $1)
         ORDER BY code",
        PERMISSION_COLUMNS
    );
    Ok(sqlx::query_as::<_, Permission>(&sql).bind(like_pattern).fetch_all(db).await?)
}

pub async fn find_by_id(db: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Permission>, DatabaseError> {
    let sql = format!("SELECT {} FROM permissions WHERE id = $1", PERMISSION_COLUMNS);
    Ok(sqlx::query_as::<_, Permission>(&sql).bind(id).fetch_optional(db).await?)
}

pub async fn get(db: impl PgExecutor<'_>, id: Uuid) -> Result<Permission, DatabaseError> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Permission not found".to_string()))
}

pub async fn code_taken(db: impl PgExecutor<'_>, code: &str, except: Option<Uuid>) -> Result<bool, DatabaseError> {
    let (taken,): (bool,) = sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM permissions WHERE code = $1 AND ($2::uuid IS NULL OR id <> $2))",
    )
    .bind(code)
    .bind(except)
    .fetch_one(db)
    .await?;
    Ok(taken)
}

pub async fn existing_ids(db: impl PgExecutor<'_>, ids: &[Uuid]) -> Result<Vec<Uuid>, DatabaseError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM permissions WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn ids_for_codes(db: impl PgExecutor<'_>, codes: &[String]) -> Result<Vec<Uuid>, DatabaseError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM permissions WHERE code = ANY($1)")
        .bind(codes)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn insert(db: impl PgExecutor<'_>, fields: PermissionFields<'_>) -> Result<Permission, DatabaseError> {
    let sql = format!(
        "INSERT INTO permissions (id, name, code, description, enabled)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        PERMISSION_COLUMNS
    );
    sqlx::query_as::<_, Permission>(&sql)
        .bind(Uuid::new_v4())
        .bind(fields.name)
        .bind(fields.code)
        .bind(fields.description)
        .bind(fields.enabled)
        .fetch_one(db)
        .await
        .map_err(|e| DatabaseError::on_unique(e, "Permission code already exists"))
}

/// Insert unless the code already exists; returns whether a row was added
pub async fn insert_if_missing(db: impl PgExecutor<'_>, fields: PermissionFields<'_>) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "INSERT INTO permissions (id, name, code, description, enabled)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (code) DO NOTHING",
    )
    .bind(Uuid::new_v4())
    .bind(fields.name)
    .bind(fields.code)
    .bind(fields.description)
    .bind(fields.enabled)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update(db: impl PgExecutor<'_>, id: Uuid, fields: PermissionFields<'_>) -> Result<Permission, DatabaseError> {
    let sql = format!(
        "UPDATE permissions SET name = $2, code = $3, description = $4, enabled = $5, modified_at = now()
         WHERE id = $1
         RETURNING {}",
        PERMISSION_COLUMNS
    );
    sqlx::query_as::<_, Permission>(&sql)
        .bind(id)
        .bind(fields.name)
        .bind(fields.code)
        .bind(fields.description)
        .bind(fields.enabled)
        .fetch_one(db)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Permission not found".to_string()),
            other => DatabaseError::on_unique(other, "Permission code already exists"),
        })
}

pub async fn delete(db: impl PgExecutor<'_>, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM permissions WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}
