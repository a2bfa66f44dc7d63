use sqlx::{postgres::PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Permission, Role};
use crate::types::PageQuery;

const ROLE_COLUMNS: &str = "id, name, code, description, enabled, created_at, modified_at";

pub struct RoleFields<'a> {
    pub name: &'a str,
    pub code: &'a str,
    pub description: Option<&'a str>,
    pub enabled: bool,
}

pub async fn find_by_id(db: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Role>, DatabaseError> {
    let sql = format!("SELECT {} FROM roles WHERE id = $1", ROLE_COLUMNS);
    Ok(sqlx::query_as::<_, Role>(&sql).bind(id).fetch_optional(db).await?)
}

pub async fn get(db: impl PgExecutor<'_>, id: Uuid) -> Result<Role, DatabaseError> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Role not found".to_string()))
}

pub async fn find_by_code(db: impl PgExecutor<'_>, code: &str) -> Result<Option<Role>, DatabaseError> {
    let sql = format!("SELECT {} FROM roles WHERE code = $1", ROLE_COLUMNS);
    Ok(sqlx::query_as::<_, Role>(&sql).bind(code).fetch_optional(db).await?)
}

/// True when another role (not `except`) already uses the name or code
pub async fn name_or_code_taken(
    db: impl PgExecutor<'_>,
    name: &str,
    code: &str,
    except: Option<Uuid>,
) -> Result<Option<&'static str>, DatabaseError> {
    let row: Option<(bool, bool)> = sqlx::query_as(
        "SELECT bool_or(name = $1), bool_or(code = $2)
         FROM roles
         WHERE (name = $1 OR code = $2) AND ($3::uuid IS NULL OR id <> $3)
         HAVING COUNT(*) > 0",
    )
    .bind(name)
    .bind(code)
    .bind(except)
    .fetch_optional(db)
    .await?;

    Ok(match row {
        Some((true, _)) => Some("name"),
        Some((_, true)) => Some("code"),
        _ => None,
    })
}

pub async fn list(pool: &PgPool, query: &PageQuery) -> Result<(Vec<Role>, i64), DatabaseError> {
    let pattern = query.like_pattern();
    let filter = "($1::text IS NULL OR name ILIKE $1 OR code ILIKE $1)";

    let sql = format!(
        "SELECT {} FROM roles WHERE {} ORDER BY created_at, code LIMIT $2 OFFSET $3",
        ROLE_COLUMNS, filter
    );
    let roles = sqlx::query_as::<_, Role>(&sql)
        .bind(&pattern)
        .bind(query.page_size())
        .bind(query.offset())
        .fetch_all(pool)
        .await?;

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM roles WHERE {}", filter))
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

    Ok((roles, total))
}

pub async fn list_enabled(db: impl PgExecutor<'_>) -> Result<Vec<Role>, DatabaseError> {
    let sql = format!("SELECT {} FROM roles WHERE enabled ORDER BY code", ROLE_COLUMNS);
    Ok(sqlx::query_as::<_, Role>(&sql).fetch_all(db).await?)
}

/// Ids from `ids` that exist
pub async fn existing_ids(db: impl PgExecutor<'_>, ids: &[Uuid]) -> Result<Vec<Uuid>, DatabaseError> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM roles WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn insert(db: impl PgExecutor<'_>, fields: RoleFields<'_>) -> Result<Role, DatabaseError> {
    let sql = format!(
        "INSERT INTO roles (id, name, code, description, enabled)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {}",
        ROLE_COLUMNS
    );
    sqlx::query_as::<_, Role>(&sql)
        .bind(Uuid::new_v4())
        .bind(fields.name)
        .bind(fields.code)
        .bind(fields.description)
        .bind(fields.enabled)
        .fetch_one(db)
        .await
        .map_err(|e| DatabaseError::on_unique(e, "Role name or code already exists"))
}

pub async fn update(db: impl PgExecutor<'_>, id: Uuid, fields: RoleFields<'_>) -> Result<Role, DatabaseError> {
    let sql = format!(
        "UPDATE roles SET name = $2, code = $3, description = $4, enabled = $5, modified_at = now()
         WHERE id = $1
         RETURNING {}",
        ROLE_COLUMNS
    );
    sqlx::query_as::<_, Role>(&sql)
        .bind(id)
        .bind(fields.name)
        .bind(fields.code)
        .bind(fields.description)
        .bind(fields.enabled)
        .fetch_one(db)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Role not found".to_string()),
            other => DatabaseError::on_unique(other, "Role name or code already exists"),
        })
}

pub async fn delete(db: impl PgExecutor<'_>, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM roles WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}

pub async fn permissions_of(db: impl PgExecutor<'_>, role_id: Uuid) -> Result<Vec<Permission>, DatabaseError> {
    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT p.id, p.name, p.code, p.description, p.enabled, p.created_at, p.modified_at
         FROM permissions p
         JOIN role_permissions rp ON rp.permission_id = p.id
         WHERE rp.role_id = $1
         ORDER BY p.code",
    )
    .bind(role_id)
    .fetch_all(db)
    .await?;
    Ok(permissions)
}

pub async fn add_permissions(db: impl PgExecutor<'_>, role_id: Uuid, permission_ids: &[Uuid]) -> Result<(), DatabaseError> {
    if permission_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO role_permissions (role_id, permission_id)
         SELECT $1, UNNEST($2::uuid[])
         ON CONFLICT DO NOTHING",
    )
    .bind(role_id)
    .bind(permission_ids)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn replace_permissions(pool: &PgPool, role_id: Uuid, permission_ids: &[Uuid]) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
        .bind(role_id)
        .execute(&mut *tx)
        .await?;
    add_permissions(&mut *tx, role_id, permission_ids).await?;

    tx.commit().await?;
    Ok(())
}
