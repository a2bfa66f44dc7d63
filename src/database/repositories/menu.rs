use sqlx::postgres::PgExecutor;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Menu, MenuType};

const MENU_COLUMNS: &str = "id, parent_id, name, path, component, icon, sort_order, menu_type, \
                            permission_code, hidden, enabled, created_at, modified_at";

pub struct MenuFields<'a> {
    pub parent_id: Option<Uuid>,
    pub name: &'a str,
    pub path: Option<&'a str>,
    pub component: Option<&'a str>,
    pub icon: Option<&'a str>,
    pub sort_order: i32,
    pub menu_type: MenuType,
    pub permission_code: Option<&'a str>,
    pub hidden: bool,
    pub enabled: bool,
}

pub async fn list(db: impl PgExecutor<'_>) -> Result<Vec<Menu>, DatabaseError> {
    let sql = format!("SELECT {} FROM menus ORDER BY sort_order, name", MENU_COLUMNS);
    Ok(sqlx::query_as::<_, Menu>(&sql).fetch_all(db).await?)
}

pub async fn find_by_id(db: impl PgExecutor<'_>, id: Uuid) -> Result<Option<Menu>, DatabaseError> {
    let sql = format!("SELECT {} FROM menus WHERE id = $1", MENU_COLUMNS);
    Ok(sqlx::query_as::<_, Menu>(&sql).bind(id).fetch_optional(db).await?)
}

pub async fn get(db: impl PgExecutor<'_>, id: Uuid) -> Result<Menu, DatabaseError> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Menu not found".to_string()))
}

pub async fn has_children(db: impl PgExecutor<'_>, id: Uuid) -> Result<bool, DatabaseError> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM menus WHERE parent_id = $1)")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(exists)
}

pub async fn count(db: impl PgExecutor<'_>) -> Result<i64, DatabaseError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM menus").fetch_one(db).await?;
    Ok(count)
}

pub async fn insert(db: impl PgExecutor<'_>, fields: MenuFields<'_>) -> Result<Menu, DatabaseError> {
    let sql = format!(
        "INSERT INTO menus (id, parent_id, name, path, component, icon, sort_order, menu_type,
                            permission_code, hidden, enabled)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {}",
        MENU_COLUMNS
    );
    Ok(sqlx::query_as::<_, Menu>(&sql)
        .bind(Uuid::new_v4())
        .bind(fields.parent_id)
        .bind(fields.name)
        .bind(fields.path)
        .bind(fields.component)
        .bind(fields.icon)
        .bind(fields.sort_order)
        .bind(fields.menu_type.as_str())
        .bind(fields.permission_code)
        .bind(fields.hidden)
        .bind(fields.enabled)
        .fetch_one(db)
        .await?)
}

pub async fn update(db: impl PgExecutor<'_>, id: Uuid, fields: MenuFields<'_>) -> Result<Menu, DatabaseError> {
    let sql = format!(
        "UPDATE menus SET parent_id = $2, name = $3, path = $4, component = $5, icon = $6,
                          sort_order = $7, menu_type = $8, permission_code = $9, hidden = $10,
                          enabled = $11, modified_at = now()
         WHERE id = $1
         RETURNING {}",
        MENU_COLUMNS
    );
    sqlx::query_as::<_, Menu>(&sql)
        .bind(id)
        .bind(fields.parent_id)
        .bind(fields.name)
        .bind(fields.path)
        .bind(fields.component)
        .bind(fields.icon)
        .bind(fields.sort_order)
        .bind(fields.menu_type.as_str())
        .bind(fields.permission_code)
        .bind(fields.hidden)
        .bind(fields.enabled)
        .fetch_one(db)
        .await
        .map_err(|e| DatabaseError::on_missing(e, "Menu"))
}

pub async fn delete(db: impl PgExecutor<'_>, id: Uuid) -> Result<bool, DatabaseError> {
    let result = sqlx::query("DELETE FROM menus WHERE id = $1").bind(id).execute(db).await?;
    Ok(result.rows_affected() > 0)
}
