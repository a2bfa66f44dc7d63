// End-to-end flows against the spawned server. They need a database and are
// skipped when DATABASE_URL is not configured.

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{database_url, ensure_server, unique_username, Api};
use rbac_admin_api::auth::hash_refresh_token;

macro_rules! require_database {
    () => {
        match database_url() {
            Some(url) => url,
            None => {
                eprintln!("DATABASE_URL not set; skipping");
                return Ok(());
            }
        }
    };
}

#[tokio::test]
async fn duplicate_username_is_a_conflict() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);
    let username = unique_username("dup");
    let body = json!({ "username": username, "password": "secret123" });

    let (status, _) = api.post("/api/auth/register", body.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = api.post("/api/auth/register", body).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 409);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_and_reuse_revokes_everything() -> Result<()> {
    let url = require_database!();
    let api = Api::new(ensure_server().await?);
    let (_, first) = api.fresh_user().await?;
    let first_refresh = first["refresh_token"].as_str().unwrap_or_default().to_string();

    let (status, body) = api.post("/api/auth/refresh", json!({ "refresh_token": first_refresh })).await?;
    assert_eq!(status, StatusCode::OK);
    let second_refresh = body["data"]["refresh_token"].as_str().unwrap_or_default().to_string();
    assert_ne!(first_refresh, second_refresh);

    // The old row points at its replacement
    let pool = sqlx::PgPool::connect(&url).await?;
    let (replaced_by, revoked): (Option<Uuid>, bool) = sqlx::query_as(
        "SELECT replaced_by, revoked_at IS NOT NULL FROM refresh_tokens WHERE token_hash = $1",
    )
    .bind(hash_refresh_token(&first_refresh))
    .fetch_one(&pool)
    .await?;
    let (second_id,): (Uuid,) = sqlx::query_as("SELECT id FROM refresh_tokens WHERE token_hash = $1")
        .bind(hash_refresh_token(&second_refresh))
        .fetch_one(&pool)
        .await?;
    assert!(revoked);
    assert_eq!(replaced_by, Some(second_id));

    // Presenting the rotated-out token again is treated as theft
    let (status, body) = api.post("/api/auth/refresh", json!({ "refresh_token": first_refresh })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Refresh token has been revoked");

    let (status, _) = api.post("/api/auth/refresh", json!({ "refresh_token": second_refresh })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn unknown_refresh_token_is_unauthorized() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);
    let (status, _) = api.post("/api/auth/refresh", json!({ "refresh_token": "nope" })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn permission_guard_forbids_plain_users_and_admits_super_admin() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);

    let (user, _) = api.fresh_user().await?;
    let (status, body) = user.get("/api/users").await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Missing permission: user:view");

    // Authenticated-only routes still work without any permission
    let (status, body) = user.get("/api/auth/me").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_super_admin"], false);

    let admin = api.admin().await?;
    let (status, body) = admin.get("/api/users?page=1&page_size=5").await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["items"].is_array());
    Ok(())
}

#[tokio::test]
async fn admin_cannot_delete_or_disable_self() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);
    let admin = api.admin().await?;

    let (_, me) = admin.get("/api/auth/me").await?;
    let id = me["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, body) = admin.delete(&format!("/api/users/{}", id)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot delete your own account");

    let (status, body) = admin.put(&format!("/api/users/{}/status", id), json!({ "enabled": false })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot disable your own account");
    Ok(())
}

#[tokio::test]
async fn profile_update_keeps_omitted_fields() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);
    let admin = api.admin().await?;

    let (status, created) = admin
        .post(
            "/api/users",
            json!({
                "username": unique_username("p"),
                "password": "secret123",
                "email": "p@example.com",
                "nickname": "Pat"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/api/users/{}", created["data"]["id"].as_str().unwrap_or_default());

    let (status, body) = admin.put(&path, json!({ "nickname": "Patricia" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nickname"], "Patricia");
    assert_eq!(body["data"]["email"], "p@example.com");

    let (_, body) = admin.put(&path, json!({ "email": "" })).await?;
    assert!(body["data"]["email"].is_null());
    assert_eq!(body["data"]["nickname"], "Patricia");

    let (status, _) = admin.delete(&path).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn super_admin_role_is_protected() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);
    let admin = api.admin().await?;
    let code = rbac_admin_api::config::config().security.super_admin_role_code.clone();

    let (_, roles) = admin.get("/api/roles/all").await?;
    let role = roles["data"]
        .as_array()
        .and_then(|all| all.iter().find(|r| r["code"] == code.as_str()).cloned())
        .expect("seeded super admin role");
    let path = format!("/api/roles/{}", role["id"].as_str().unwrap_or_default());

    let (status, _) = admin.delete(&path).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = admin
        .put(&path, json!({ "name": role["name"], "code": code, "enabled": false }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The super administrator role cannot be disabled");
    Ok(())
}

#[tokio::test]
async fn menu_hierarchy_rules() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);
    let admin = api.admin().await?;
    let suffix = unique_username("m");

    let parent_body = json!({ "name": format!("Parent {}", suffix), "menu_type": "directory" });
    let (status, parent) = admin.post("/api/menus", parent_body.clone()).await?;
    assert_eq!(status, StatusCode::CREATED);
    let parent_id = parent["data"]["id"].as_str().unwrap_or_default().to_string();

    let (status, child) = admin
        .post(
            "/api/menus",
            json!({
                "parent_id": parent_id,
                "name": format!("Child {}", suffix),
                "path": format!("/{}", suffix),
                "menu_type": "menu"
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let child_id = child["data"]["id"].as_str().unwrap_or_default().to_string();

    // A parent with children cannot be removed
    let (status, _) = admin.delete(&format!("/api/menus/{}", parent_id)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // Nor moved under its own descendant
    let mut moved = parent_body;
    moved["parent_id"] = json!(child_id);
    let (status, _) = admin.put(&format!("/api/menus/{}", parent_id), moved).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = admin.delete(&format!("/api/menus/{}", child_id)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = admin.delete(&format!("/api/menus/{}", parent_id)).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn kicking_unknown_connection_is_not_found() -> Result<()> {
    require_database!();
    let api = Api::new(ensure_server().await?);
    let admin = api.admin().await?;

    let (status, body) = admin.delete(&format!("/api/online-users/{}", Uuid::new_v4())).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    Ok(())
}
