// online_users repository behaviour. Needs a database; skipped without DATABASE_URL.

mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use uuid::Uuid;

use common::{database_url, unique_username};
use rbac_admin_api::database::repositories::online_user::{self, NewConnection};
use rbac_admin_api::database::repositories::user::{self, NewUser};

#[tokio::test]
async fn heartbeat_after_cleanup_sweep_brings_connection_back() -> Result<()> {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return Ok(());
    };
    let pool = sqlx::PgPool::connect(&url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let username = unique_username("hb");
    let account = user::insert(
        &pool,
        NewUser {
            username: &username,
            password_hash: "unused",
            email: None,
            nickname: None,
            enabled: true,
        },
    )
    .await?;

    let connection_id = Uuid::new_v4();
    let connected_at = Utc::now() - Duration::minutes(10);
    online_user::insert(
        &pool,
        NewConnection {
            connection_id,
            user_id: account.id,
            username: &username,
            ip_address: None,
            user_agent: None,
            at: connected_at,
        },
    )
    .await?;

    // The sweep sees a heartbeat older than the cutoff
    let swept = online_user::mark_stale_offline(&pool, Utc::now() - Duration::minutes(1)).await?;
    assert!(swept >= 1);
    let listed = online_user::list_online(&pool).await?;
    assert!(listed.iter().all(|row| row.connection_id != connection_id));

    // The socket is still open and keeps beating
    assert!(online_user::touch_heartbeat(&pool, connection_id, Utc::now()).await?);
    let row = online_user::find(&pool, connection_id).await?.expect("row exists");
    assert!(row.is_online);
    assert!(row.disconnected_at.is_none());
    assert!(row.last_heartbeat_at > connected_at);

    // A real disconnect still wins
    assert!(online_user::mark_offline(&pool, connection_id, Utc::now()).await?);
    let row = online_user::find(&pool, connection_id).await?.expect("row exists");
    assert!(!row.is_online);

    assert!(!online_user::touch_heartbeat(&pool, Uuid::new_v4(), Utc::now()).await?);

    user::delete(&pool, account.id).await?;
    pool.close().await;
    Ok(())
}
