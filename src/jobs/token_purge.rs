use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use super::ScheduledJob;
use crate::database::manager::DatabaseManager;
use crate::database::repositories::{online_user, refresh_token};

/// Rows older than this are deleted
const RETENTION_DAYS: i64 = 7;

/// Hourly housekeeping: drops refresh tokens that expired or were revoked,
/// and offline presence rows, more than a week ago
pub struct RefreshTokenPurgeJob;

#[async_trait]
impl ScheduledJob for RefreshTokenPurgeJob {
    fn name(&self) -> &'static str {
        "refresh-token-purge"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(60 * 60)
    }

    async fn run(&self) -> anyhow::Result<()> {
        let pool = DatabaseManager::pool().await?;
        let cutoff = Utc::now() - chrono::Duration::days(RETENTION_DAYS);

        let tokens = refresh_token::purge_before(&pool, cutoff).await?;
        let connections = online_user::purge_offline_before(&pool, cutoff).await?;
        if tokens > 0 || connections > 0 {
            tracing::info!(tokens, connections, "Purged old refresh tokens and presence rows");
        }
        Ok(())
    }
}
