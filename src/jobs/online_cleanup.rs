use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

use super::ScheduledJob;
use crate::config::PresenceConfig;
use crate::database::manager::DatabaseManager;
use crate::database::repositories::online_user;

/// Marks connections offline once their heartbeat is older than the timeout
pub struct OnlineUserCleanupJob {
    heartbeat_timeout: Duration,
    every: Duration,
}

impl OnlineUserCleanupJob {
    pub fn new(heartbeat_timeout: Duration, every: Duration) -> Self {
        Self {
            heartbeat_timeout,
            every,
        }
    }

    pub fn from_config(presence: &PresenceConfig) -> Self {
        Self::new(
            Duration::from_secs(presence.heartbeat_timeout_secs),
            Duration::from_secs(presence.cleanup_interval_secs.max(1)),
        )
    }

    /// One sweep; returns the number of connections marked offline
    pub async fn sweep(&self) -> anyhow::Result<u64> {
        let pool = DatabaseManager::pool().await?;
        let cutoff = Utc::now() - chrono::Duration::from_std(self.heartbeat_timeout)?;
        let affected = online_user::mark_stale_offline(&pool, cutoff).await?;
        if affected > 0 {
            tracing::info!(affected, "Marked stale connections offline");
        } else {
            tracing::debug!("No stale connections");
        }
        Ok(affected)
    }
}

#[async_trait]
impl ScheduledJob for OnlineUserCleanupJob {
    fn name(&self) -> &'static str {
        "online-user-cleanup"
    }

    fn interval(&self) -> Duration {
        self.every
    }

    async fn run(&self) -> anyhow::Result<()> {
        self.sweep().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_comes_from_config() {
        let job = OnlineUserCleanupJob::from_config(&PresenceConfig {
            heartbeat_timeout_secs: 90,
            cleanup_interval_secs: 0,
            event_buffer: 16,
        });
        assert_eq!(job.interval(), Duration::from_secs(1));
        assert_eq!(job.heartbeat_timeout, Duration::from_secs(90));
        assert_eq!(job.name(), "online-user-cleanup");
    }
}
