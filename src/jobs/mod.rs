// jobs - periodic background work
//
// Each job gets its own task and runs its ticks one after another, so a slow
// run delays the next tick instead of overlapping it.

pub mod online_cleanup;
pub mod token_purge;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub use online_cleanup::OnlineUserCleanupJob;
pub use token_purge::RefreshTokenPurgeJob;

#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    /// Job name for logging
    fn name(&self) -> &'static str;

    /// Time between run starts
    fn interval(&self) -> Duration;

    /// Upper bound for one run (default 60 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn run(&self) -> anyhow::Result<()>;
}

/// Owns the job tasks and the shutdown signal they watch
pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Vec::new(),
        }
    }

    pub fn spawn(&mut self, job: Arc<dyn ScheduledJob>) {
        let handle = spawn_job(job, self.shutdown_tx.subscribe());
        self.handles.push(handle);
    }

    pub fn job_count(&self) -> usize {
        self.handles.len()
    }

    /// Signal every job to stop and wait for in-flight runs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!("Job task panicked: {}", e);
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

/// Run `job` on its interval until `shutdown` flips to true
pub fn spawn_job(job: Arc<dyn ScheduledJob>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = job.interval();
        tracing::info!(job = job.name(), interval_secs = period.as_secs_f64(), "Job scheduled");

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_once(job.as_ref()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!(job = job.name(), "Job stopped");
    })
}

async fn run_once(job: &dyn ScheduledJob) {
    let started = std::time::Instant::now();
    match tokio::time::timeout(job.timeout(), job.run()).await {
        Ok(Ok(())) => {
            tracing::debug!(job = job.name(), elapsed_ms = started.elapsed().as_millis() as u64, "Job run finished");
        }
        Ok(Err(e)) => tracing::error!(job = job.name(), "Job run failed: {:#}", e),
        Err(_) => tracing::error!(job = job.name(), "Job run timed out after {:?}", job.timeout()),
    }
}
