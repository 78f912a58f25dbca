//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! # Architecture
//!
//! The eligibility tick is the external periodic trigger the scheduler
//! contract expects. It is serialized (single-flight): overlapping ticks
//! could both observe the same job as non-running and double-launch it.
//!
//! ```text
//! Scheduler (every minute)
//!     │
//!     └─► jobs_to_run(now)
//!             └─► For each due job → Orchestrator::spawn (own task)
//!                     └─► claim → subprocess → status + events
//! ```

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::jobs::{jobs_to_run, wall_clock_now, JobStore, Orchestrator};

/// Start all scheduled tasks
pub async fn start_scheduler(
    store: Arc<dyn JobStore>,
    orchestrator: Arc<Orchestrator>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Eligibility tick - runs every minute (windows have minute granularity)
    let tick_guard = Arc::new(Mutex::new(()));
    let tick_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let store = store.clone();
        let orchestrator = orchestrator.clone();
        let guard = tick_guard.clone();
        Box::pin(async move {
            let Ok(_tick) = guard.try_lock() else {
                tracing::warn!("previous eligibility tick still running; skipping this one");
                return;
            };
            if let Err(e) = run_eligibility_tick(store.as_ref(), &orchestrator).await {
                tracing::error!("Eligibility tick failed: {}", e);
            }
        })
    })?;

    scheduler.add(tick_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (eligibility tick every minute)");
    Ok(scheduler)
}

/// Run one eligibility cycle
///
/// Queries the jobs due at the current wall-clock minute and launches each
/// on its own task. A store failure skips the whole cycle; better to miss
/// a tick than to launch on stale data.
pub async fn run_eligibility_tick(
    store: &dyn JobStore,
    orchestrator: &Arc<Orchestrator>,
) -> Result<()> {
    let now = wall_clock_now();
    let due = jobs_to_run(store, &now).await?;

    if due.is_empty() {
        tracing::debug!(%now, "no jobs due");
        return Ok(());
    }

    tracing::info!(%now, count = due.len(), "launching due scrape jobs");
    for job in due {
        tracing::info!(job_id = %job.id, platform = %job.platform, "queueing scrape job");
        orchestrator.spawn(job);
    }

    Ok(())
}
