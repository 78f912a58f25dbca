//! Eligibility scheduler: decides which jobs should launch right now.
//!
//! Stateless by design. The periodic trigger (see `kernel::scheduled_tasks`)
//! owns the retry cadence and must serialize ticks: two overlapping
//! invocations could both observe the same job as non-running.

use super::models::{JobStatus, ScrapeJob};
use super::store::{JobStore, StoreError};

/// Jobs eligible at `now` (zero-padded wall-clock `HH:MM`): active, not
/// already running, and inside their inclusive schedule window.
///
/// Store failures propagate unchanged; better to skip a cycle than to
/// launch on stale data.
pub async fn jobs_to_run(store: &dyn JobStore, now: &str) -> Result<Vec<ScrapeJob>, StoreError> {
    let jobs = store.list_active_jobs().await?;
    Ok(jobs
        .into_iter()
        .filter(|job| job.status != JobStatus::Running && job.window.contains(now))
        .collect())
}

/// Current local wall-clock time as zero-padded `HH:MM`.
pub fn wall_clock_now() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::jobs::models::Platform;
    use crate::domains::jobs::store::InMemoryJobStore;

    async fn store_with(jobs: Vec<ScrapeJob>) -> InMemoryJobStore {
        let store = InMemoryJobStore::new();
        for job in jobs {
            store.insert(job).await;
        }
        store
    }

    fn job(start: &str, end: &str) -> ScrapeJob {
        let mut job = ScrapeJob::new(Platform::Printables, 10, start, end);
        job.is_active = true;
        job
    }

    #[tokio::test]
    async fn includes_jobs_at_both_window_bounds() {
        let store = store_with(vec![job("09:00", "17:00")]).await;

        assert_eq!(jobs_to_run(&store, "09:00").await.unwrap().len(), 1);
        assert_eq!(jobs_to_run(&store, "17:00").await.unwrap().len(), 1);
        assert_eq!(jobs_to_run(&store, "12:00").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn excludes_jobs_one_minute_outside_the_window() {
        let store = store_with(vec![job("09:00", "17:00")]).await;

        assert!(jobs_to_run(&store, "08:59").await.unwrap().is_empty());
        assert!(jobs_to_run(&store, "17:01").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn excludes_running_jobs_regardless_of_window() {
        let mut running = job("00:00", "23:59");
        running.status = JobStatus::Running;
        let store = store_with(vec![running]).await;

        assert!(jobs_to_run(&store, "12:00").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn excludes_inactive_jobs() {
        let mut inactive = job("00:00", "23:59");
        inactive.is_active = false;
        let store = store_with(vec![inactive]).await;

        assert!(jobs_to_run(&store, "12:00").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn midnight_crossing_windows_never_match() {
        let store = store_with(vec![job("22:00", "02:00")]).await;

        for now in ["23:00", "01:00", "22:00", "02:00"] {
            assert!(
                jobs_to_run(&store, now).await.unwrap().is_empty(),
                "window crossing midnight matched at {now}"
            );
        }
    }

    #[test]
    fn wall_clock_is_zero_padded() {
        let now = wall_clock_now();
        assert_eq!(now.len(), 5);
        assert_eq!(now.as_bytes()[2], b':');
    }
}
