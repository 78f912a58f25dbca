//! Job store accessor: the boundary to the external document store.
//!
//! The document store is the single source of truth for job status and the
//! synchronization point between concurrent triggers. The core depends only
//! on the operations below, not on the rest of the document schema.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{JobStatus, ScrapeJob};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure reaching the document store.
    #[error("job store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("job {0} not found")]
    NotFound(Uuid),
}

/// Query/mutate surface over ScrapeJob records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// All jobs whose operator switch is on.
    async fn list_active_jobs(&self) -> Result<Vec<ScrapeJob>, StoreError>;

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapeJob>, StoreError>;

    /// Unconditional status write.
    async fn set_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError>;

    /// Atomically move a non-`running` job to `running`. Returns `false`
    /// when the job is already running, so two triggers cannot both win.
    async fn claim_for_run(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Record a finished run: stamps `last_run`, increments `total_runs`
    /// once, and adds `items_scraped` to the cumulative total.
    async fn record_run(&self, id: Uuid, items_scraped: u32) -> Result<(), StoreError>;
}

/// HTTP-backed accessor against the document store's scrape-job surface.
///
/// The claim operation is a single-document transaction on the store side;
/// this client only relays the verdict.
pub struct HttpJobStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct ClaimResponse {
    claimed: bool,
}

impl HttpJobStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl JobStore for HttpJobStore {
    async fn list_active_jobs(&self) -> Result<Vec<ScrapeJob>, StoreError> {
        let jobs = self
            .get("/scraper/getAll")
            .query(&[("active", "true")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(jobs)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapeJob>, StoreError> {
        let response = self
            .get("/scraper/get")
            .query(&[("id", id.to_string())])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let job = response.error_for_status()?.json().await?;
        Ok(Some(job))
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        self.post("/scraper/update")
            .json(&json!({ "id": id, "updates": { "status": status } }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn claim_for_run(&self, id: Uuid) -> Result<bool, StoreError> {
        let response: ClaimResponse = self
            .post("/scraper/claim")
            .json(&json!({ "id": id }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.claimed)
    }

    async fn record_run(&self, id: Uuid, items_scraped: u32) -> Result<(), StoreError> {
        self.post("/scraper/recordRun")
            .json(&json!({ "id": id, "items_scraped": items_scraped }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// In-memory store for tests and local development.
///
/// Clones share the same map, so a test can hold one handle while the
/// orchestrator holds another.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<Uuid, ScrapeJob>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: ScrapeJob) {
        self.jobs.write().await.insert(job.id, job);
    }

    pub async fn snapshot(&self, id: Uuid) -> Option<ScrapeJob> {
        self.jobs.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn list_active_jobs(&self) -> Result<Vec<ScrapeJob>, StoreError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.is_active)
            .cloned()
            .collect())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<ScrapeJob>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if !job.status.can_transition_to(status) {
            tracing::warn!(
                job_id = %id,
                from = %job.status,
                to = %status,
                "status write outside the documented state machine"
            );
        }
        job.status = status;
        Ok(())
    }

    async fn claim_for_run(&self, id: Uuid) -> Result<bool, StoreError> {
        // The whole check-and-set happens under one write lock, the
        // in-memory equivalent of the store's single-document transaction.
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if job.status == JobStatus::Running {
            return Ok(false);
        }
        job.status = JobStatus::Running;
        Ok(true)
    }

    async fn record_run(&self, id: Uuid, items_scraped: u32) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        job.last_run = Some(chrono::Utc::now());
        job.total_runs += 1;
        job.total_models_scraped += items_scraped;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::jobs::models::Platform;

    fn active_job() -> ScrapeJob {
        let mut job = ScrapeJob::new(Platform::Thingiverse, 10, "09:00", "17:00");
        job.is_active = true;
        job
    }

    #[tokio::test]
    async fn claim_is_exclusive_while_running() {
        let store = InMemoryJobStore::new();
        let job = active_job();
        let id = job.id;
        store.insert(job).await;

        assert!(store.claim_for_run(id).await.unwrap());
        assert!(!store.claim_for_run(id).await.unwrap());

        store.set_status(id, JobStatus::Completed).await.unwrap();
        assert!(store.claim_for_run(id).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_claims_admit_exactly_one_winner() {
        let store = InMemoryJobStore::new();
        let job = active_job();
        let id = job.id;
        store.insert(job).await;

        let (a, b) = tokio::join!(store.claim_for_run(id), store.claim_for_run(id));
        let wins = [a.unwrap(), b.unwrap()].iter().filter(|won| **won).count();
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn record_run_updates_statistics_once() {
        let store = InMemoryJobStore::new();
        let job = active_job();
        let id = job.id;
        store.insert(job).await;

        store.claim_for_run(id).await.unwrap();
        store.set_status(id, JobStatus::Completed).await.unwrap();
        store.record_run(id, 7).await.unwrap();

        let job = store.snapshot(id).await.unwrap();
        assert_eq!(job.total_runs, 1);
        assert_eq!(job.total_models_scraped, 7);
        assert!(job.last_run.is_some());
    }

    #[tokio::test]
    async fn missing_jobs_surface_not_found() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.record_run(id, 1).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.get_job(id).await.unwrap().is_none());
    }
}
