//! Scrape orchestrator: turns an eligible or triggered job into a running
//! subprocess, and a subprocess outcome into a status transition plus event
//! emission.
//!
//! Each launched job runs on its own tokio task. There is no global
//! concurrency limit and no subprocess timeout; the only exclusion is that
//! a job already `running` is never started again, enforced by the
//! scheduler's filter and re-checked here with an atomic claim.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

use relay::{EventBus, RelayClient, ScrapingEvent};

use super::models::{JobStatus, Platform, ScrapeJob, ScrapeParams};
use super::store::JobStore;

/// Outbound seam for scrape events. Production publishes over the relay
/// connection; tests fan out on a local bus.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ScrapingEvent);
}

/// Publishes through the relay client; the relay endpoint fans the event
/// out to every subscribed admin client.
pub struct RelayPublisher {
    client: RelayClient,
}

impl RelayPublisher {
    pub fn new(client: RelayClient) -> Self {
        Self { client }
    }
}

impl EventPublisher for RelayPublisher {
    fn publish(&self, event: ScrapingEvent) {
        self.client.send(&event);
    }
}

/// Fans events out on an in-process bus. Used by tests and single-process
/// deployments where producers and consumers share the process.
pub struct BusPublisher {
    bus: EventBus,
}

impl BusPublisher {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl EventPublisher for BusPublisher {
    fn publish(&self, event: ScrapingEvent) {
        self.bus.emit(&event);
    }
}

struct RunOutcome {
    items_scraped: u32,
}

pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    publisher: Arc<dyn EventPublisher>,
    scraper_root: PathBuf,
    interpreter: String,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        publisher: Arc<dyn EventPublisher>,
        scraper_root: impl Into<PathBuf>,
        interpreter: impl Into<String>,
    ) -> Self {
        Self {
            store,
            publisher,
            scraper_root: scraper_root.into(),
            interpreter: interpreter.into(),
        }
    }

    /// Launch a scheduled job on its own task (fire-and-forget).
    pub fn spawn(self: &Arc<Self>, job: ScrapeJob) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.launch(job).await;
        });
    }

    /// Launch a webhook-triggered scrape on its own task. The trigger is not
    /// tied to a stored job, so no status transition or run statistics are
    /// recorded; outcome events still flow to the relay.
    pub fn spawn_adhoc(self: &Arc<Self>, platform: Platform, limit: u32, params: ScrapeParams) {
        let this = Arc::clone(self);
        let job = ScrapeJob::adhoc(platform, limit, params);
        tokio::spawn(async move {
            this.publisher
                .publish(ScrapingEvent::scraping_started(platform.to_string()));
            match this.run_scraper(&job).await {
                Ok(outcome) => {
                    info!(%platform, items = outcome.items_scraped, "ad-hoc scrape completed");
                    this.publisher.publish(ScrapingEvent::scraping_completed(
                        platform.to_string(),
                        outcome.items_scraped,
                        0,
                    ));
                }
                Err(err) => {
                    error!(%platform, error = %err, "ad-hoc scrape failed");
                    this.publisher.publish(ScrapingEvent::scraping_error(
                        platform.to_string(),
                        err.to_string(),
                    ));
                }
            }
        });
    }

    /// Run one job to completion: claim, spawn, supervise, report.
    ///
    /// Every failure is absorbed here, converted into a `failed` status and
    /// a `scraping_error` event, never propagated to the caller. Other jobs
    /// are unaffected.
    pub async fn launch(&self, job: ScrapeJob) {
        let job_id = job.id;
        let platform = job.platform;

        // The scheduler already excludes running jobs, but two overlapping
        // triggers could both have observed the job as idle; the claim is
        // the authoritative check.
        match self.store.claim_for_run(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(job_id = %job_id, %platform, "job is already running; skipping launch");
                return;
            }
            Err(err) => {
                error!(job_id = %job_id, %platform, error = %err, "could not claim job; skipping launch");
                return;
            }
        }

        self.publisher
            .publish(ScrapingEvent::scraping_started(platform.to_string()));

        match self.run_scraper(&job).await {
            Ok(outcome) => {
                info!(
                    job_id = %job_id,
                    %platform,
                    items = outcome.items_scraped,
                    "scrape job completed"
                );
                self.finish(job_id, platform, JobStatus::Completed, outcome.items_scraped, None)
                    .await;
            }
            Err(err) => {
                error!(job_id = %job_id, %platform, error = %err, "scrape job failed");
                self.finish(job_id, platform, JobStatus::Failed, 0, Some(err.to_string()))
                    .await;
            }
        }
    }

    /// Record the terminal status and run statistics, then emit the outcome
    /// event. Store failures here are logged, not propagated; the relay
    /// event is still worth emitting for the operators watching.
    async fn finish(
        &self,
        job_id: uuid::Uuid,
        platform: Platform,
        status: JobStatus,
        items_scraped: u32,
        error_message: Option<String>,
    ) {
        if let Err(err) = self.store.set_status(job_id, status).await {
            error!(job_id = %job_id, error = %err, "failed to record terminal job status");
        }
        if let Err(err) = self.store.record_run(job_id, items_scraped).await {
            error!(job_id = %job_id, error = %err, "failed to record run statistics");
        }

        let event = match status {
            JobStatus::Completed => {
                ScrapingEvent::scraping_completed(platform.to_string(), items_scraped, 0)
            }
            _ => ScrapingEvent::scraping_error(
                platform.to_string(),
                error_message.unwrap_or_else(|| "scrape failed".to_string()),
            ),
        };
        self.publisher.publish(event);
    }

    /// Spawn the platform scraper and stream its output until exit.
    ///
    /// stdout is scanned for the optional `items_scraped=<n>` marker the
    /// scrapers print before exiting; the last occurrence wins.
    async fn run_scraper(&self, job: &ScrapeJob) -> Result<RunOutcome> {
        let script = self.scraper_root.join(job.platform.script_path());
        let args = job.platform.args(job.count, &job.params)?;

        info!(
            job_id = %job.id,
            platform = %job.platform,
            script = %script.display(),
            "spawning scraper"
        );

        let mut child = Command::new(&self.interpreter)
            .arg(&script)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn scraper {}", script.display()))?;

        let stdout = child
            .stdout
            .take()
            .context("scraper stdout was not captured")?;
        let stderr = child
            .stderr
            .take()
            .context("scraper stderr was not captured")?;

        let platform = job.platform;
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(%platform, "scraper stderr: {line}");
            }
        });

        let mut items_scraped = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(rest) = line.trim().strip_prefix("items_scraped=") {
                if let Ok(count) = rest.trim().parse::<u32>() {
                    items_scraped = Some(count);
                }
            }
            info!(%platform, "scraper: {line}");
        }

        let status = child
            .wait()
            .await
            .context("failed waiting for scraper to exit")?;
        let _ = stderr_task.await;

        if status.success() {
            Ok(RunOutcome {
                items_scraped: items_scraped.unwrap_or(0),
            })
        } else {
            anyhow::bail!("scraper exited with {status}")
        }
    }
}
