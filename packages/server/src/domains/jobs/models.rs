//! ScrapeJob domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Platforms the aggregator scrapes. The set is fixed; each platform maps to
/// one scraper script with its own argument shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Thingiverse,
    CGTrader,
    Makerworld,
    Pinshape,
    Thangs,
    Printables,
}

impl Platform {
    /// Scraper script location relative to the scraper root.
    pub fn script_path(&self) -> &'static str {
        match self {
            Platform::Thingiverse => "thingiverse/thingiverse.py",
            Platform::CGTrader => "cgtrader/cgtrader.py",
            Platform::Makerworld => "makerworld/makerworld.py",
            Platform::Pinshape => "pinshape/pinshape.py",
            Platform::Thangs => "thangs/thangs.py",
            Platform::Printables => "printables/printables.py",
        }
    }

    /// Build the scraper's argument list. Platforms differ in which category
    /// arguments their scripts take; all take the item-count limit last.
    pub fn args(&self, limit: u32, params: &ScrapeParams) -> Result<Vec<String>, MissingParamError> {
        let limit = limit.to_string();
        let args = match self {
            Platform::Thingiverse | Platform::Makerworld => vec![limit],
            Platform::CGTrader | Platform::Pinshape => {
                vec![self.require(params.category.as_deref(), "category")?, limit]
            }
            Platform::Thangs => vec![
                self.require(params.category.as_deref(), "category")?,
                self.require(params.subcategory.as_deref(), "subcategory")?,
                limit,
            ],
            Platform::Printables => {
                vec![self.require(params.subcategory.as_deref(), "subcategory")?, limit]
            }
        };
        Ok(args)
    }

    fn require(
        &self,
        value: Option<&str>,
        missing: &'static str,
    ) -> Result<String, MissingParamError> {
        value.map(str::to_string).ok_or(MissingParamError {
            platform: *self,
            missing,
        })
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Platform::Thingiverse => "Thingiverse",
            Platform::CGTrader => "CGTrader",
            Platform::Makerworld => "Makerworld",
            Platform::Pinshape => "Pinshape",
            Platform::Thangs => "Thangs",
            Platform::Printables => "Printables",
        };
        f.write_str(name)
    }
}

/// A platform's scraper was invoked without a category argument it needs.
#[derive(Debug, Clone, Error)]
#[error("platform {platform} requires a {missing} parameter")]
pub struct MissingParamError {
    pub platform: Platform,
    pub missing: &'static str,
}

/// Per-platform category arguments carried by jobs and trigger requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
}

/// Job lifecycle status.
///
/// Transitions only `idle → running → {completed, failed} → idle`. A job
/// already `running` is never re-triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether the state machine permits `self → next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Idle, Running) | (Running, Completed) | (Running, Failed) | (Completed, Idle) | (Failed, Idle)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Idle => "idle",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Wall-clock eligibility window, inclusive on both ends.
///
/// Times are zero-padded `HH:MM` strings compared lexicographically, which
/// matches chronological order within a single day. A window whose start is
/// after its end (crossing midnight) can never contain any time and is
/// therefore never eligible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    #[serde(rename = "start_time")]
    pub start: String,
    #[serde(rename = "end_time")]
    pub end: String,
}

impl ScheduleWindow {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Whether `now` (zero-padded `HH:MM`) falls inside the window.
    pub fn contains(&self, now: &str) -> bool {
        self.start.as_str() <= now && now <= self.end.as_str()
    }
}

/// A recurring scraping task owned by an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeJob {
    pub id: Uuid,
    pub platform: Platform,
    /// Number of models to scrape per run.
    pub count: u32,
    #[serde(flatten)]
    pub window: ScheduleWindow,
    /// Operator on/off switch.
    pub is_active: bool,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_runs: u32,
    #[serde(default)]
    pub total_models_scraped: u32,
    #[serde(flatten)]
    pub params: ScrapeParams,
}

impl ScrapeJob {
    /// A fresh, inactive job with the operator defaults.
    pub fn new(
        platform: Platform,
        count: u32,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform,
            count,
            window: ScheduleWindow::new(start, end),
            is_active: false,
            status: JobStatus::Idle,
            last_run: None,
            total_runs: 0,
            total_models_scraped: 0,
            params: ScrapeParams::default(),
        }
    }

    /// A one-off job for a webhook trigger, not tied to a stored record.
    pub fn adhoc(platform: Platform, count: u32, params: ScrapeParams) -> Self {
        let mut job = Self::new(platform, count, "00:00", "23:59");
        job.params = params;
        job
    }
}
