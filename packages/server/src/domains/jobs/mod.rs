//! ScrapeJob domain: models, store accessor, eligibility, orchestration.

pub mod models;
pub mod orchestrator;
pub mod scheduler;
pub mod store;

pub use models::{JobStatus, MissingParamError, Platform, ScheduleWindow, ScrapeJob, ScrapeParams};
pub use orchestrator::{BusPublisher, EventPublisher, Orchestrator, RelayPublisher};
pub use scheduler::{jobs_to_run, wall_clock_now};
pub use store::{HttpJobStore, InMemoryJobStore, JobStore, StoreError};
