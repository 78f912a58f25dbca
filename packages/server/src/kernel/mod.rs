//! Kernel-level infrastructure: scheduled background tasks.

pub mod scheduled_tasks;

pub use scheduled_tasks::{run_eligibility_tick, start_scheduler};
