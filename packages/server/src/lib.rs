//! Core library for the meshvault scrape-orchestration service.
//!
//! The service coordinates recurring, per-platform scraping subprocesses
//! against operator-defined time-of-day windows, relays run outcomes to
//! admin clients over a persistent relay connection, and projects relayed
//! events into a capped, persisted notification feed.
//!
//! # Architecture
//!
//! ```text
//! cron tick (every minute)          POST /webhook/scrape-job
//!     │                                     │
//!     ▼                                     ▼
//! jobs_to_run() ──────────────► Orchestrator ── spawn ──► scraper process
//!     ▲                              │                        │ stdout/stderr
//!     │                              │ status + run stats     ▼
//! JobStore (external document store) ◄────────┘        streamed to log
//!                                    │
//!                                    ▼ scrape events
//!                              RelayClient ──► relay endpoint ──► admins
//!                                    │
//!                                    ▼ subscribed events
//!                            NotificationCenter (capped, persisted feed)
//! ```

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;
